//! Array shape and type metadata

use crate::dtype::DType;
use crate::{Error, Result};

/// Number of bytes backing an array of `shape` elements of `dtype`.
///
/// Every process holding a handle to a region must agree on this value, so
/// allocation, attach and views all go through this one function.
pub fn byte_size(shape: &[usize], dtype: DType) -> Option<usize> {
    shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))?
        .checked_mul(dtype.size())
}

/// Validated (shape, dtype) pair of a shared array
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayMeta {
    shape: Vec<usize>,
    dtype: DType,
    /// Cached result of [`byte_size`]
    size: usize,
}

impl ArrayMeta {
    pub fn new(shape: &[usize], dtype: DType) -> Result<Self> {
        if shape.is_empty() {
            return Err(Error::invalid("shape must have at least one dimension"));
        }
        if let Some(axis) = shape.iter().position(|&d| d == 0) {
            return Err(Error::invalid(format!(
                "dimension {} of shape {:?} is not positive",
                axis, shape
            )));
        }
        dtype.ensure_supported()?;

        let size = byte_size(shape, dtype).ok_or_else(|| {
            Error::invalid(format!("shape {:?} of {} overflows usize", shape, dtype))
        })?;

        Ok(Self {
            shape: shape.to_vec(),
            dtype,
            size,
        })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.size / self.dtype.size()
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Total size in bytes
    pub fn byte_size(&self) -> usize {
        self.size
    }

    /// Row-major strides in elements
    pub fn strides(&self) -> Vec<usize> {
        let mut strides = vec![1; self.shape.len()];
        for axis in (0..self.shape.len().saturating_sub(1)).rev() {
            strides[axis] = strides[axis + 1] * self.shape[axis + 1];
        }
        strides
    }

    /// Flat element offset of a multi-dimensional index
    pub fn offset(&self, index: &[usize]) -> Option<usize> {
        if index.len() != self.shape.len() {
            return None;
        }
        let mut offset = 0;
        for (&i, &d) in index.iter().zip(&self.shape) {
            if i >= d {
                return None;
            }
            offset = offset * d + i;
        }
        Some(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_size() {
        let meta = ArrayMeta::new(&[100, 100], DType::UInt16).unwrap();
        assert_eq!(meta.len(), 10_000);
        assert_eq!(meta.byte_size(), 20_000);
        assert_eq!(byte_size(&[3, 4, 5], DType::Float64), Some(480));
    }

    #[test]
    fn test_rejects_bad_shapes() {
        assert!(matches!(
            ArrayMeta::new(&[], DType::UInt8),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            ArrayMeta::new(&[4, 0, 2], DType::UInt8),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            ArrayMeta::new(&[usize::MAX, 2], DType::UInt8),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            ArrayMeta::new(&[4], DType::Float16),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_row_major_offsets() {
        let meta = ArrayMeta::new(&[2, 3, 4], DType::Int32).unwrap();
        assert_eq!(meta.strides(), vec![12, 4, 1]);
        assert_eq!(meta.offset(&[0, 0, 0]), Some(0));
        assert_eq!(meta.offset(&[1, 2, 3]), Some(23));
        assert_eq!(meta.offset(&[1, 0, 2]), Some(14));
        assert_eq!(meta.offset(&[2, 0, 0]), None);
        assert_eq!(meta.offset(&[1, 2]), None);
    }
}
