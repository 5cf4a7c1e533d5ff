//! RAII array view

use crate::buffer::Mapping;
use crate::dtype::Element;
use crate::meta::ArrayMeta;
use crate::storage::AccessMode;
use crate::{Error, Result};
use std::marker::PhantomData;

/// Typed, row-major view over the bytes of a shared array.
///
/// The mapping behind the view is released when the guard drops. The shared
/// bytes themselves are left alone. Nothing here orders writes against other
/// processes; callers coordinate that themselves.
pub struct ViewGuard<'a, T: Element> {
    /// Mapping for this view
    mapping: Mapping,
    /// Shape and type of the array
    meta: &'a ArrayMeta,
    /// Access mode
    mode: AccessMode,
    _marker: PhantomData<T>,
}

/// Fail unless `T` is the element type recorded in `meta`
pub(crate) fn check_dtype<T: Element>(meta: &ArrayMeta) -> Result<()> {
    if T::DTYPE != meta.dtype() {
        return Err(Error::TypeMismatch {
            expected: meta.dtype().to_string(),
            actual: T::DTYPE.to_string(),
        });
    }
    Ok(())
}

impl<'a, T: Element> ViewGuard<'a, T> {
    pub(crate) fn new(mapping: Mapping, meta: &'a ArrayMeta, mode: AccessMode) -> Result<Self> {
        check_dtype::<T>(meta)?;
        if mapping.len() < meta.byte_size() {
            return Err(Error::invalid(format!(
                "mapping holds {} bytes, array needs {}",
                mapping.len(),
                meta.byte_size()
            )));
        }
        tracing::trace!(shape = ?meta.shape(), dtype = %meta.dtype(), ?mode, "acquired view");

        Ok(Self {
            mapping,
            meta,
            mode,
            _marker: PhantomData,
        })
    }

    pub fn shape(&self) -> &[usize] {
        self.meta.shape()
    }

    /// Row-major strides in elements
    pub fn strides(&self) -> Vec<usize> {
        self.meta.strides()
    }

    pub fn ndim(&self) -> usize {
        self.meta.ndim()
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.meta.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meta.is_empty()
    }

    /// Get access mode
    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Elements in row-major order
    pub fn as_slice(&self) -> &[T] {
        let bytes =
            unsafe { std::slice::from_raw_parts(self.mapping.as_ptr(), self.meta.byte_size()) };
        bytemuck::cast_slice(bytes)
    }

    /// Mutable elements in row-major order (requires ReadWrite mode)
    pub fn as_slice_mut(&mut self) -> Result<&mut [T]> {
        if self.mode == AccessMode::ReadOnly {
            return Err(Error::ReadOnly);
        }
        let size = self.meta.byte_size();
        let bytes = unsafe { std::slice::from_raw_parts_mut(self.mapping.as_mut_ptr(), size) };
        Ok(bytemuck::cast_slice_mut(bytes))
    }

    /// Element at a multi-dimensional index
    pub fn get(&self, index: &[usize]) -> Option<T> {
        let offset = self.meta.offset(index)?;
        Some(self.as_slice()[offset])
    }

    /// Store `value` at a multi-dimensional index
    pub fn set(&mut self, index: &[usize], value: T) -> Result<()> {
        let offset = self.meta.offset(index).ok_or_else(|| {
            Error::invalid(format!(
                "index {:?} out of bounds for shape {:?}",
                index,
                self.meta.shape()
            ))
        })?;
        self.as_slice_mut()?[offset] = value;
        Ok(())
    }

    pub fn fill(&mut self, value: T) -> Result<()> {
        self.as_slice_mut()?.fill(value);
        Ok(())
    }

    /// Overwrite every element from `src`, which is read in row-major order
    pub fn copy_from_slice(&mut self, src: &[T]) -> Result<()> {
        if src.len() != self.len() {
            return Err(Error::invalid(format!(
                "source holds {} elements, array holds {}",
                src.len(),
                self.len()
            )));
        }
        self.as_slice_mut()?.copy_from_slice(src);
        Ok(())
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.as_slice().to_vec()
    }
}

impl<T: Element> Drop for ViewGuard<'_, T> {
    fn drop(&mut self) {
        tracing::trace!(shape = ?self.meta.shape(), "released view");
    }
}
