//! Data type definitions

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Element data types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum DType {
    UInt8 = 0,
    Int8 = 1,
    UInt16 = 2,
    Int16 = 3,
    UInt32 = 4,
    Int32 = 5,
    UInt64 = 6,
    Int64 = 7,
    /// Recognised on the wire, but no array can be built from it
    Float16 = 8,
    Float32 = 9,
    Float64 = 10,
}

impl DType {
    /// Size in bytes
    pub const fn size(&self) -> usize {
        match self {
            DType::UInt8 | DType::Int8 => 1,
            DType::UInt16 | DType::Int16 | DType::Float16 => 2,
            DType::UInt32 | DType::Int32 | DType::Float32 => 4,
            DType::UInt64 | DType::Int64 | DType::Float64 => 8,
        }
    }

    /// Whether arrays of this type can be allocated and viewed
    pub const fn is_supported(&self) -> bool {
        !matches!(self, DType::Float16)
    }

    pub const fn name(&self) -> &'static str {
        match self {
            DType::UInt8 => "uint8",
            DType::Int8 => "int8",
            DType::UInt16 => "uint16",
            DType::Int16 => "int16",
            DType::UInt32 => "uint32",
            DType::Int32 => "int32",
            DType::UInt64 => "uint64",
            DType::Int64 => "int64",
            DType::Float16 => "float16",
            DType::Float32 => "float32",
            DType::Float64 => "float64",
        }
    }

    /// Convert from u8
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(DType::UInt8),
            1 => Some(DType::Int8),
            2 => Some(DType::UInt16),
            3 => Some(DType::Int16),
            4 => Some(DType::UInt32),
            5 => Some(DType::Int32),
            6 => Some(DType::UInt64),
            7 => Some(DType::Int64),
            8 => Some(DType::Float16),
            9 => Some(DType::Float32),
            10 => Some(DType::Float64),
            _ => None,
        }
    }

    pub(crate) fn ensure_supported(&self) -> Result<()> {
        if self.is_supported() {
            Ok(())
        } else {
            Err(Error::invalid(format!("unsupported element type {}", self)))
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        (0..=10)
            .filter_map(DType::from_u8)
            .find(|d| d.name() == s)
            .ok_or_else(|| Error::invalid(format!("unknown element type {:?}", s)))
    }
}

/// A Rust scalar that can be viewed in place inside a shared array.
pub trait Element: bytemuck::Pod + PartialEq + fmt::Debug {
    const DTYPE: DType;
}

macro_rules! impl_element {
    ($($t:ty => $d:ident),* $(,)?) => {
        $(impl Element for $t {
            const DTYPE: DType = DType::$d;
        })*
    };
}

impl_element! {
    u8 => UInt8,
    i8 => Int8,
    u16 => UInt16,
    i16 => Int16,
    u32 => UInt32,
    i32 => Int32,
    u64 => UInt64,
    i64 => Int64,
    f32 => Float32,
    f64 => Float64,
}
