//! Storage backend definitions

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How a shared region is backed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Backend {
    /// Named OS shared memory object, mapped once per handle
    #[default]
    Native = 0,
    /// Temporary file on an in-memory filesystem, mapped once per view
    TmpFile = 1,
}

impl Backend {
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Native => "native",
            Backend::TmpFile => "tmpfile",
        }
    }
}

impl FromStr for Backend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "native" | "shm" => Ok(Backend::Native),
            "tmpfile" | "file" => Ok(Backend::TmpFile),
            other => Err(Error::invalid(format!("unknown backend {:?}", other))),
        }
    }
}

/// Access mode for a view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    ReadWrite,
}
