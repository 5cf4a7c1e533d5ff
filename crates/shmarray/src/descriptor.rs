//! Cross-process descriptor of a shared array

use crate::dtype::DType;
use crate::storage::Backend;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{Read, Write};
use std::path::PathBuf;

/// Key that locates a shared region from any process on the machine
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Identity {
    /// OS shared memory object name
    Name(String),
    /// Path of a file on an in-memory filesystem
    Path(PathBuf),
}

impl Identity {
    pub fn backend(&self) -> Backend {
        match self {
            Identity::Name(_) => Backend::Native,
            Identity::Path(_) => Backend::TmpFile,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Name(name) => f.write_str(name),
            Identity::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// What crosses a process boundary in place of a shared array: where the
/// region lives and how to read it, never the bytes or the owner flag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArrayDescriptor {
    pub identity: Identity,
    pub shape: Vec<usize>,
    pub dtype: DType,
}

impl ArrayDescriptor {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }

    /// Write the descriptor to a pipe, socket or file
    pub fn encode_into<W: Write>(&self, writer: W) -> Result<()> {
        Ok(bincode::serialize_into(writer, self)?)
    }

    /// Read one descriptor written by [`ArrayDescriptor::encode_into`]
    pub fn decode_from<R: Read>(reader: R) -> Result<Self> {
        Ok(bincode::deserialize_from(reader)?)
    }
}
