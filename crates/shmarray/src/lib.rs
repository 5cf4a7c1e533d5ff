//! shmarray - Fixed-shape typed arrays shared between processes

pub mod array;
mod buffer;
pub mod config;
pub mod descriptor;
pub mod dtype;
pub mod error;
pub mod guard;
pub mod meta;
pub mod shm;
pub mod storage;
pub mod tmpfile;

pub use array::SharedArray;
pub use config::ShmConfig;
pub use descriptor::{ArrayDescriptor, Identity};
pub use dtype::{DType, Element};
pub use error::{Error, Result};
pub use guard::ViewGuard;
pub use meta::ArrayMeta;
pub use storage::{AccessMode, Backend};
