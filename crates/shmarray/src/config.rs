//! Allocation configuration

use crate::storage::Backend;
use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Environment variable selecting the backend (`native` or `tmpfile`)
pub const BACKEND_ENV: &str = "SHMARRAY_BACKEND";
/// Environment variable overriding the directory used by the file backend
pub const DIR_ENV: &str = "SHMARRAY_DIR";

/// Configuration for allocating shared arrays
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShmConfig {
    /// Backing strategy for new regions
    pub backend: Backend,
    /// Directory for file-backed regions, defaults to [`default_tmpfile_dir`]
    pub dir: Option<PathBuf>,
}

impl ShmConfig {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            dir: None,
        }
    }

    /// Build a configuration from `SHMARRAY_BACKEND` and `SHMARRAY_DIR`,
    /// falling back to defaults for unset variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(backend) = std::env::var(BACKEND_ENV) {
            config = config.with_backend(backend.parse()?);
        }
        if let Some(dir) = std::env::var_os(DIR_ENV) {
            config.dir = Some(PathBuf::from(dir));
        }
        config.validate()?;
        Ok(config)
    }

    /// Set the backend
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Set the directory for file-backed regions
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    /// Directory new file-backed regions are created in
    pub fn tmpfile_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(default_tmpfile_dir)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if let (Backend::TmpFile, Some(dir)) = (self.backend, &self.dir) {
            if !dir.is_dir() {
                return Err(Error::invalid(format!(
                    "{} is not a directory",
                    dir.display()
                )));
            }
        }
        Ok(())
    }
}

/// `/dev/shm` where it exists, the system temporary directory otherwise
pub fn default_tmpfile_dir() -> PathBuf {
    let dev_shm = Path::new("/dev/shm");
    if cfg!(target_os = "linux") && dev_shm.is_dir() {
        dev_shm.to_path_buf()
    } else {
        std::env::temp_dir()
    }
}
