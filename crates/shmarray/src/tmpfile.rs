//! Temporary-file backed shared region
//!
//! The file lives in an in-memory filesystem (normally `/dev/shm`), so there
//! is no disk behind it and nothing to flush. Each view opens and maps the
//! file afresh and unmaps it when the view ends.

use crate::{Error, Result};
use memmap2::{MmapMut, MmapOptions};
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub struct TmpFileRegion {
    path: PathBuf,
    size: usize,
    /// Present only in the owning handle; removing it unlinks the path
    file: Option<NamedTempFile>,
}

impl TmpFileRegion {
    /// Create a uniquely named `proc_<pid>_*.shm` file of `size` bytes in `dir`
    pub fn create(dir: &Path, size: usize) -> Result<Self> {
        let prefix = format!("proc_{}_", std::process::id());
        let file = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(".shm")
            .tempfile_in(dir)
            .map_err(|e| Error::AllocationFailed(format!("{}: {}", dir.display(), e)))?;

        // On failure `file` is dropped here, which removes it again.
        file.as_file()
            .set_len(size as u64)
            .map_err(|e| Error::AllocationFailed(format!("{}: {}", file.path().display(), e)))?;

        let path = file.path().to_path_buf();
        tracing::trace!(path = %path.display(), size, "created shared file");

        Ok(Self {
            path,
            size,
            file: Some(file),
        })
    }

    /// Refer to an existing region, which must hold at least `size` bytes
    pub fn open(path: &Path, size: usize) -> Result<Self> {
        let len = std::fs::metadata(path)
            .map_err(|e| open_error(path, e))?
            .len();
        check_len(path, len, size)?;

        Ok(Self {
            path: path.to_path_buf(),
            size,
            file: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_owner(&self) -> bool {
        self.file.is_some()
    }

    /// Map the file for the duration of one view
    pub fn map(&self) -> Result<MmapMut> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)
            .map_err(|e| open_error(&self.path, e))?;

        let len = file
            .metadata()
            .map_err(|e| Error::AttachFailed(format!("{}: {}", self.path.display(), e)))?
            .len();
        check_len(&self.path, len, self.size)?;

        // The mapping stays valid after `file` is closed.
        unsafe { MmapOptions::new().len(self.size).map_mut(&file) }
            .map_err(|e| Error::AttachFailed(format!("{}: {}", self.path.display(), e)))
    }

    /// Close the file, and remove it if this is the owning handle
    pub fn release(self) -> Result<()> {
        if let Some(file) = self.file {
            file.close()
                .map_err(|e| Error::ReleaseFailed(format!("{}: {}", self.path.display(), e)))?;
            tracing::trace!(path = %self.path.display(), "removed shared file");
        }
        Ok(())
    }
}

fn open_error(path: &Path, e: io::Error) -> Error {
    if e.kind() == io::ErrorKind::NotFound {
        Error::RegionUnavailable(path.display().to_string())
    } else {
        Error::AttachFailed(format!("{}: {}", path.display(), e))
    }
}

fn check_len(path: &Path, len: u64, size: usize) -> Result<()> {
    if len < size as u64 {
        return Err(Error::invalid(format!(
            "region {} holds {} bytes, expected {}",
            path.display(),
            len,
            size
        )));
    }
    Ok(())
}
