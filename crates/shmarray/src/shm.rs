//! Native shared memory object wrapper

use crate::{Error, Result};
use shared_memory::{Shmem, ShmemConf};

/// Named OS shared memory region, mapped for as long as the wrapper lives
pub struct SharedMemory {
    inner: Shmem,
    name: String,
    size: usize,
    owner: bool,
}

impl SharedMemory {
    /// Create a new region under an OS-assigned unique name
    pub fn create(size: usize) -> Result<Self> {
        let shmem = ShmemConf::new()
            .size(size)
            .create()
            .map_err(|e| Error::AllocationFailed(e.to_string()))?;

        let name = shmem.get_os_id().to_string();
        tracing::trace!(name = %name, size, "created shared memory object");

        Ok(Self {
            inner: shmem,
            name,
            size,
            owner: true,
        })
    }

    /// Open an existing region, which must hold at least `size` bytes
    pub fn open(name: &str, size: usize) -> Result<Self> {
        let shmem = ShmemConf::new().os_id(name).open().map_err(|e| {
            match is_linked(name) {
                Ok(false) => Error::RegionUnavailable(name.to_string()),
                _ => Error::AttachFailed(format!("{}: {}", name, e)),
            }
        })?;

        if shmem.len() < size {
            return Err(Error::invalid(format!(
                "region {} holds {} bytes, expected {}",
                name,
                shmem.len(),
                size
            )));
        }

        Ok(Self {
            inner: shmem,
            name: name.to_string(),
            size,
            owner: false,
        })
    }

    /// Get the name of the shared memory region
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the size of the shared memory region
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_owner(&self) -> bool {
        self.owner
    }

    /// Get a mutable raw pointer to the shared memory
    pub fn as_mut_ptr(&self) -> *mut u8 {
        self.inner.as_ptr()
    }

    /// Fail with `RegionUnavailable` if the owner already unlinked the name.
    ///
    /// Our own mapping outlives the unlink, so this has to ask the OS.
    pub fn ensure_linked(&self) -> Result<()> {
        if is_linked(&self.name)? {
            Ok(())
        } else {
            Err(Error::RegionUnavailable(self.name.clone()))
        }
    }

    /// Unmap, and unlink the name if this is the owning handle
    #[cfg(unix)]
    pub fn release(mut self) -> Result<()> {
        // Shmem would unlink on drop and swallow the error, so do it ourselves.
        self.inner.set_owner(false);
        drop(self.inner);

        if self.owner {
            nix::sys::mman::shm_unlink(self.name.as_str())
                .map_err(|e| Error::ReleaseFailed(format!("{}: {}", self.name, e)))?;
            tracing::trace!(name = %self.name, "unlinked shared memory object");
        }
        Ok(())
    }

    /// Unmap, and unlink the name if this is the owning handle
    #[cfg(not(unix))]
    pub fn release(self) -> Result<()> {
        drop(self.inner);
        Ok(())
    }
}

#[cfg(unix)]
fn is_linked(name: &str) -> Result<bool> {
    use nix::errno::Errno;
    use nix::fcntl::OFlag;
    use nix::sys::mman::shm_open;
    use nix::sys::stat::Mode;

    match shm_open(name, OFlag::O_RDONLY, Mode::empty()) {
        Ok(_fd) => Ok(true),
        Err(Errno::ENOENT) => Ok(false),
        Err(e) => Err(Error::AttachFailed(format!("{}: {}", name, e))),
    }
}

// Objects here live until the last handle closes, so an attached handle can
// never observe its region disappearing.
#[cfg(not(unix))]
fn is_linked(_name: &str) -> Result<bool> {
    Ok(true)
}
