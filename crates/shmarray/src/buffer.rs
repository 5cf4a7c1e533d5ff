//! Region backing and per-view mappings

use crate::config::ShmConfig;
use crate::descriptor::Identity;
use crate::shm::SharedMemory;
use crate::storage::Backend;
use crate::tmpfile::TmpFileRegion;
use crate::Result;
use memmap2::MmapMut;

/// Region data storage
pub enum Backing {
    Native(SharedMemory),
    TmpFile(TmpFileRegion),
}

impl Backing {
    /// Allocate a fresh region of `size` bytes; the result owns it
    pub fn create(config: &ShmConfig, size: usize) -> Result<Self> {
        match config.backend {
            Backend::Native => Ok(Backing::Native(SharedMemory::create(size)?)),
            Backend::TmpFile => Ok(Backing::TmpFile(TmpFileRegion::create(
                &config.tmpfile_dir(),
                size,
            )?)),
        }
    }

    /// Attach to the region named by `identity`
    pub fn open(identity: &Identity, size: usize) -> Result<Self> {
        match identity {
            Identity::Name(name) => Ok(Backing::Native(SharedMemory::open(name, size)?)),
            Identity::Path(path) => Ok(Backing::TmpFile(TmpFileRegion::open(path, size)?)),
        }
    }

    /// Get storage backend
    pub fn backend(&self) -> Backend {
        match self {
            Backing::Native(_) => Backend::Native,
            Backing::TmpFile(_) => Backend::TmpFile,
        }
    }

    pub fn identity(&self) -> Identity {
        match self {
            Backing::Native(shm) => Identity::Name(shm.name().to_string()),
            Backing::TmpFile(file) => Identity::Path(file.path().to_path_buf()),
        }
    }

    /// Get size in bytes
    pub fn size(&self) -> usize {
        match self {
            Backing::Native(shm) => shm.size(),
            Backing::TmpFile(file) => file.size(),
        }
    }

    pub fn is_owner(&self) -> bool {
        match self {
            Backing::Native(shm) => shm.is_owner(),
            Backing::TmpFile(file) => file.is_owner(),
        }
    }

    /// Get a mapping of the region for one view
    pub fn map(&self) -> Result<Mapping> {
        match self {
            Backing::Native(shm) => {
                shm.ensure_linked()?;
                Ok(Mapping::Persistent {
                    ptr: shm.as_mut_ptr(),
                    len: shm.size(),
                })
            }
            Backing::TmpFile(file) => Ok(Mapping::Transient(file.map()?)),
        }
    }

    /// Detach, then unlink the region if this handle owns it
    pub fn release(self) -> Result<()> {
        match self {
            Backing::Native(shm) => shm.release(),
            Backing::TmpFile(file) => file.release(),
        }
    }
}

/// Bytes visible to a single view
pub enum Mapping {
    /// Borrowed from a mapping that outlives the view
    Persistent { ptr: *mut u8, len: usize },
    /// Owned by the view and unmapped with it
    Transient(MmapMut),
}

impl Mapping {
    pub fn len(&self) -> usize {
        match self {
            Mapping::Persistent { len, .. } => *len,
            Mapping::Transient(mmap) => mmap.len(),
        }
    }

    pub fn as_ptr(&self) -> *const u8 {
        match self {
            Mapping::Persistent { ptr, .. } => *ptr,
            Mapping::Transient(mmap) => mmap.as_ptr(),
        }
    }

    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        match self {
            Mapping::Persistent { ptr, .. } => *ptr,
            Mapping::Transient(mmap) => mmap.as_mut_ptr(),
        }
    }
}
