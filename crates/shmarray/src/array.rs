//! Shared array handle

use crate::buffer::Backing;
use crate::config::ShmConfig;
use crate::descriptor::{ArrayDescriptor, Identity};
use crate::dtype::{DType, Element};
use crate::guard::{check_dtype, ViewGuard};
use crate::meta::ArrayMeta;
use crate::storage::{AccessMode, Backend};
use crate::Result;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Handle to a fixed-shape array living in shared memory.
///
/// The handle returned by [`SharedArray::allocate`] owns the region and
/// unlinks it on [`close`](SharedArray::close) or drop. Handles rebuilt from a
/// descriptor in this or any other process only detach.
///
/// ```no_run
/// use shmarray::{DType, SharedArray};
///
/// let mut shm = SharedArray::allocate(&[100, 100], DType::UInt16)?;
/// shm.with_view::<u16, _>(|a| a.fill(0))??;
///
/// // hand `bytes` to a worker, which calls SharedArray::attach_bytes
/// let bytes = shm.descriptor().to_bytes()?;
/// # Ok::<(), shmarray::Error>(())
/// ```
pub struct SharedArray {
    meta: ArrayMeta,
    /// Always `Some` until teardown
    backing: Option<Backing>,
}

impl SharedArray {
    /// Allocate a zeroed region using the default configuration
    pub fn allocate(shape: &[usize], dtype: DType) -> Result<Self> {
        Self::allocate_with(&ShmConfig::default(), shape, dtype)
    }

    /// Allocate a zeroed region with an explicit configuration
    pub fn allocate_with(config: &ShmConfig, shape: &[usize], dtype: DType) -> Result<Self> {
        let meta = ArrayMeta::new(shape, dtype)?;
        config.validate()?;

        let backing = Backing::create(config, meta.byte_size())?;
        tracing::debug!(
            identity = %backing.identity(),
            backend = backing.backend().name(),
            shape = ?meta.shape(),
            dtype = %meta.dtype(),
            "allocated shared array"
        );

        Ok(Self {
            meta,
            backing: Some(backing),
        })
    }

    /// Attach to a region allocated elsewhere. The handle never owns it.
    pub fn attach(descriptor: &ArrayDescriptor) -> Result<Self> {
        let meta = ArrayMeta::new(&descriptor.shape, descriptor.dtype)?;
        let backing = Backing::open(&descriptor.identity, meta.byte_size())?;
        tracing::debug!(
            identity = %descriptor.identity,
            backend = descriptor.identity.backend().name(),
            "attached shared array"
        );

        Ok(Self {
            meta,
            backing: Some(backing),
        })
    }

    /// Decode a descriptor produced by `descriptor().to_bytes()` and attach
    pub fn attach_bytes(bytes: &[u8]) -> Result<Self> {
        Self::attach(&ArrayDescriptor::from_bytes(bytes)?)
    }

    /// Descriptor to send to other processes
    pub fn descriptor(&self) -> ArrayDescriptor {
        ArrayDescriptor {
            identity: self.identity(),
            shape: self.meta.shape().to_vec(),
            dtype: self.meta.dtype(),
        }
    }

    fn backing(&self) -> &Backing {
        self.backing
            .as_ref()
            .expect("backing is only taken during teardown")
    }

    pub fn identity(&self) -> Identity {
        self.backing().identity()
    }

    pub fn backend(&self) -> Backend {
        self.backing().backend()
    }

    pub fn meta(&self) -> &ArrayMeta {
        &self.meta
    }

    pub fn shape(&self) -> &[usize] {
        self.meta.shape()
    }

    pub fn dtype(&self) -> DType {
        self.meta.dtype()
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.meta.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meta.is_empty()
    }

    pub fn byte_size(&self) -> usize {
        self.meta.byte_size()
    }

    /// Whether dropping this handle unlinks the region
    pub fn is_owner(&self) -> bool {
        self.backing().is_owner()
    }

    /// Read-only view of the array
    pub fn view<T: Element>(&self) -> Result<ViewGuard<'_, T>> {
        self.acquire(AccessMode::ReadOnly)
    }

    /// Read-write view of the array
    pub fn view_mut<T: Element>(&mut self) -> Result<ViewGuard<'_, T>> {
        self.acquire(AccessMode::ReadWrite)
    }

    /// Run `f` against a read-write view, releasing the mapping afterwards
    pub fn with_view<T: Element, R>(
        &mut self,
        f: impl FnOnce(&mut ViewGuard<'_, T>) -> R,
    ) -> Result<R> {
        let mut view = self.view_mut::<T>()?;
        Ok(f(&mut view))
    }

    /// Run `f` against a read-only view, releasing the mapping afterwards
    pub fn with_read_view<T: Element, R>(
        &self,
        f: impl FnOnce(&ViewGuard<'_, T>) -> R,
    ) -> Result<R> {
        let view = self.view::<T>()?;
        Ok(f(&view))
    }

    fn acquire<T: Element>(&self, mode: AccessMode) -> Result<ViewGuard<'_, T>> {
        check_dtype::<T>(&self.meta)?;
        let mapping = self.backing().map()?;
        ViewGuard::new(mapping, &self.meta, mode)
    }

    /// Tear the handle down, reporting any failure to unlink the region
    pub fn close(mut self) -> Result<()> {
        self.teardown()
    }

    fn teardown(&mut self) -> Result<()> {
        let Some(backing) = self.backing.take() else {
            return Ok(());
        };
        let identity = backing.identity();
        let owner = backing.is_owner();
        backing.release()?;
        tracing::debug!(identity = %identity, owner, "released shared array");
        Ok(())
    }
}

impl Drop for SharedArray {
    fn drop(&mut self) {
        if let Err(e) = self.teardown() {
            tracing::warn!(error = %e, "failed to release shared array");
        }
    }
}

impl std::fmt::Debug for SharedArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("SharedArray");
        if let Some(backing) = &self.backing {
            s.field("identity", &backing.identity())
                .field("owner", &backing.is_owner());
        }
        s.field("shape", &self.meta.shape())
            .field("dtype", &self.meta.dtype())
            .finish()
    }
}

/// Serializes as its [`ArrayDescriptor`] only.
impl Serialize for SharedArray {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.descriptor().serialize(serializer)
    }
}

/// Deserializes a descriptor and attaches to it as a non-owner.
impl<'de> Deserialize<'de> for SharedArray {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let descriptor = ArrayDescriptor::deserialize(deserializer)?;
        SharedArray::attach(&descriptor).map_err(serde::de::Error::custom)
    }
}
