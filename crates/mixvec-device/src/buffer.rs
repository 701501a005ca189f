//! RAII ownership of one device allocation.
//!
//! A [`DeviceBuffer`] is the accelerator half of a dual-location buffer.
//! It owns exactly one allocation on exactly one device and frees it on
//! drop. It is deliberately not `Clone`: it does not know whether its
//! contents are fresh, so duplicating data is the job of the owner that
//! tracks freshness.

use std::fmt;
use std::mem;
use std::ptr::NonNull;
use std::sync::Arc;

use log::debug;
use mixvec_core::DeviceId;

use crate::error::DeviceError;
use crate::platform::Platform;

/// One raw allocation in accelerator memory.
pub struct DeviceBuffer {
    ptr: NonNull<u8>,
    bytes: usize,
    device: DeviceId,
    platform: Arc<Platform>,
}

// SAFETY: the buffer is the unique owner of its allocation; the pointer
// is never dereferenced on the host by this type, and all access to the
// memory goes through `&self` / `&mut self` borrows.
unsafe impl Send for DeviceBuffer {}
// SAFETY: shared references only expose the address and metadata.
unsafe impl Sync for DeviceBuffer {}

impl DeviceBuffer {
    /// Allocate `bytes` bytes on `device`.
    pub fn new(platform: &Arc<Platform>, device: DeviceId, bytes: usize) -> Result<Self, DeviceError> {
        let ptr = platform.allocate(device, bytes)?;
        Ok(Self {
            ptr,
            bytes,
            device,
            platform: Arc::clone(platform),
        })
    }

    /// Free the current allocation, then allocate `bytes` bytes on `device`.
    ///
    /// On failure the buffer is left empty on `device` and the error is
    /// returned; the old contents are gone either way.
    pub fn resize(&mut self, device: DeviceId, bytes: usize) -> Result<(), DeviceError> {
        debug!(
            "resizing device buffer {} bytes on {} -> {bytes} bytes on {device}",
            self.bytes, self.device
        );
        self.release();
        self.device = device;
        self.ptr = self.platform.allocate(device, bytes)?;
        self.bytes = bytes;
        Ok(())
    }

    /// Exchange allocations with `other`. Allocates nothing.
    ///
    /// Moving a copy to another device allocates the new buffer first and
    /// swaps it in; the old allocation is freed when `other` drops.
    pub fn swap(&mut self, other: &mut DeviceBuffer) {
        mem::swap(self, other);
    }

    /// Device this allocation lives on.
    pub fn device(&self) -> DeviceId {
        self.device
    }

    /// Size of the allocation in bytes.
    pub fn size(&self) -> usize {
        self.bytes
    }

    /// Whether the allocation holds zero bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes == 0
    }

    /// The platform that owns the memory.
    pub fn platform(&self) -> &Arc<Platform> {
        &self.platform
    }

    /// Device address of the allocation, typed as `T`.
    ///
    /// The pointer is only meaningful to code running on [`device`](Self::device).
    pub fn as_ptr<T>(&self) -> *const T {
        self.ptr.as_ptr().cast::<T>().cast_const()
    }

    /// Mutable device address of the allocation, typed as `T`.
    pub fn as_mut_ptr<T>(&mut self) -> *mut T {
        self.ptr.as_ptr().cast::<T>()
    }

    pub(crate) fn as_non_null(&self) -> NonNull<u8> {
        self.ptr
    }

    /// Free the allocation and leave a zero-sized placeholder behind.
    fn release(&mut self) {
        if self.bytes == 0 {
            return;
        }
        let ptr = mem::replace(&mut self.ptr, NonNull::dangling());
        let bytes = mem::take(&mut self.bytes);
        // SAFETY: `ptr`/`bytes` came from `platform.allocate(self.device, ..)`
        // and were just detached from `self`, so nothing can use them again.
        unsafe { self.platform.free(self.device, ptr, bytes) };
    }
}

impl Drop for DeviceBuffer {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for DeviceBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceBuffer")
            .field("device", &self.device)
            .field("bytes", &self.bytes)
            .field("ptr", &self.ptr)
            .finish()
    }
}
