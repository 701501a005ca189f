//! The device allocator interface.

use std::ptr::NonNull;

use mixvec_core::DeviceId;

use crate::error::DeviceError;

/// Allocates and frees raw accelerator memory.
///
/// Implementations serve a fixed set of devices numbered `0..device_count()`.
/// The allocator knows nothing about element types or freshness; typed
/// ownership lives in [`DeviceBuffer`](crate::DeviceBuffer).
pub trait DeviceAllocator: Send + Sync {
    /// Number of devices this allocator serves.
    fn device_count(&self) -> u32;

    /// Alignment in bytes of every non-empty allocation.
    fn alignment(&self) -> usize;

    /// Allocate `bytes` bytes on `device`.
    ///
    /// Zero-byte requests succeed without consuming capacity and return a
    /// dangling pointer that is still aligned for any element type.
    fn allocate(&self, device: DeviceId, bytes: usize) -> Result<NonNull<u8>, DeviceError>;

    /// Release memory returned by [`allocate`](Self::allocate).
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `allocate(device, bytes)` on this
    /// allocator with the same `device` and `bytes`, must not have been
    /// freed already, and must not be accessed afterwards.
    unsafe fn free(&self, device: DeviceId, ptr: NonNull<u8>, bytes: usize);
}
