//! Capacity-limited aligned allocator backed by the host heap.

use std::alloc::{self, Layout};
use std::ptr::{self, NonNull};
use std::sync::Mutex;

use indexmap::IndexMap;
use log::{debug, error};
use mixvec_core::DeviceId;

use crate::alloc::DeviceAllocator;
use crate::config::PlatformConfig;
use crate::error::DeviceError;

/// Memory accounting for one emulated device.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeviceUsage {
    /// Bytes currently allocated.
    pub live_bytes: usize,
    /// Allocations currently outstanding (zero-byte ones excluded).
    pub live_allocations: usize,
    /// Allocations ever made (zero-byte ones excluded).
    pub total_allocations: u64,
}

/// [`DeviceAllocator`] that emulates device memory on the host heap.
pub struct EmulatedAllocator {
    device_count: u32,
    capacity: usize,
    alignment: usize,
    usage: Mutex<IndexMap<DeviceId, DeviceUsage>>,
}

impl EmulatedAllocator {
    /// Create an allocator for the devices described by `config`.
    ///
    /// The config is expected to be validated already.
    pub fn new(config: &PlatformConfig) -> Self {
        let usage = (0..config.device_count)
            .map(|i| (DeviceId(i), DeviceUsage::default()))
            .collect();
        Self {
            device_count: config.device_count,
            capacity: config.device_memory_bytes,
            alignment: config.alignment,
            usage: Mutex::new(usage),
        }
    }

    /// Current accounting for `device`, or `None` if it does not exist.
    pub fn usage(&self, device: DeviceId) -> Option<DeviceUsage> {
        self.lock_usage().get(&device).copied()
    }

    fn lock_usage(&self) -> std::sync::MutexGuard<'_, IndexMap<DeviceId, DeviceUsage>> {
        // Accounting stays consistent even if a holder panicked: every
        // update is a single field write.
        self.usage.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn layout(&self, device: DeviceId, bytes: usize) -> Result<Layout, DeviceError> {
        Layout::from_size_align(bytes, self.alignment).map_err(|_| DeviceError::OutOfMemory {
            device,
            requested: bytes,
            available: 0,
        })
    }

    fn dangling(&self) -> NonNull<u8> {
        // An address equal to the alignment is non-null and aligned.
        NonNull::new(ptr::without_provenance_mut(self.alignment)).unwrap_or(NonNull::dangling())
    }
}

impl DeviceAllocator for EmulatedAllocator {
    fn device_count(&self) -> u32 {
        self.device_count
    }

    fn alignment(&self) -> usize {
        self.alignment
    }

    fn allocate(&self, device: DeviceId, bytes: usize) -> Result<NonNull<u8>, DeviceError> {
        if device.0 >= self.device_count {
            return Err(DeviceError::UnknownDevice {
                device,
                device_count: self.device_count,
            });
        }
        if bytes == 0 {
            return Ok(self.dangling());
        }

        let mut usage = self.lock_usage();
        let entry = usage.entry(device).or_default();
        let available = self.capacity.saturating_sub(entry.live_bytes);
        if bytes > available {
            error!("{device}: allocation of {bytes} bytes exceeds {available} available");
            return Err(DeviceError::OutOfMemory {
                device,
                requested: bytes,
                available,
            });
        }

        let layout = self.layout(device, bytes)?;
        // SAFETY: layout has a non-zero size (bytes > 0 checked above).
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(raw).ok_or(DeviceError::OutOfMemory {
            device,
            requested: bytes,
            available,
        })?;

        entry.live_bytes += bytes;
        entry.live_allocations += 1;
        entry.total_allocations += 1;
        debug!("{device}: allocated {bytes} bytes ({} live)", entry.live_bytes);
        Ok(ptr)
    }

    unsafe fn free(&self, device: DeviceId, ptr: NonNull<u8>, bytes: usize) {
        if bytes == 0 {
            return;
        }
        let Ok(layout) = self.layout(device, bytes) else {
            return;
        };
        // SAFETY: the caller guarantees `ptr` came from `allocate(device,
        // bytes)`, which used this exact layout.
        unsafe { alloc::dealloc(ptr.as_ptr(), layout) };

        let mut usage = self.lock_usage();
        if let Some(entry) = usage.get_mut(&device) {
            entry.live_bytes = entry.live_bytes.saturating_sub(bytes);
            entry.live_allocations = entry.live_allocations.saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allocator(devices: u32, capacity: usize) -> EmulatedAllocator {
        EmulatedAllocator::new(&PlatformConfig::new(devices).with_device_memory(capacity))
    }

    #[test]
    fn allocation_is_aligned_and_accounted() {
        let a = allocator(1, 4096);
        let ptr = a.allocate(DeviceId(0), 100).unwrap();
        assert_eq!(ptr.as_ptr() as usize % a.alignment(), 0);
        let usage = a.usage(DeviceId(0)).unwrap();
        assert_eq!(usage.live_bytes, 100);
        assert_eq!(usage.live_allocations, 1);
        unsafe { a.free(DeviceId(0), ptr, 100) };
        assert_eq!(a.usage(DeviceId(0)).unwrap().live_bytes, 0);
    }

    #[test]
    fn zero_bytes_do_not_consume_capacity() {
        let a = allocator(1, 16);
        let ptr = a.allocate(DeviceId(0), 0).unwrap();
        assert_eq!(ptr.as_ptr() as usize % a.alignment(), 0);
        assert_eq!(a.usage(DeviceId(0)).unwrap().total_allocations, 0);
        unsafe { a.free(DeviceId(0), ptr, 0) };
    }

    #[test]
    fn capacity_exceeded_reports_out_of_memory() {
        let a = allocator(1, 128);
        let first = a.allocate(DeviceId(0), 100).unwrap();
        let err = a.allocate(DeviceId(0), 64).unwrap_err();
        assert_eq!(
            err,
            DeviceError::OutOfMemory {
                device: DeviceId(0),
                requested: 64,
                available: 28,
            }
        );
        unsafe { a.free(DeviceId(0), first, 100) };
        assert!(a.allocate(DeviceId(0), 64).is_ok());
    }

    #[test]
    fn unknown_device_rejected() {
        let a = allocator(2, 1024);
        let err = a.allocate(DeviceId(5), 8).unwrap_err();
        assert_eq!(
            err,
            DeviceError::UnknownDevice {
                device: DeviceId(5),
                device_count: 2,
            }
        );
        assert!(a.usage(DeviceId(5)).is_none());
    }

    #[test]
    fn devices_are_accounted_independently() {
        let a = allocator(2, 1024);
        let p0 = a.allocate(DeviceId(0), 512).unwrap();
        let p1 = a.allocate(DeviceId(1), 1024).unwrap();
        assert_eq!(a.usage(DeviceId(0)).unwrap().live_bytes, 512);
        assert_eq!(a.usage(DeviceId(1)).unwrap().live_bytes, 1024);
        unsafe {
            a.free(DeviceId(0), p0, 512);
            a.free(DeviceId(1), p1, 1024);
        }
    }
}
