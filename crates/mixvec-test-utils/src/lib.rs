//! Test fixtures and device-side helpers for mixvec development.
//!
//! [`platform`] builds small emulated platforms. [`write_device`] and
//! [`read_device`] stand in for kernels: they move bytes through the
//! device's execution queue without touching the transfer counters, so
//! tests can assert exactly how many host/device syncs a container did.
//! [`CountingRegistry`] wraps the emulated queues to count every command
//! a platform enqueues, and can refuse further commands to simulate a
//! device whose queue went away.

#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::mem;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use mixvec_core::{DeviceId, Element};
use mixvec_device::emulated::{EmulatedAllocator, EmulatedRegistry};
use mixvec_device::{
    CopyCommand, CopyDirection, DeviceError, ExecutionQueue, Platform, PlatformConfig,
    QueueRegistry,
};

/// Per-device memory of the fixtures built by [`platform`].
pub const TEST_DEVICE_MEMORY: usize = 1 << 20;

/// Emulated platform with `devices` devices of [`TEST_DEVICE_MEMORY`] bytes.
pub fn platform(devices: u32) -> Arc<Platform> {
    platform_with_memory(devices, TEST_DEVICE_MEMORY)
}

/// Emulated platform with `devices` devices of `bytes` bytes each.
pub fn platform_with_memory(devices: u32, bytes: usize) -> Arc<Platform> {
    Platform::emulated(PlatformConfig::new(devices).with_device_memory(bytes))
        .expect("test platform config is valid")
}

/// Overwrite `values.len()` elements at device address `dst`, as a kernel
/// running on `device` would.
///
/// # Safety
///
/// `dst` must address at least `values.len()` writable elements on `device`.
pub unsafe fn write_device<T: Element>(
    platform: &Platform,
    device: DeviceId,
    dst: *mut T,
    values: &[T],
) {
    let command = CopyCommand {
        direction: CopyDirection::HostToDevice,
        dst: NonNull::new(dst.cast::<u8>()).expect("device pointer is non-null"),
        src: NonNull::from(values).cast(),
        bytes: mem::size_of_val(values),
    };
    // SAFETY: forwarded from the caller; `submit` waits for completion.
    unsafe { platform.submit(device, command) }.expect("device queue accepts copies");
}

/// Read `len` elements from device address `src` on `device`.
///
/// # Safety
///
/// `src` must address at least `len` readable elements on `device`.
pub unsafe fn read_device<T: Element + Default>(
    platform: &Platform,
    device: DeviceId,
    src: *const T,
    len: usize,
) -> Vec<T> {
    let mut out = vec![T::default(); len];
    let command = CopyCommand {
        direction: CopyDirection::DeviceToHost,
        dst: NonNull::from(out.as_mut_slice()).cast(),
        src: NonNull::new(src.cast::<u8>().cast_mut()).expect("device pointer is non-null"),
        bytes: mem::size_of_val(out.as_slice()),
    };
    // SAFETY: forwarded from the caller; `submit` waits for completion.
    unsafe { platform.submit(device, command) }.expect("device queue accepts copies");
    out
}

/// Queue registry that counts every command enqueued on any device.
pub struct CountingRegistry {
    inner: EmulatedRegistry,
    enqueued: Arc<AtomicU64>,
    closed: Arc<AtomicBool>,
}

impl CountingRegistry {
    pub fn new(config: &PlatformConfig) -> Self {
        Self {
            inner: EmulatedRegistry::new(config).expect("test platform config is valid"),
            enqueued: Arc::new(AtomicU64::new(0)),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Setting the switch makes every later enqueue fail with
    /// [`DeviceError::QueueClosed`].
    pub fn close_switch(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }

    /// Shared handle to the counter; stays valid after the registry moves
    /// into a platform.
    pub fn counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.enqueued)
    }
}

impl QueueRegistry for CountingRegistry {
    fn device_count(&self) -> u32 {
        self.inner.device_count()
    }

    fn queue(&self, device: DeviceId) -> Result<Arc<dyn ExecutionQueue>, DeviceError> {
        Ok(Arc::new(CountingQueue {
            inner: self.inner.queue(device)?,
            enqueued: Arc::clone(&self.enqueued),
            closed: Arc::clone(&self.closed),
        }))
    }
}

struct CountingQueue {
    inner: Arc<dyn ExecutionQueue>,
    enqueued: Arc<AtomicU64>,
    closed: Arc<AtomicBool>,
}

impl ExecutionQueue for CountingQueue {
    fn device(&self) -> DeviceId {
        self.inner.device()
    }

    unsafe fn enqueue(&self, command: CopyCommand) -> Result<(), DeviceError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DeviceError::QueueClosed {
                device: self.device(),
            });
        }
        self.enqueued.fetch_add(1, Ordering::SeqCst);
        // SAFETY: forwarded from the caller.
        unsafe { self.inner.enqueue(command) }
    }

    fn wait(&self) -> Result<(), DeviceError> {
        self.inner.wait()
    }
}

/// Emulated platform whose queues count enqueued commands.
pub fn counting_platform(devices: u32) -> (Arc<Platform>, Arc<AtomicU64>) {
    let config = PlatformConfig::new(devices).with_device_memory(TEST_DEVICE_MEMORY);
    let queues = CountingRegistry::new(&config);
    let counter = queues.counter();
    let platform = Platform::new(Arc::new(EmulatedAllocator::new(&config)), Arc::new(queues));
    (platform, counter)
}

/// Emulated platform whose queues start refusing work once the returned
/// switch is set.
pub fn closable_platform(devices: u32) -> (Arc<Platform>, Arc<AtomicBool>) {
    let config = PlatformConfig::new(devices).with_device_memory(TEST_DEVICE_MEMORY);
    let queues = CountingRegistry::new(&config);
    let switch = queues.close_switch();
    let platform = Platform::new(Arc::new(EmulatedAllocator::new(&config)), Arc::new(queues));
    (platform, switch)
}
