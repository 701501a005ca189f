//! The accelerator platform: allocator, queues and transfer counters.
//!
//! A [`Platform`] is shared via `Arc` by every buffer that uses it. The
//! typed copy helpers [`Platform::upload`] and [`Platform::download`] are
//! the only way data crosses between host and device memory, and both
//! block until the device queue has drained.

use std::fmt;
use std::mem;
use std::ptr::NonNull;
use std::sync::{Arc, OnceLock};

use log::{debug, trace};
use mixvec_core::{DeviceId, Element};

use crate::alloc::DeviceAllocator;
use crate::buffer::DeviceBuffer;
use crate::config::PlatformConfig;
use crate::emulated::{EmulatedAllocator, EmulatedRegistry};
use crate::error::{ConfigError, DeviceError};
use crate::queue::{CopyCommand, CopyDirection, QueueRegistry};
use crate::stats::TransferStats;

static GLOBAL_PLATFORM: OnceLock<Arc<Platform>> = OnceLock::new();

/// Device allocator, execution queues and counters for one set of devices.
pub struct Platform {
    allocator: Arc<dyn DeviceAllocator>,
    queues: Arc<dyn QueueRegistry>,
    stats: TransferStats,
}

impl Platform {
    /// Build a platform from injected collaborators.
    ///
    /// The platform serves the devices both collaborators know about.
    pub fn new(allocator: Arc<dyn DeviceAllocator>, queues: Arc<dyn QueueRegistry>) -> Arc<Self> {
        Arc::new(Self {
            allocator,
            queues,
            stats: TransferStats::new(),
        })
    }

    /// Build an emulated platform from `config`.
    pub fn emulated(config: PlatformConfig) -> Result<Arc<Self>, ConfigError> {
        config.validate()?;
        let queues = EmulatedRegistry::new(&config)?;
        let allocator = EmulatedAllocator::new(&config);
        debug!(
            "emulated platform: {} device(s), {} bytes each",
            config.device_count, config.device_memory_bytes
        );
        Ok(Self::new(Arc::new(allocator), Arc::new(queues)))
    }

    /// The process-wide default platform.
    ///
    /// Uses the platform passed to [`Platform::install_global`] if one was
    /// installed before first use, otherwise an emulated platform with
    /// [`PlatformConfig::default`].
    ///
    /// # Panics
    ///
    /// Panics if the default emulated platform cannot start its queue
    /// workers.
    pub fn global() -> &'static Arc<Platform> {
        GLOBAL_PLATFORM.get_or_init(|| match Self::emulated(PlatformConfig::default()) {
            Ok(platform) => platform,
            Err(e) => panic!("failed to initialise default platform: {e}"),
        })
    }

    /// Install `platform` as the process-wide default.
    ///
    /// Fails, handing the platform back, if the default was already
    /// initialised.
    pub fn install_global(platform: Arc<Platform>) -> Result<(), Arc<Platform>> {
        GLOBAL_PLATFORM.set(platform)
    }

    /// Number of devices served.
    pub fn device_count(&self) -> u32 {
        self.allocator.device_count().min(self.queues.device_count())
    }

    /// Whether `device` exists on this platform.
    pub fn has_device(&self, device: DeviceId) -> bool {
        device.0 < self.device_count()
    }

    /// Alignment in bytes of every device allocation.
    pub fn alignment(&self) -> usize {
        self.allocator.alignment()
    }

    /// Check that device allocations can hold `T` at its natural alignment.
    pub fn check_alignment<T: Element>(&self) -> Result<(), DeviceError> {
        let element_align = mem::align_of::<T>();
        let device_align = self.alignment();
        if element_align > device_align {
            return Err(DeviceError::AlignmentUnsupported {
                element_align,
                device_align,
            });
        }
        Ok(())
    }

    /// The transfer and allocation counters.
    pub fn stats(&self) -> &TransferStats {
        &self.stats
    }

    pub(crate) fn allocate(&self, device: DeviceId, bytes: usize) -> Result<NonNull<u8>, DeviceError> {
        let ptr = self.allocator.allocate(device, bytes)?;
        if bytes > 0 {
            self.stats.record_allocation();
        }
        Ok(ptr)
    }

    /// # Safety
    ///
    /// Same contract as [`DeviceAllocator::free`].
    pub(crate) unsafe fn free(&self, device: DeviceId, ptr: NonNull<u8>, bytes: usize) {
        // SAFETY: forwarded from the caller.
        unsafe { self.allocator.free(device, ptr, bytes) };
        self.stats.record_free();
    }

    /// Copy `src` into `dst`, blocking until the device holds the data.
    ///
    /// `dst` must be exactly as large as `src`. Empty copies are not
    /// counted: nothing reaches the queue.
    pub fn upload<T: Element>(&self, src: &[T], dst: &mut DeviceBuffer) -> Result<(), DeviceError> {
        let bytes = mem::size_of_val(src);
        if bytes != dst.size() {
            return Err(DeviceError::SizeMismatch {
                host_bytes: bytes,
                device_bytes: dst.size(),
            });
        }
        let command = CopyCommand {
            direction: CopyDirection::HostToDevice,
            dst: dst.as_non_null(),
            src: NonNull::from(src).cast(),
            bytes,
        };
        // SAFETY: `src` is borrowed and `dst` mutably borrowed for the whole
        // call, sizes match, and `submit` waits for the queue to drain
        // before returning.
        unsafe { self.submit(dst.device(), command)? };
        if bytes == 0 {
            return Ok(());
        }
        self.stats.record_upload(bytes);
        trace!("uploaded {bytes} bytes to {}", dst.device());
        Ok(())
    }

    /// Copy `src` into `dst`, blocking until the host holds the data.
    ///
    /// `dst` must be exactly as large as `src`. Empty copies are not counted.
    pub fn download<T: Element>(&self, src: &DeviceBuffer, dst: &mut [T]) -> Result<(), DeviceError> {
        let bytes = mem::size_of_val(dst);
        if bytes != src.size() {
            return Err(DeviceError::SizeMismatch {
                host_bytes: bytes,
                device_bytes: src.size(),
            });
        }
        let command = CopyCommand {
            direction: CopyDirection::DeviceToHost,
            dst: NonNull::from(dst).cast(),
            src: src.as_non_null(),
            bytes,
        };
        // SAFETY: as in `upload`, with the roles of the regions swapped.
        unsafe { self.submit(src.device(), command)? };
        if bytes == 0 {
            return Ok(());
        }
        self.stats.record_download(bytes);
        trace!("downloaded {bytes} bytes from {}", src.device());
        Ok(())
    }

    /// Enqueue a raw copy on `device` and block until its queue drains.
    ///
    /// This is the primitive under [`upload`](Self::upload) and
    /// [`download`](Self::download). It does not update the counters, so
    /// it can stand in for device-side kernels writing their own memory.
    ///
    /// # Safety
    ///
    /// Same contract as [`ExecutionQueue::enqueue`](crate::ExecutionQueue::enqueue),
    /// except the regions only need to stay valid until this call returns.
    pub unsafe fn submit(&self, device: DeviceId, command: CopyCommand) -> Result<(), DeviceError> {
        let queue = self.queues.queue(device)?;
        if command.bytes > 0 {
            // SAFETY: forwarded from the caller; we wait below.
            unsafe { queue.enqueue(command)? };
        }
        queue.wait()
    }
}

impl fmt::Debug for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Platform")
            .field("device_count", &self.device_count())
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}
