//! Execution queue and queue registry interfaces.
//!
//! Every device owns one implicit in-order queue. Copies are enqueued
//! asynchronously; [`ExecutionQueue::wait`] blocks until everything
//! enqueued before it has completed. There is no timeout: a stalled
//! queue blocks the caller indefinitely.

use std::ptr::NonNull;
use std::sync::Arc;

use mixvec_core::DeviceId;

use crate::error::DeviceError;

/// Which way a copy moves data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CopyDirection {
    /// Host memory into device memory.
    HostToDevice,
    /// Device memory into host memory.
    DeviceToHost,
}

/// One raw byte copy scheduled on a device queue.
#[derive(Clone, Copy, Debug)]
pub struct CopyCommand {
    /// Direction of the transfer.
    pub direction: CopyDirection,
    /// Destination region start.
    pub dst: NonNull<u8>,
    /// Source region start.
    pub src: NonNull<u8>,
    /// Number of bytes to copy.
    pub bytes: usize,
}

// SAFETY: a CopyCommand is a plain description of two memory regions. The
// enqueuer guarantees both regions stay valid and unaliased until the
// queue is drained, which is what allows a worker thread to act on it.
unsafe impl Send for CopyCommand {}

/// An in-order execution queue bound to one device.
pub trait ExecutionQueue: Send + Sync {
    /// The device this queue executes on.
    fn device(&self) -> DeviceId;

    /// Schedule a copy. Returns once the command is queued, not executed.
    ///
    /// # Safety
    ///
    /// `command.src` must be valid for reads and `command.dst` valid for
    /// writes of `command.bytes` bytes, the regions must not overlap, and
    /// neither may be accessed by anything else until [`wait`](Self::wait)
    /// has returned.
    unsafe fn enqueue(&self, command: CopyCommand) -> Result<(), DeviceError>;

    /// Block until every previously enqueued command has completed.
    fn wait(&self) -> Result<(), DeviceError>;
}

/// Looks up the execution queue of a device.
pub trait QueueRegistry: Send + Sync {
    /// Number of devices with a queue.
    fn device_count(&self) -> u32;

    /// The queue for `device`.
    fn queue(&self, device: DeviceId) -> Result<Arc<dyn ExecutionQueue>, DeviceError>;
}
