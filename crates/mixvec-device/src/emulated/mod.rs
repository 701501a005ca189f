//! Host-heap emulation of an accelerator platform.
//!
//! [`EmulatedAllocator`] hands out aligned host allocations with a
//! per-device capacity, and [`EmulatedRegistry`] runs one
//! [`EmulatedQueue`] worker thread per device. Device memory is ordinary
//! host memory, so tests can inspect it, but every copy still travels
//! through an asynchronous queue that must be drained before the data is
//! valid.

mod allocator;
mod queue;

pub use allocator::{DeviceUsage, EmulatedAllocator};
pub use queue::{EmulatedQueue, EmulatedRegistry};
