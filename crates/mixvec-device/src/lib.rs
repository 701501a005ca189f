//! Accelerator memory and execution queues for mixvec.
//!
//! This crate owns everything that touches raw device memory. Its
//! `unsafe` code is confined to the emulated backend, [`DeviceBuffer`]
//! and the copy helpers on [`Platform`].
//!
//! # Architecture
//!
//! ```text
//! Platform (shared via Arc)
//! ├── Arc<dyn DeviceAllocator>   allocate / free by device + size
//! ├── Arc<dyn QueueRegistry>     one ExecutionQueue per device
//! │   └── ExecutionQueue         enqueue copies, wait until drained
//! └── TransferStats              atomic transfer / allocation counters
//!
//! DeviceBuffer (RAII)            one allocation on one device
//! ```
//!
//! The emulated backend ([`emulated`]) implements both collaborator
//! traits on top of the host heap with one worker thread per device, so
//! the full synchronization protocol can run and be tested anywhere.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod alloc;
pub mod buffer;
pub mod config;
pub mod emulated;
pub mod error;
pub mod platform;
pub mod queue;
pub mod stats;

pub use alloc::DeviceAllocator;
pub use buffer::DeviceBuffer;
pub use config::PlatformConfig;
pub use error::{ConfigError, DeviceError};
pub use platform::Platform;
pub use queue::{CopyCommand, CopyDirection, ExecutionQueue, QueueRegistry};
pub use stats::{TransferSnapshot, TransferStats};
