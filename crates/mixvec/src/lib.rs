//! Copy-on-write vectors that stay consistent between host memory and an
//! accelerator device.
//!
//! A `MixedVector` looks like an ordinary contiguous vector. Behind it
//! sits a `DualBuffer` holding the host elements and,
//! once device data has been requested, a copy in accelerator memory. Each
//! access path transfers data lazily so that every read observes the most
//! recent write, whichever side performed it. Clones share one buffer
//! until one of them mutates.
//!
//! # Architecture
//!
//! ```text
//! MixedVector<T>                 handle; O(1) clone
//! └── CowPtr<DualBuffer<T>>      Arc; forks on first mutation when shared
//!     └── DualBuffer<T>
//!         ├── Vec<T>             host copy
//!         ├── Freshness          HostFresh | DeviceFresh(d) | BothFresh(d)
//!         └── DeviceBuffer       accelerator copy (mixvec-device), lazy
//! ```
//!
//! Every transfer is blocking: it returns once the destination holds valid
//! data.
//!
//! # Features
//!
//! - `accel` (default): the accelerator path above. Without it, [`Vector`]
//!   is the host-only [`CpuVector`], whose device accessors report
//!   [`VectorError::Unsupported`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod access;
#[cfg(feature = "accel")]
#[allow(unsafe_code)]
pub mod buffer;
pub mod cow;
pub mod cpu;
pub mod error;
#[cfg(feature = "accel")]
pub mod state;
#[cfg(feature = "accel")]
pub mod vector;

pub use access::PlaceAccess;
pub use cpu::CpuVector;
pub use error::VectorError;
pub use mixvec_core::{BufferId, DeviceId, Element, Place};

#[cfg(feature = "accel")]
pub use mixvec_device::{Platform, PlatformConfig, TransferSnapshot};
#[cfg(feature = "accel")]
pub use state::Freshness;
#[cfg(feature = "accel")]
pub use vector::MixedVector;

/// The vector type for this build: [`MixedVector`] with the `accel`
/// feature, [`CpuVector`] without.
#[cfg(feature = "accel")]
pub type Vector<T> = MixedVector<T>;

/// The vector type for this build: `MixedVector` with the `accel`
/// feature, [`CpuVector`] without.
#[cfg(not(feature = "accel"))]
pub type Vector<T> = CpuVector<T>;

/// Build a [`Vector`] from a list of elements, like `vec!`.
///
/// ```
/// let v = mixvec::mixvec![1u8, 2, 3];
/// assert_eq!(v.len(), 3);
/// let z = mixvec::mixvec![0.0f32; 4];
/// assert_eq!(z.to_vec(), vec![0.0; 4]);
/// ```
#[macro_export]
macro_rules! mixvec {
    () => {
        $crate::Vector::from(::std::vec::Vec::new())
    };
    ($elem:expr; $n:expr) => {
        $crate::Vector::from(::std::vec![$elem; $n])
    };
    ($($x:expr),+ $(,)?) => {
        $crate::Vector::from(::std::vec![$($x),+])
    };
}
