//! Strongly-typed identifiers.

use std::fmt;

/// Identifies one accelerator unit.
///
/// Devices are numbered from zero in the order the platform registers
/// them. `DeviceId(n)` corresponds to the n-th device of the platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(pub u32);

impl DeviceId {
    /// The index of this device as a `usize`, for table lookups.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "device:{}", self.0)
    }
}

impl From<u32> for DeviceId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Opaque identity of the storage behind a container.
///
/// Two containers report equal `BufferId`s exactly when they currently
/// share the same underlying buffer. The value is only meaningful while
/// both containers are alive; a dropped buffer's identity may be reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferId(usize);

impl BufferId {
    /// Build an identity from the address of the shared storage.
    pub fn from_addr<T: ?Sized>(ptr: *const T) -> Self {
        Self(ptr.cast::<()>() as usize)
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buffer@{:#x}", self.0)
    }
}
