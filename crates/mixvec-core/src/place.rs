//! Memory places: the host, or one accelerator device.

use std::fmt;

use crate::id::DeviceId;

/// A memory domain that data can be materialized in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Place {
    /// Host (CPU) memory.
    #[default]
    Host,
    /// Memory of the given accelerator device.
    Device(DeviceId),
}

impl Place {
    /// Shorthand for `Place::Device(DeviceId(index))`.
    pub fn device(index: u32) -> Self {
        Self::Device(DeviceId(index))
    }

    /// Whether this place is host memory.
    pub fn is_host(self) -> bool {
        matches!(self, Self::Host)
    }

    /// Whether this place is accelerator memory.
    pub fn is_device(self) -> bool {
        matches!(self, Self::Device(_))
    }

    /// The device this place names, or `None` for the host.
    pub fn device_id(self) -> Option<DeviceId> {
        match self {
            Self::Host => None,
            Self::Device(id) => Some(id),
        }
    }
}

impl From<DeviceId> for Place {
    fn from(id: DeviceId) -> Self {
        Self::Device(id)
    }
}

impl fmt::Display for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => write!(f, "host"),
            Self::Device(id) => write!(f, "{id}"),
        }
    }
}
