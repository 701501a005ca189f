//! Errors reported by vector operations.

use std::error::Error;
use std::fmt;

use mixvec_core::{DeviceId, Place};
#[cfg(feature = "accel")]
use mixvec_device::DeviceError;

/// Errors that can occur while materialising or mutating a vector.
///
/// Every variant is a programmer or configuration error: the operation
/// that produced it has been abandoned with no partial result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VectorError {
    /// The accelerator allocator could not satisfy a request.
    AllocationFailed {
        /// Device the allocation targeted.
        device: DeviceId,
        /// Number of bytes requested.
        requested: usize,
        /// Bytes still free on the device.
        available: usize,
    },
    /// An accelerator-facing call was made without accelerator support.
    Unsupported {
        /// The rejected operation.
        operation: &'static str,
    },
    /// A place that the called accessor cannot serve.
    InvalidPlace {
        /// The rejected place.
        place: Place,
        /// What was wrong with it.
        reason: &'static str,
    },
    /// Device access for one device while the buffer's fresh accelerator
    /// data lives on another.
    ProtocolViolation {
        /// Device holding the fresh accelerator copy.
        resident: DeviceId,
        /// Device that was requested.
        requested: DeviceId,
    },
    /// Any other failure reported by the device layer.
    #[cfg(feature = "accel")]
    Device(DeviceError),
}

impl fmt::Display for VectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllocationFailed {
                device,
                requested,
                available,
            } => write!(
                f,
                "accelerator allocation failed on {device}: requested {requested} bytes, {available} available"
            ),
            Self::Unsupported { operation } => {
                write!(f, "{operation} is not supported without accelerator support")
            }
            Self::InvalidPlace { place, reason } => write!(f, "invalid place {place}: {reason}"),
            Self::ProtocolViolation {
                resident,
                requested,
            } => write!(
                f,
                "device data is resident on {resident}, cannot serve {requested} without detaching"
            ),
            #[cfg(feature = "accel")]
            Self::Device(e) => write!(f, "device error: {e}"),
        }
    }
}

impl Error for VectorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            #[cfg(feature = "accel")]
            Self::Device(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(feature = "accel")]
impl From<DeviceError> for VectorError {
    fn from(e: DeviceError) -> Self {
        match e {
            DeviceError::OutOfMemory {
                device,
                requested,
                available,
            } => Self::AllocationFailed {
                device,
                requested,
                available,
            },
            other => Self::Device(other),
        }
    }
}
