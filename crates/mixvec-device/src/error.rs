//! Device-layer error types.

use std::error::Error;
use std::fmt;

use mixvec_core::DeviceId;

/// Errors reported by allocators, execution queues and typed copies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeviceError {
    /// The device is not registered with the platform.
    UnknownDevice {
        /// The unrecognised device.
        device: DeviceId,
        /// Number of devices the platform serves.
        device_count: u32,
    },
    /// The allocator has no memory left for the request.
    OutOfMemory {
        /// Device the allocation targeted.
        device: DeviceId,
        /// Number of bytes requested.
        requested: usize,
        /// Bytes still available on the device.
        available: usize,
    },
    /// A copy's source and destination have different byte lengths.
    SizeMismatch {
        /// Bytes on the host side.
        host_bytes: usize,
        /// Bytes on the device side.
        device_bytes: usize,
    },
    /// The device's execution queue is no longer accepting work.
    QueueClosed {
        /// Device whose queue shut down.
        device: DeviceId,
    },
    /// The element type needs a stricter alignment than device
    /// allocations provide.
    AlignmentUnsupported {
        /// Alignment of the element type.
        element_align: usize,
        /// Alignment of device allocations.
        device_align: usize,
    },
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownDevice {
                device,
                device_count,
            } => {
                write!(
                    f,
                    "unknown {device}: platform has {device_count} device(s)"
                )
            }
            Self::OutOfMemory {
                device,
                requested,
                available,
            } => {
                write!(
                    f,
                    "{device} out of memory: requested {requested} bytes, {available} bytes available"
                )
            }
            Self::SizeMismatch {
                host_bytes,
                device_bytes,
            } => {
                write!(
                    f,
                    "copy size mismatch: host side {host_bytes} bytes, device side {device_bytes} bytes"
                )
            }
            Self::QueueClosed { device } => {
                write!(f, "execution queue for {device} is closed")
            }
            Self::AlignmentUnsupported {
                element_align,
                device_align,
            } => {
                write!(
                    f,
                    "element alignment {element_align} exceeds device alignment {device_align}"
                )
            }
        }
    }
}

impl Error for DeviceError {}

/// Errors detected during [`PlatformConfig::validate()`](crate::PlatformConfig::validate).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The platform must expose at least one device.
    NoDevices,
    /// Alignment must be a power of two.
    AlignmentNotPowerOfTwo {
        /// The configured alignment.
        alignment: usize,
    },
    /// Alignment is below the minimum the element types require.
    AlignmentTooSmall {
        /// The configured alignment.
        alignment: usize,
        /// The minimum accepted alignment.
        minimum: usize,
    },
    /// A device queue worker thread could not be spawned.
    WorkerSpawnFailed {
        /// Device whose queue failed to start.
        device: DeviceId,
        /// Description of the spawn failure.
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoDevices => write!(f, "platform must have at least one device"),
            Self::AlignmentNotPowerOfTwo { alignment } => {
                write!(f, "alignment {alignment} is not a power of two")
            }
            Self::AlignmentTooSmall { alignment, minimum } => {
                write!(f, "alignment {alignment} is below minimum of {minimum}")
            }
            Self::WorkerSpawnFailed { device, reason } => {
                write!(f, "queue worker for {device} failed to start: {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_memory_message_names_device() {
        let err = DeviceError::OutOfMemory {
            device: DeviceId(1),
            requested: 64,
            available: 32,
        };
        assert_eq!(
            err.to_string(),
            "device:1 out of memory: requested 64 bytes, 32 bytes available"
        );
    }

    #[test]
    fn config_error_messages() {
        assert_eq!(
            ConfigError::AlignmentNotPowerOfTwo { alignment: 24 }.to_string(),
            "alignment 24 is not a power of two"
        );
        assert_eq!(
            ConfigError::NoDevices.to_string(),
            "platform must have at least one device"
        );
    }
}
