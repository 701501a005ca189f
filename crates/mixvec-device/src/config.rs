//! Platform configuration parameters.

use crate::error::ConfigError;

/// Configuration for an emulated accelerator platform.
///
/// Controls how many devices exist, how much memory each one has, and
/// the alignment of device allocations. Validated at construction; all
/// values are immutable once the platform is built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlatformConfig {
    /// Number of accelerator devices. Default: 1. Minimum: 1.
    pub device_count: u32,

    /// Memory capacity of each device in bytes.
    ///
    /// Default: 1 GiB. Allocations beyond this fail with
    /// [`DeviceError::OutOfMemory`](crate::DeviceError::OutOfMemory).
    pub device_memory_bytes: usize,

    /// Alignment of every device allocation in bytes.
    ///
    /// Default: 256, matching typical accelerator allocators. Must be a
    /// power of two and at least [`PlatformConfig::MIN_ALIGNMENT`].
    pub alignment: usize,
}

impl PlatformConfig {
    /// Default number of devices.
    pub const DEFAULT_DEVICE_COUNT: u32 = 1;

    /// Default per-device capacity: 1 GiB.
    pub const DEFAULT_DEVICE_MEMORY_BYTES: usize = 1 << 30;

    /// Default allocation alignment.
    pub const DEFAULT_ALIGNMENT: usize = 256;

    /// Smallest accepted alignment. Covers every primitive element type.
    pub const MIN_ALIGNMENT: usize = 16;

    /// Create a config with `device_count` devices and default sizing.
    pub fn new(device_count: u32) -> Self {
        Self {
            device_count,
            device_memory_bytes: Self::DEFAULT_DEVICE_MEMORY_BYTES,
            alignment: Self::DEFAULT_ALIGNMENT,
        }
    }

    /// Set the per-device memory capacity.
    pub fn with_device_memory(mut self, bytes: usize) -> Self {
        self.device_memory_bytes = bytes;
        self
    }

    /// Set the allocation alignment.
    pub fn with_alignment(mut self, alignment: usize) -> Self {
        self.alignment = alignment;
        self
    }

    /// Check all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device_count == 0 {
            return Err(ConfigError::NoDevices);
        }
        if !self.alignment.is_power_of_two() {
            return Err(ConfigError::AlignmentNotPowerOfTwo {
                alignment: self.alignment,
            });
        }
        if self.alignment < Self::MIN_ALIGNMENT {
            return Err(ConfigError::AlignmentTooSmall {
                alignment: self.alignment,
                minimum: Self::MIN_ALIGNMENT,
            });
        }
        Ok(())
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DEVICE_COUNT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = PlatformConfig::default();
        assert_eq!(config.device_count, 1);
        assert_eq!(config.device_memory_bytes, 1 << 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_devices_rejected() {
        let config = PlatformConfig::new(0);
        assert_eq!(config.validate(), Err(ConfigError::NoDevices));
    }

    #[test]
    fn non_power_of_two_alignment_rejected() {
        let config = PlatformConfig::new(1).with_alignment(48);
        assert_eq!(
            config.validate(),
            Err(ConfigError::AlignmentNotPowerOfTwo { alignment: 48 })
        );
    }

    #[test]
    fn tiny_alignment_rejected() {
        let config = PlatformConfig::new(1).with_alignment(4);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::AlignmentTooSmall { alignment: 4, .. })
        ));
    }

    #[test]
    fn builder_helpers_apply() {
        let config = PlatformConfig::new(2)
            .with_device_memory(4096)
            .with_alignment(64);
        assert_eq!(config.device_count, 2);
        assert_eq!(config.device_memory_bytes, 4096);
        assert_eq!(config.alignment, 64);
    }
}
