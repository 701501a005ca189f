//! Freshness of the two copies held by a dual-location buffer.

use std::fmt;

use mixvec_core::{DeviceId, Place};

/// Which location holds the most recent write.
///
/// The two copies can never both carry unsynchronised writes: a write on
/// one side moves the state to that side's `*Fresh` variant, making the
/// other side stale. Device-bearing variants name the device whose copy
/// is valid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Freshness {
    /// Only the host copy is valid. Any accelerator copy is stale.
    #[default]
    HostFresh,
    /// Only the accelerator copy on this device is valid.
    DeviceFresh(DeviceId),
    /// Both copies hold the same data.
    BothFresh(DeviceId),
}

impl Freshness {
    /// Whether reading the host copy needs a device-to-host transfer first.
    pub fn host_is_stale(self) -> bool {
        matches!(self, Self::DeviceFresh(_))
    }

    /// The device whose accelerator copy is valid, if any.
    pub fn fresh_device(self) -> Option<DeviceId> {
        match self {
            Self::HostFresh => None,
            Self::DeviceFresh(d) | Self::BothFresh(d) => Some(d),
        }
    }

    /// Whether `place` can be read without a transfer.
    pub fn is_fresh_at(self, place: Place) -> bool {
        match place {
            Place::Host => !self.host_is_stale(),
            Place::Device(d) => self.fresh_device() == Some(d),
        }
    }

    /// State after the host copy has been brought up to date.
    pub(crate) fn host_synced(self) -> Self {
        match self {
            Self::DeviceFresh(d) => Self::BothFresh(d),
            other => other,
        }
    }
}

impl fmt::Display for Freshness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HostFresh => write!(f, "host fresh"),
            Self::DeviceFresh(d) => write!(f, "{d} fresh"),
            Self::BothFresh(d) => write!(f, "host and {d} fresh"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_fresh_is_the_default() {
        assert_eq!(Freshness::default(), Freshness::HostFresh);
        assert!(Freshness::HostFresh.is_fresh_at(Place::Host));
        assert!(!Freshness::HostFresh.is_fresh_at(Place::device(0)));
    }

    #[test]
    fn device_fresh_makes_host_stale() {
        let s = Freshness::DeviceFresh(DeviceId(2));
        assert!(s.host_is_stale());
        assert!(!s.is_fresh_at(Place::Host));
        assert!(s.is_fresh_at(Place::device(2)));
        assert!(!s.is_fresh_at(Place::device(1)));
    }

    #[test]
    fn host_sync_only_changes_device_fresh() {
        assert_eq!(
            Freshness::DeviceFresh(DeviceId(1)).host_synced(),
            Freshness::BothFresh(DeviceId(1))
        );
        assert_eq!(Freshness::HostFresh.host_synced(), Freshness::HostFresh);
        assert_eq!(
            Freshness::BothFresh(DeviceId(0)).host_synced(),
            Freshness::BothFresh(DeviceId(0))
        );
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn freshness() -> impl Strategy<Value = Freshness> {
            prop_oneof![
                Just(Freshness::HostFresh),
                (0u32..4).prop_map(|d| Freshness::DeviceFresh(DeviceId(d))),
                (0u32..4).prop_map(|d| Freshness::BothFresh(DeviceId(d))),
            ]
        }

        proptest! {
            #[test]
            fn at_most_one_device_is_fresh(s in freshness(), d in 0u32..4) {
                let fresh = (0u32..4).filter(|&i| s.is_fresh_at(Place::device(i))).count();
                prop_assert!(fresh <= 1);
                prop_assert_eq!(s.is_fresh_at(Place::device(d)), s.fresh_device() == Some(DeviceId(d)));
            }

            #[test]
            fn synced_host_is_always_readable(s in freshness()) {
                prop_assert!(s.host_synced().is_fresh_at(Place::Host));
            }
        }
    }
}
