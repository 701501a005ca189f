//! The process-wide default platform. Kept in its own binary because the
//! global can be set only once per process.

use std::sync::Arc;

use mixvec_core::DeviceId;
use mixvec_device::{Platform, PlatformConfig};

#[test]
fn installed_platform_becomes_the_global() {
    let installed = Platform::emulated(PlatformConfig::new(3).with_device_memory(1 << 16)).unwrap();
    Platform::install_global(Arc::clone(&installed)).unwrap();

    let global = Platform::global();
    assert!(Arc::ptr_eq(global, &installed));
    assert_eq!(global.device_count(), 3);
    assert!(global.has_device(DeviceId(2)));

    let late = Platform::emulated(PlatformConfig::default()).unwrap();
    let rejected = Platform::install_global(Arc::clone(&late)).unwrap_err();
    assert!(Arc::ptr_eq(&rejected, &late));
    assert!(Arc::ptr_eq(Platform::global(), &installed));
}
