//! The host-only container and the feature-selected `Vector` alias.

use mixvec::{mixvec, CpuVector, DeviceId, Place, PlaceAccess, Vector, VectorError};

#[test]
fn cpu_vector_rejects_device_access() {
    let mut v = CpuVector::from(vec![1u32, 2, 3]);
    assert!(!v.supports_accelerator());
    assert_eq!(
        v.device_data(DeviceId(0)).unwrap_err(),
        VectorError::Unsupported {
            operation: "device_data"
        }
    );
    assert!(matches!(
        v.mutable_data_at(Place::device(0)),
        Err(VectorError::InvalidPlace { .. })
    ));
    let host = v.data_at(Place::Host).unwrap();
    assert_eq!(host, v.as_slice().as_ptr());
}

#[test]
fn cpu_vector_sequence_operations() {
    let mut v: CpuVector<i64> = CpuVector::new();
    v.resize(4);
    assert_eq!(v, vec![0; 4]);
    v.assign([5, 6]);
    v.extend_from_slice(&[7]);
    v.extend(vec![8, 9]);
    assert_eq!(v.to_string(), "5 6 7 8 9");
    let cap = v.capacity();
    v.clear();
    assert!(v.is_empty());
    assert!(v.capacity() >= cap);
}

#[test]
fn vector_alias_supports_the_common_surface() {
    let mut v: Vector<u16> = mixvec![1, 2, 3];
    v.push(4);
    v[0] = 10;
    let w = v.clone();
    v.truncate(2);
    assert_eq!(v.to_vec(), vec![10, 2]);
    assert_eq!(w.to_vec(), vec![10, 2, 3, 4]);
    assert!(v.data_at(Place::Host).is_ok());
}

#[cfg(not(feature = "accel"))]
#[test]
fn vector_alias_is_host_only_without_accel() {
    let mut v: Vector<f32> = mixvec![0.5; 3];
    assert!(!PlaceAccess::supports_accelerator(&v));
    assert!(matches!(
        v.device_data(DeviceId(0)),
        Err(VectorError::Unsupported { .. })
    ));
}

#[cfg(feature = "accel")]
#[test]
fn vector_alias_reaches_the_device_with_accel() {
    let mut v: Vector<f32> = mixvec![0.5; 3];
    assert!(PlaceAccess::supports_accelerator(&v));
    assert!(v.device_data(DeviceId(0)).is_ok());
    assert_eq!(v, vec![0.5; 3]);
}
