//! The dual-location buffer: a host `Vec<T>` plus an optional accelerator
//! copy, kept consistent by an explicit [`Freshness`] state.
//!
//! # Access paths
//!
//! | Path | Receiver | Effect on freshness |
//! |------|----------|---------------------|
//! | [`host`](DualBuffer::host) | `&self` | `DeviceFresh(d)` → `BothFresh(d)` after a download |
//! | [`device_ptr`](DualBuffer::device_ptr) | `&self` | `HostFresh` → `BothFresh(d)` after an upload |
//! | [`host_mut`](DualBuffer::host_mut) and friends | `&mut self` | → `HostFresh` |
//! | [`device_ptr_mut`](DualBuffer::device_ptr_mut) | `&mut self` | → `DeviceFresh(d)` |
//!
//! Shared (`&self`) paths only ever bring a stale side up to date; they
//! never discard data. A `&self` device request for a device other than
//! the one holding fresh accelerator data is a
//! [`ProtocolViolation`](VectorError::ProtocolViolation). The `&mut self`
//! paths resolve the same request by normalising to host and retargeting.
//!
//! # Locking
//!
//! The host vector lives in an `UnsafeCell`. It is written through
//! `&self` in exactly one place: the download in [`host`](DualBuffer::host),
//! which runs under the state lock and only while the state is
//! `DeviceFresh`. That state is entered through `&mut self` alone, so no
//! shared borrow of the host data can be alive while it holds. Every other
//! `&self` access to the host vector also takes the lock first.
//!
//! This per-buffer lock is held across a blocking transfer, so racing
//! readers wait for the one that moves the data instead of copying it
//! again. It is a different lock from the affinity check in
//! [`MixedVector`](crate::MixedVector), which reads the resident device and
//! releases the lock before any transfer starts. Queue workers never take
//! this lock.

use std::cell::UnsafeCell;
use std::fmt;
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, trace};
use mixvec_core::{DeviceId, Element, Place};
use mixvec_device::{DeviceBuffer, Platform};

use crate::cow::Fork;
use crate::error::VectorError;
use crate::state::Freshness;

struct SyncState {
    freshness: Freshness,
    /// `Some` whenever freshness names a device, and then sized to the host.
    accel: Option<DeviceBuffer>,
}

impl SyncState {
    fn accel(&self) -> &DeviceBuffer {
        self.accel
            .as_ref()
            .expect("device-fresh buffer owns an accelerator copy")
    }

    fn accel_mut(&mut self) -> &mut DeviceBuffer {
        self.accel
            .as_mut()
            .expect("device-fresh buffer owns an accelerator copy")
    }
}

/// Host data plus an optional accelerator copy of it.
pub struct DualBuffer<T: Element> {
    host: UnsafeCell<Vec<T>>,
    sync: Mutex<SyncState>,
    platform: Arc<Platform>,
}

// SAFETY: see the module docs. Shared access writes the host vector only
// under `sync`, and only when no shared borrow of it can exist.
unsafe impl<T: Element> Sync for DualBuffer<T> {}

impl<T: Element> DualBuffer<T> {
    /// An empty buffer on `platform`.
    pub fn new(platform: Arc<Platform>) -> Self {
        Self::from_vec(Vec::new(), platform)
    }

    /// Wrap an existing host vector. The host copy starts out authoritative.
    pub fn from_vec(host: Vec<T>, platform: Arc<Platform>) -> Self {
        Self {
            host: UnsafeCell::new(host),
            sync: Mutex::new(SyncState {
                freshness: Freshness::HostFresh,
                accel: None,
            }),
            platform,
        }
    }

    /// The platform accelerator copies are allocated on.
    pub fn platform(&self) -> &Arc<Platform> {
        &self.platform
    }

    fn lock(&self) -> MutexGuard<'_, SyncState> {
        self.sync.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Split `&mut self` into its host vector and state without locking.
    fn parts_mut(&mut self) -> (&mut Vec<T>, &mut SyncState, &Arc<Platform>) {
        let state = self.sync.get_mut().unwrap_or_else(PoisonError::into_inner);
        (self.host.get_mut(), state, &self.platform)
    }

    /// Current freshness state.
    pub fn freshness(&self) -> Freshness {
        self.lock().freshness
    }

    /// The device whose accelerator copy is currently valid, if any.
    pub fn fresh_device(&self) -> Option<DeviceId> {
        self.lock().freshness.fresh_device()
    }

    /// The device the accelerator allocation lives on, fresh or not.
    pub fn resident_device(&self) -> Option<DeviceId> {
        self.lock().accel.as_ref().map(DeviceBuffer::device)
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        let _state = self.lock();
        // SAFETY: lock held; the length only changes through `&mut self`.
        unsafe { (*self.host.get()).len() }
    }

    /// Whether the buffer holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Host capacity in elements.
    pub fn capacity(&self) -> usize {
        let _state = self.lock();
        // SAFETY: as in `len`.
        unsafe { (*self.host.get()).capacity() }
    }

    /// The host copy, downloading first if the accelerator copy is newer.
    ///
    /// Blocks until any transfer completes. Safe to call from several
    /// threads sharing the buffer: only the first caller transfers.
    pub fn host(&self) -> Result<&[T], VectorError> {
        let mut state = self.lock();
        if state.freshness.host_is_stale() {
            // SAFETY: the state is `DeviceFresh`, so no shared borrow of the
            // host data exists, and we hold the lock.
            let host = unsafe { &mut *self.host.get() };
            sync_host(&self.platform, &mut state, host)?;
        }
        drop(state);
        // SAFETY: the host copy is fresh and stays untouched until a
        // `&mut self` call, which cannot overlap the returned borrow.
        Ok(unsafe { (*self.host.get()).as_slice() })
    }

    /// Device address of the data on `device`, uploading first if needed.
    ///
    /// Fails with [`VectorError::ProtocolViolation`] if fresh accelerator
    /// data lives on a different device: resolving that needs exclusive
    /// access (see [`materialize`](Self::materialize)).
    pub fn device_ptr(&self, device: DeviceId) -> Result<*const T, VectorError> {
        let mut state = self.lock();
        match state.freshness.fresh_device() {
            Some(resident) if resident == device => {}
            Some(resident) => {
                return Err(VectorError::ProtocolViolation {
                    resident,
                    requested: device,
                })
            }
            None => {
                // SAFETY: the host copy is fresh and only read here.
                let host = unsafe { (*self.host.get()).as_slice() };
                sync_device(&self.platform, &mut state, host, device)?;
            }
        }
        Ok(state.accel().as_ptr())
    }

    /// Make `place` hold valid data, blocking until the transfer is done.
    ///
    /// For a device other than the one holding fresh accelerator data, the
    /// data is first brought back to host and the accelerator copy is
    /// reallocated on `place`.
    pub fn materialize(&mut self, place: Place) -> Result<(), VectorError> {
        let (host, state, platform) = self.parts_mut();
        if state.freshness.is_fresh_at(place) {
            return Ok(());
        }
        match place {
            Place::Host => sync_host(platform, state, host),
            Place::Device(device) => {
                if let Some(resident) = state.freshness.fresh_device() {
                    debug!("retargeting accelerator copy from {resident} to {device}");
                }
                sync_host(platform, state, host)?;
                sync_device(platform, state, host, device)
            }
        }
    }

    /// Writable device address of the data on `device`.
    ///
    /// The host copy becomes stale.
    pub fn device_ptr_mut(&mut self, device: DeviceId) -> Result<*mut T, VectorError> {
        self.materialize(Place::Device(device))?;
        let (_, state, _) = self.parts_mut();
        state.freshness = Freshness::DeviceFresh(device);
        Ok(state.accel_mut().as_mut_ptr())
    }

    /// Writable host data. The accelerator copy becomes stale.
    pub fn host_mut(&mut self) -> Result<&mut [T], VectorError> {
        Ok(self.host_vec_mut()?.as_mut_slice())
    }

    /// Writable host vector, synchronised first.
    pub(crate) fn host_vec_mut(&mut self) -> Result<&mut Vec<T>, VectorError> {
        let (host, state, platform) = self.parts_mut();
        sync_host(platform, state, host)?;
        state.freshness = Freshness::HostFresh;
        Ok(host)
    }

    /// Writable host vector for callers that replace its contents outright.
    ///
    /// Skips the download: whatever the accelerator held is discarded.
    pub(crate) fn host_vec_for_overwrite(&mut self) -> &mut Vec<T> {
        let (host, state, _) = self.parts_mut();
        state.freshness = Freshness::HostFresh;
        host
    }

    /// Append one element.
    pub fn push(&mut self, value: T) -> Result<(), VectorError> {
        self.host_vec_mut()?.push(value);
        Ok(())
    }

    /// Append a slice.
    pub fn extend_from_slice(&mut self, values: &[T]) -> Result<(), VectorError> {
        self.host_vec_mut()?.extend_from_slice(values);
        Ok(())
    }

    /// Resize to `len`, filling new slots with `value`.
    pub fn resize(&mut self, len: usize, value: T) -> Result<(), VectorError> {
        self.host_vec_mut()?.resize(len, value);
        Ok(())
    }

    /// Shorten to `len` elements.
    pub fn truncate(&mut self, len: usize) -> Result<(), VectorError> {
        self.host_vec_mut()?.truncate(len);
        Ok(())
    }

    /// Reserve room for `additional` more elements on the host.
    pub fn reserve(&mut self, additional: usize) -> Result<(), VectorError> {
        self.host_vec_mut()?.reserve(additional);
        Ok(())
    }

    /// Remove every element, keeping the host allocation.
    pub fn clear(&mut self) {
        self.host_vec_for_overwrite().clear();
    }

    /// Replace the contents with `values`.
    pub fn assign(&mut self, values: &[T]) {
        let host = self.host_vec_for_overwrite();
        host.clear();
        host.extend_from_slice(values);
    }

    /// Unwrap into the host vector, downloading first if needed.
    pub fn into_vec(mut self) -> Result<Vec<T>, VectorError> {
        self.materialize(Place::Host)?;
        Ok(mem::take(self.host.get_mut()))
    }

    /// Whether both buffers hold the same host-visible elements.
    pub fn content_eq(&self, other: &Self) -> Result<bool, VectorError>
    where
        T: PartialEq,
    {
        if std::ptr::eq(self, other) {
            return Ok(true);
        }
        Ok(self.host()? == other.host()?)
    }
}

/// Download into `host` if the state is `DeviceFresh`.
fn sync_host<T: Element>(
    platform: &Platform,
    state: &mut SyncState,
    host: &mut [T],
) -> Result<(), VectorError> {
    let Freshness::DeviceFresh(device) = state.freshness else {
        return Ok(());
    };
    platform.download(state.accel(), host)?;
    trace!("synced {} elements from {device} to host", host.len());
    state.freshness = state.freshness.host_synced();
    Ok(())
}

/// Upload the (fresh) host copy to `device`, reallocating the accelerator
/// copy if it sits elsewhere or has the wrong size.
///
/// A copy on another device is replaced by a new allocation swapped in
/// before the old one is freed, so a failed allocation leaves it alone.
fn sync_device<T: Element>(
    platform: &Arc<Platform>,
    state: &mut SyncState,
    host: &[T],
    device: DeviceId,
) -> Result<(), VectorError> {
    platform.check_alignment::<T>()?;
    let bytes = mem::size_of_val(host);
    state.freshness = Freshness::HostFresh;
    match state.accel.as_mut() {
        Some(accel) if accel.device() == device && accel.size() == bytes => {}
        Some(accel) if accel.device() != device => {
            debug!(
                "moving accelerator copy: {} bytes on {} -> {bytes} bytes on {device}",
                accel.size(),
                accel.device()
            );
            let mut evicted = DeviceBuffer::new(platform, device, bytes)?;
            accel.swap(&mut evicted);
        }
        Some(accel) => {
            debug!(
                "reallocating accelerator copy: {} bytes on {} -> {bytes} bytes on {device}",
                accel.size(),
                accel.device()
            );
            if let Err(e) = accel.resize(device, bytes) {
                state.accel = None;
                return Err(e.into());
            }
        }
        None => {
            debug!("allocating {bytes} bytes on {device}");
            state.accel = Some(DeviceBuffer::new(platform, device, bytes)?);
        }
    }
    platform.upload(host, state.accel_mut())?;
    trace!("synced {} elements from host to {device}", host.len());
    state.freshness = Freshness::BothFresh(device);
    Ok(())
}

impl<T: Element> Fork for DualBuffer<T> {
    type Error = VectorError;

    /// Deep copy of the host-visible contents. The copy has no accelerator
    /// side and keeps the source's host capacity.
    fn fork(&self) -> Result<Self, VectorError> {
        let host = self.host()?;
        let mut copy = Vec::with_capacity(self.capacity());
        copy.extend_from_slice(host);
        debug!("forked buffer of {} elements", copy.len());
        Ok(Self::from_vec(copy, Arc::clone(&self.platform)))
    }
}

impl<T: Element> fmt::Debug for DualBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("DualBuffer")
            .field("freshness", &state.freshness)
            .field("accel", &state.accel)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mixvec_device::{DeviceError, PlatformConfig};
    use mixvec_test_utils::{platform, read_device, write_device};

    fn buffer(values: &[u32], devices: u32) -> DualBuffer<u32> {
        DualBuffer::from_vec(values.to_vec(), platform(devices))
    }

    #[test]
    fn new_buffer_is_host_fresh_without_accel() {
        let b = buffer(&[1, 2, 3], 1);
        assert_eq!(b.freshness(), Freshness::HostFresh);
        assert_eq!(b.resident_device(), None);
        assert_eq!(b.len(), 3);
        assert_eq!(b.host().unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn shared_device_read_uploads_once() {
        let b = buffer(&[4, 5, 6], 1);
        let stats = b.platform().stats();
        let before = stats.snapshot();

        let first = b.device_ptr(DeviceId(0)).unwrap();
        let second = b.device_ptr(DeviceId(0)).unwrap();

        assert_eq!(first, second);
        assert_eq!(b.freshness(), Freshness::BothFresh(DeviceId(0)));
        let delta = stats.snapshot().since(&before);
        assert_eq!(delta.host_to_device, 1);
        assert_eq!(delta.bytes_to_device, 12);
        // SAFETY: the pointer addresses three u32 on device 0.
        let on_device = unsafe { read_device(b.platform(), DeviceId(0), first, 3) };
        assert_eq!(on_device, vec![4, 5, 6]);
    }

    #[test]
    fn device_write_then_host_read_downloads() {
        let mut b = buffer(&[1, 2, 3], 1);
        let ptr = b.device_ptr_mut(DeviceId(0)).unwrap();
        assert_eq!(b.freshness(), Freshness::DeviceFresh(DeviceId(0)));
        // SAFETY: the pointer addresses three u32 on device 0.
        unsafe { write_device(b.platform(), DeviceId(0), ptr, &[7]) };

        assert_eq!(b.host().unwrap(), &[7, 2, 3]);
        assert_eq!(b.freshness(), Freshness::BothFresh(DeviceId(0)));
        assert_eq!(b.platform().stats().snapshot().device_to_host, 1);
    }

    #[test]
    fn host_write_marks_device_stale() {
        let mut b = buffer(&[1, 2, 3], 1);
        b.device_ptr(DeviceId(0)).unwrap();
        b.host_mut().unwrap()[1] = 99;
        assert_eq!(b.freshness(), Freshness::HostFresh);
        // The stale allocation is kept for reuse.
        assert_eq!(b.resident_device(), Some(DeviceId(0)));

        let ptr = b.device_ptr(DeviceId(0)).unwrap();
        // SAFETY: three u32 on device 0.
        let on_device = unsafe { read_device(b.platform(), DeviceId(0), ptr, 3) };
        assert_eq!(on_device, vec![1, 99, 3]);
        assert_eq!(b.platform().stats().snapshot().allocations, 1);
    }

    #[test]
    fn shared_request_for_other_device_is_a_protocol_violation() {
        let b = buffer(&[1, 2], 2);
        b.device_ptr(DeviceId(0)).unwrap();
        let err = b.device_ptr(DeviceId(1)).unwrap_err();
        assert_eq!(
            err,
            VectorError::ProtocolViolation {
                resident: DeviceId(0),
                requested: DeviceId(1)
            }
        );
        assert_eq!(b.freshness(), Freshness::BothFresh(DeviceId(0)));
    }

    #[test]
    fn exclusive_retarget_keeps_unsynced_device_data() {
        let mut b = buffer(&[1, 2, 3], 2);
        let ptr = b.device_ptr_mut(DeviceId(0)).unwrap();
        // SAFETY: three u32 on device 0.
        unsafe { write_device(b.platform(), DeviceId(0), ptr, &[10, 20, 30]) };

        b.materialize(Place::device(1)).unwrap();

        assert_eq!(b.freshness(), Freshness::BothFresh(DeviceId(1)));
        assert_eq!(b.resident_device(), Some(DeviceId(1)));
        assert_eq!(b.host().unwrap(), &[10, 20, 30]);
        let ptr = b.device_ptr(DeviceId(1)).unwrap();
        // SAFETY: three u32 on device 1.
        let on_device = unsafe { read_device(b.platform(), DeviceId(1), ptr, 3) };
        assert_eq!(on_device, vec![10, 20, 30]);
        assert_eq!(b.platform().stats().snapshot().live_allocations(), 1);
    }

    #[test]
    fn growth_reallocates_device_copy() {
        let mut b = buffer(&[1, 2], 1);
        b.device_ptr(DeviceId(0)).unwrap();
        b.push(3).unwrap();
        let ptr = b.device_ptr(DeviceId(0)).unwrap();
        // SAFETY: three u32 on device 0.
        let on_device = unsafe { read_device(b.platform(), DeviceId(0), ptr, 3) };
        assert_eq!(on_device, vec![1, 2, 3]);
        let stats = b.platform().stats().snapshot();
        assert_eq!(stats.allocations, 2);
        assert_eq!(stats.frees, 1);
    }

    #[test]
    fn clear_and_assign_skip_the_download() {
        let mut b = buffer(&[1, 2, 3], 1);
        b.device_ptr_mut(DeviceId(0)).unwrap();
        b.clear();
        assert!(b.is_empty());
        assert_eq!(b.freshness(), Freshness::HostFresh);

        b.device_ptr_mut(DeviceId(0)).unwrap();
        b.assign(&[8, 9]);
        assert_eq!(b.host().unwrap(), &[8, 9]);
        assert_eq!(b.platform().stats().snapshot().device_to_host, 0);
    }

    #[test]
    fn fork_normalises_and_drops_accel_side() {
        let mut b = buffer(&[1, 2, 3], 1);
        b.reserve(64).unwrap();
        let ptr = b.device_ptr_mut(DeviceId(0)).unwrap();
        // SAFETY: three u32 on device 0.
        unsafe { write_device(b.platform(), DeviceId(0), ptr, &[5]) };

        let copy = b.fork().unwrap();

        assert_eq!(copy.host().unwrap(), &[5, 2, 3]);
        assert_eq!(copy.freshness(), Freshness::HostFresh);
        assert_eq!(copy.resident_device(), None);
        assert!(copy.capacity() >= 67);
        assert_eq!(b.freshness(), Freshness::BothFresh(DeviceId(0)));
    }

    #[test]
    fn into_vec_downloads_pending_device_writes() {
        let mut b = buffer(&[0, 0], 1);
        let ptr = b.device_ptr_mut(DeviceId(0)).unwrap();
        // SAFETY: two u32 on device 0.
        unsafe { write_device(b.platform(), DeviceId(0), ptr, &[3, 4]) };
        assert_eq!(b.into_vec().unwrap(), vec![3, 4]);
    }

    #[test]
    fn drop_frees_accelerator_copy() {
        let p = platform(1);
        {
            let b = DualBuffer::from_vec(vec![1u8; 16], Arc::clone(&p));
            b.device_ptr(DeviceId(0)).unwrap();
            assert_eq!(p.stats().snapshot().live_allocations(), 1);
        }
        assert_eq!(p.stats().snapshot().live_allocations(), 0);
    }

    #[test]
    fn allocation_failure_is_reported() {
        let p = mixvec_test_utils::platform_with_memory(1, 64);
        let b = DualBuffer::from_vec(vec![0u64; 16], p);
        let err = b.device_ptr(DeviceId(0)).unwrap_err();
        assert!(matches!(err, VectorError::AllocationFailed { requested: 128, .. }));
        assert_eq!(b.freshness(), Freshness::HostFresh);
        assert_eq!(b.resident_device(), None);
    }

    #[test]
    fn content_eq_compares_host_visible_data() {
        let mut a = buffer(&[1, 2, 3], 1);
        let b = buffer(&[9, 2, 3], 1);
        let ptr = a.device_ptr_mut(DeviceId(0)).unwrap();
        // SAFETY: three u32 on device 0.
        unsafe { write_device(a.platform(), DeviceId(0), ptr, &[9]) };
        assert!(a.content_eq(&b).unwrap());
        assert!(a.content_eq(&a).unwrap());
    }

    #[test]
    fn failed_move_to_other_device_keeps_old_copy() {
        let p = mixvec_test_utils::platform_with_memory(2, 64);
        let mut b = DualBuffer::from_vec(vec![7u32; 16], Arc::clone(&p));
        b.device_ptr(DeviceId(0)).unwrap();
        let squatter = DualBuffer::from_vec(vec![0u8; 64], Arc::clone(&p));
        squatter.device_ptr(DeviceId(1)).unwrap();

        let err = b.materialize(Place::device(1)).unwrap_err();

        assert!(matches!(err, VectorError::AllocationFailed { device: DeviceId(1), .. }));
        assert_eq!(b.resident_device(), Some(DeviceId(0)));
        assert_eq!(b.freshness(), Freshness::HostFresh);
        assert_eq!(b.host().unwrap(), &[7; 16]);

        let before = p.stats().snapshot();
        b.device_ptr(DeviceId(0)).unwrap();
        let delta = p.stats().snapshot().since(&before);
        assert_eq!(delta.allocations, 0);
        assert_eq!(delta.host_to_device, 1);
    }

    #[test]
    fn move_to_other_device_frees_the_old_copy() {
        let p = platform(2);
        let mut b = DualBuffer::from_vec(vec![1u16, 2, 3], Arc::clone(&p));
        b.device_ptr(DeviceId(0)).unwrap();
        b.materialize(Place::device(1)).unwrap();
        let stats = p.stats().snapshot();
        assert_eq!(stats.allocations, 2);
        assert_eq!(stats.frees, 1);
        assert_eq!(b.resident_device(), Some(DeviceId(1)));
    }

    #[test]
    fn materialize_at_fresh_place_does_nothing() {
        let mut b = buffer(&[1, 2], 1);
        b.device_ptr(DeviceId(0)).unwrap();
        let before = b.platform().stats().snapshot();
        b.materialize(Place::Host).unwrap();
        b.materialize(Place::device(0)).unwrap();
        assert_eq!(b.platform().stats().snapshot().since(&before).transfers(), 0);
    }

    #[test]
    fn over_aligned_elements_stay_on_host() {
        #[repr(align(64))]
        #[derive(Clone, Copy, Debug, PartialEq)]
        struct Wide(u8);

        let p = Platform::emulated(PlatformConfig::new(1).with_alignment(32)).unwrap();
        let b = DualBuffer::from_vec(vec![Wide(1), Wide(2)], Arc::clone(&p));

        let err = b.device_ptr(DeviceId(0)).unwrap_err();

        assert_eq!(
            err,
            VectorError::Device(DeviceError::AlignmentUnsupported {
                element_align: 64,
                device_align: 32,
            })
        );
        assert_eq!(b.resident_device(), None);
        assert_eq!(p.stats().snapshot().allocations, 0);
        assert_eq!(b.host().unwrap(), &[Wide(1), Wide(2)]);
    }

    #[test]
    fn empty_buffer_leaves_no_live_allocation() {
        let p = platform(1);
        {
            let mut b = DualBuffer::<u32>::new(Arc::clone(&p));
            b.device_ptr(DeviceId(0)).unwrap();
            b.push(1).unwrap();
            b.device_ptr(DeviceId(0)).unwrap();
        }
        let stats = p.stats().snapshot();
        assert_eq!(stats.allocations, 1);
        assert_eq!(stats.live_allocations(), 0);
        assert_eq!(stats.host_to_device, 1);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Clone, Debug)]
        enum Step {
            HostWrite(usize, u32),
            DeviceWrite(usize, u32),
            HostRead,
            DeviceRead,
        }

        fn step() -> impl Strategy<Value = Step> {
            prop_oneof![
                (0usize..8, any::<u32>()).prop_map(|(i, v)| Step::HostWrite(i, v)),
                (0usize..8, any::<u32>()).prop_map(|(i, v)| Step::DeviceWrite(i, v)),
                Just(Step::HostRead),
                Just(Step::DeviceRead),
            ]
        }

        proptest! {
            #[test]
            fn reads_see_the_latest_write(steps in proptest::collection::vec(step(), 1..24)) {
                let mut b = buffer(&[0; 8], 1);
                let mut model = vec![0u32; 8];
                for s in steps {
                    match s {
                        Step::HostWrite(i, v) => {
                            b.host_mut().unwrap()[i] = v;
                            model[i] = v;
                        }
                        Step::DeviceWrite(i, v) => {
                            let ptr = b.device_ptr_mut(DeviceId(0)).unwrap();
                            // SAFETY: eight u32 on device 0, i < 8.
                            unsafe { write_device(b.platform(), DeviceId(0), ptr.add(i), &[v]) };
                            model[i] = v;
                        }
                        Step::HostRead => prop_assert_eq!(b.host().unwrap(), model.as_slice()),
                        Step::DeviceRead => {
                            let ptr = b.device_ptr(DeviceId(0)).unwrap();
                            // SAFETY: eight u32 on device 0.
                            let on_device = unsafe { read_device(b.platform(), DeviceId(0), ptr, 8) };
                            prop_assert_eq!(on_device, model.clone());
                        }
                    }
                }
                prop_assert_eq!(b.into_vec().unwrap(), model);
            }
        }
    }
}
