//! [`MixedVector`]: a copy-on-write vector whose data can live on the host
//! or on an accelerator device.

use std::fmt;
use std::ops::{Index, IndexMut};
use std::slice::{self, SliceIndex};
use std::sync::Arc;

use log::{debug, warn};
use mixvec_core::{BufferId, DeviceId, Element, Place};
use mixvec_device::Platform;

use crate::access::PlaceAccess;
use crate::buffer::DualBuffer;
use crate::cow::CowPtr;
use crate::error::VectorError;
use crate::state::Freshness;

fn fatal(e: VectorError) -> ! {
    panic!("{e}")
}

/// A contiguous vector that is kept consistent between host memory and
/// one accelerator device at a time.
///
/// Cloning is O(1): clones share one [`DualBuffer`] until one of them
/// mutates, at which point that clone forks a private copy. Read-only
/// host access never forks.
///
/// Host accessors that cannot report errors (`Index`, [`as_slice`],
/// [`iter`], ...) panic with the [`VectorError`] diagnostic if a
/// device-to-host transfer fails. The `try_*` variants return it instead.
///
/// ```
/// use mixvec::{mixvec, DeviceId};
///
/// let a = mixvec![0u32, 0, 0];
/// let mut b = a.clone();
/// assert!(a.shares_buffer_with(&b));
///
/// b.push(5);
/// assert_eq!(a, [0, 0, 0][..]);
/// assert_eq!(b, [0, 0, 0, 5][..]);
/// assert!(!a.shares_buffer_with(&b));
///
/// let ptr = b.device_data(DeviceId(0)).unwrap();
/// assert!(!ptr.is_null());
/// ```
///
/// [`as_slice`]: MixedVector::as_slice
/// [`iter`]: MixedVector::iter
pub struct MixedVector<T: Element> {
    buf: CowPtr<DualBuffer<T>>,
}

impl<T: Element> MixedVector<T> {
    /// An empty vector on the process-wide [`Platform::global`].
    pub fn new() -> Self {
        Self::new_in(Arc::clone(Platform::global()))
    }

    /// An empty vector on `platform`.
    pub fn new_in(platform: Arc<Platform>) -> Self {
        Self::from_vec_in(Vec::new(), platform)
    }

    /// Wrap a host vector, using `platform` for accelerator copies.
    pub fn from_vec_in(values: Vec<T>, platform: Arc<Platform>) -> Self {
        Self {
            buf: CowPtr::new(DualBuffer::from_vec(values, platform)),
        }
    }

    /// An empty vector with room for `capacity` elements on the host.
    pub fn with_capacity(capacity: usize) -> Self {
        Vec::with_capacity(capacity).into()
    }

    /// `count` copies of `value`.
    pub fn from_elem(count: usize, value: T) -> Self {
        vec![value; count].into()
    }

    /// Element-wise conversion of a host slice.
    pub fn from_host<U>(values: &[U]) -> Self
    where
        U: Copy + Into<T>,
    {
        values.iter().map(|&v| v.into()).collect()
    }

    fn buffer(&self) -> &DualBuffer<T> {
        self.buf.get()
    }

    fn try_buffer_mut(&mut self) -> Result<&mut DualBuffer<T>, VectorError> {
        self.buf.make_mut()
    }

    fn buffer_mut(&mut self) -> &mut DualBuffer<T> {
        self.try_buffer_mut().unwrap_or_else(|e| fatal(e))
    }

    fn host_vec_mut(&mut self) -> &mut Vec<T> {
        self.try_buffer_mut()
            .and_then(DualBuffer::host_vec_mut)
            .unwrap_or_else(|e| fatal(e))
    }

    /// Private host vector for replacing the contents outright.
    ///
    /// A shared buffer is not forked: its contents are about to be
    /// discarded, so a fresh buffer with the same capacity is swapped in.
    fn host_vec_for_overwrite(&mut self) -> &mut Vec<T> {
        if !self.buf.is_unique() {
            let fresh = Vec::with_capacity(self.capacity());
            let platform = Arc::clone(self.platform());
            debug!("detaching {} for overwrite", self.buffer_id());
            self.buf = CowPtr::new(DualBuffer::from_vec(fresh, platform));
        }
        self.buffer_mut().host_vec_for_overwrite()
    }

    // ---------------------------------------------------------------
    // Read-only access
    // ---------------------------------------------------------------

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.buffer().len()
    }

    /// Whether there are no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Host capacity in elements.
    pub fn capacity(&self) -> usize {
        self.buffer().capacity()
    }

    /// Host-visible contents, downloading first if a device holds newer data.
    pub fn try_as_slice(&self) -> Result<&[T], VectorError> {
        self.buffer().host()
    }

    /// Host-visible contents.
    ///
    /// # Panics
    ///
    /// Panics if a pending device-to-host transfer fails.
    pub fn as_slice(&self) -> &[T] {
        self.try_as_slice().unwrap_or_else(|e| fatal(e))
    }

    /// Element at `index`, or `None` if out of bounds.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.as_slice().get(index)
    }

    /// First element.
    pub fn first(&self) -> Option<&T> {
        self.as_slice().first()
    }

    /// Last element.
    pub fn last(&self) -> Option<&T> {
        self.as_slice().last()
    }

    /// Iterate over the host-visible elements.
    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    /// Copy the host-visible elements into a plain vector.
    pub fn to_vec(&self) -> Vec<T> {
        self.as_slice().to_vec()
    }

    /// Opaque identity of the shared buffer. Two vectors with equal ids
    /// share storage.
    pub fn buffer_id(&self) -> BufferId {
        BufferId::from_addr(self.buf.as_ptr())
    }

    /// Whether `self` and `other` currently share storage.
    pub fn shares_buffer_with(&self, other: &Self) -> bool {
        self.buf.ptr_eq(&other.buf)
    }

    /// Number of vectors sharing this vector's buffer, including itself.
    pub fn share_count(&self) -> usize {
        self.buf.share_count()
    }

    /// Which location holds the latest data.
    pub fn freshness(&self) -> Freshness {
        self.buffer().freshness()
    }

    /// The device the accelerator copy is allocated on, if any.
    pub fn resident_device(&self) -> Option<DeviceId> {
        self.buffer().resident_device()
    }

    /// The platform accelerator copies are allocated on.
    pub fn platform(&self) -> &Arc<Platform> {
        self.buffer().platform()
    }

    // ---------------------------------------------------------------
    // Device access
    // ---------------------------------------------------------------

    fn check_device(&self, device: DeviceId) -> Result<(), VectorError> {
        if self.platform().has_device(device) {
            Ok(())
        } else {
            Err(VectorError::InvalidPlace {
                place: Place::Device(device),
                reason: "device not present on this platform",
            })
        }
    }

    /// Give this vector a private buffer that is fresh on `device`.
    fn detach_to(&mut self, device: DeviceId) -> Result<(), VectorError> {
        if self.buf.is_unique() {
            debug!("retargeting {} to {device}", self.buffer_id());
        } else {
            warn!(
                "{} is shared and resident on another device; detaching for {device}",
                self.buffer_id()
            );
        }
        self.try_buffer_mut()?.materialize(Place::Device(device))
    }

    /// Read pointer to the data on `device`, uploading it first if needed.
    ///
    /// Blocks until the transfer completes. If the fresh accelerator copy
    /// lives on another device, this vector detaches (forking if shared)
    /// and the data is moved to `device`.
    pub fn device_data(&mut self, device: DeviceId) -> Result<*const T, VectorError> {
        self.check_device(device)?;
        if let Some(resident) = self.buffer().fresh_device() {
            if resident != device {
                self.detach_to(device)?;
            }
        }
        match self.buffer().device_ptr(device) {
            Err(VectorError::ProtocolViolation { resident, .. }) => {
                // Another handle moved the shared buffer to `resident`
                // between the check and the request.
                debug!("lost affinity race to {resident}");
                self.detach_to(device)?;
                self.buffer().device_ptr(device)
            }
            other => other,
        }
    }

    /// Write pointer to the data on `device`. The host copy becomes stale.
    pub fn device_data_mut(&mut self, device: DeviceId) -> Result<*mut T, VectorError> {
        self.check_device(device)?;
        self.try_buffer_mut()?.device_ptr_mut(device)
    }

    /// Read pointer to the data at `place`.
    pub fn data_at(&mut self, place: Place) -> Result<*const T, VectorError> {
        match place {
            Place::Host => Ok(self.try_as_slice()?.as_ptr()),
            Place::Device(device) => self.device_data(device),
        }
    }

    /// Write pointer to the data at `place`.
    pub fn mutable_data_at(&mut self, place: Place) -> Result<*mut T, VectorError> {
        match place {
            Place::Host => Ok(self.try_as_mut_slice()?.as_mut_ptr()),
            Place::Device(device) => self.device_data_mut(device),
        }
    }

    /// Make `place` hold the latest data without handing out a pointer.
    pub fn materialize(&mut self, place: Place) -> Result<(), VectorError> {
        match place {
            Place::Host => self.try_as_slice().map(|_| ()),
            Place::Device(device) => self.device_data(device).map(|_| ()),
        }
    }

    // ---------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------

    /// Writable host data. Forks if shared.
    pub fn try_as_mut_slice(&mut self) -> Result<&mut [T], VectorError> {
        self.try_buffer_mut()?.host_mut()
    }

    /// Writable host data. Forks if shared.
    ///
    /// # Panics
    ///
    /// Panics if forking or a device-to-host transfer fails.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.try_as_mut_slice().unwrap_or_else(|e| fatal(e))
    }

    /// Mutable element at `index`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.as_mut_slice().get_mut(index)
    }

    /// Mutable first element.
    pub fn first_mut(&mut self) -> Option<&mut T> {
        self.as_mut_slice().first_mut()
    }

    /// Mutable last element.
    pub fn last_mut(&mut self) -> Option<&mut T> {
        self.as_mut_slice().last_mut()
    }

    /// Iterate mutably over the elements.
    pub fn iter_mut(&mut self) -> slice::IterMut<'_, T> {
        self.as_mut_slice().iter_mut()
    }

    /// Append `value`, reporting fork or transfer failures.
    pub fn try_push(&mut self, value: T) -> Result<(), VectorError> {
        self.try_buffer_mut()?.push(value)
    }

    /// Append `value`.
    pub fn push(&mut self, value: T) {
        self.try_push(value).unwrap_or_else(|e| fatal(e));
    }

    /// Remove and return the last element.
    pub fn pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        self.host_vec_mut().pop()
    }

    /// Resize to `len`, filling new slots with `T::default()`.
    pub fn resize(&mut self, len: usize)
    where
        T: Default,
    {
        self.resize_with_value(len, T::default());
    }

    /// Resize to `len`, filling new slots with `value`.
    ///
    /// Resizing to the current length does nothing.
    pub fn resize_with_value(&mut self, len: usize, value: T) {
        self.try_resize_with_value(len, value)
            .unwrap_or_else(|e| fatal(e));
    }

    /// Fallible [`resize_with_value`](Self::resize_with_value).
    pub fn try_resize_with_value(&mut self, len: usize, value: T) -> Result<(), VectorError> {
        if len == self.len() {
            return Ok(());
        }
        self.try_buffer_mut()?.resize(len, value)
    }

    /// Shorten to `len` elements. No effect if already that short.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.len() {
            return;
        }
        self.buffer_mut()
            .truncate(len)
            .unwrap_or_else(|e| fatal(e));
    }

    /// Remove every element. Host capacity is kept.
    pub fn clear(&mut self) {
        self.host_vec_for_overwrite().clear();
    }

    /// Replace the contents with `values`.
    pub fn assign<I>(&mut self, values: I)
    where
        I: IntoIterator<Item = T>,
    {
        let host = self.host_vec_for_overwrite();
        host.clear();
        host.extend(values);
    }

    /// Append a slice, reporting fork or transfer failures.
    pub fn try_extend_from_slice(&mut self, values: &[T]) -> Result<(), VectorError> {
        if values.is_empty() {
            return Ok(());
        }
        self.try_buffer_mut()?.extend_from_slice(values)
    }

    /// Append a slice.
    pub fn extend_from_slice(&mut self, values: &[T]) {
        self.try_extend_from_slice(values)
            .unwrap_or_else(|e| fatal(e));
    }

    /// Reserve room for `additional` more elements.
    ///
    /// Forks a shared buffer only when its capacity actually has to grow.
    pub fn reserve(&mut self, additional: usize) {
        if self.capacity() - self.len() >= additional {
            return;
        }
        self.buffer_mut()
            .reserve(additional)
            .unwrap_or_else(|e| fatal(e));
    }
}

impl<T: Element> PlaceAccess for MixedVector<T> {
    type Elem = T;

    fn data_at(&mut self, place: Place) -> Result<*const T, VectorError> {
        MixedVector::data_at(self, place)
    }

    fn mutable_data_at(&mut self, place: Place) -> Result<*mut T, VectorError> {
        MixedVector::mutable_data_at(self, place)
    }

    fn device_data(&mut self, device: DeviceId) -> Result<*const T, VectorError> {
        MixedVector::device_data(self, device)
    }

    fn device_data_mut(&mut self, device: DeviceId) -> Result<*mut T, VectorError> {
        MixedVector::device_data_mut(self, device)
    }

    fn buffer_id(&self) -> BufferId {
        MixedVector::buffer_id(self)
    }

    fn supports_accelerator(&self) -> bool {
        true
    }
}

impl<T: Element> Default for MixedVector<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element> Clone for MixedVector<T> {
    /// Shares the buffer. O(1).
    fn clone(&self) -> Self {
        Self {
            buf: self.buf.clone(),
        }
    }
}

impl<T: Element, I: SliceIndex<[T]>> Index<I> for MixedVector<T> {
    type Output = I::Output;

    fn index(&self, index: I) -> &I::Output {
        &self.as_slice()[index]
    }
}

impl<T: Element, I: SliceIndex<[T]>> IndexMut<I> for MixedVector<T> {
    fn index_mut(&mut self, index: I) -> &mut I::Output {
        &mut self.as_mut_slice()[index]
    }
}

impl<'a, T: Element> IntoIterator for &'a MixedVector<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T: Element> IntoIterator for &'a mut MixedVector<T> {
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<T: Element> Extend<T> for MixedVector<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let mut iter = iter.into_iter().peekable();
        if iter.peek().is_none() {
            return;
        }
        self.host_vec_mut().extend(iter);
    }
}

impl<'a, T: Element> Extend<&'a T> for MixedVector<T> {
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied());
    }
}

impl<T: Element> FromIterator<T> for MixedVector<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        iter.into_iter().collect::<Vec<T>>().into()
    }
}

impl<T: Element> From<Vec<T>> for MixedVector<T> {
    fn from(values: Vec<T>) -> Self {
        Self::from_vec_in(values, Arc::clone(Platform::global()))
    }
}

impl<T: Element> From<&[T]> for MixedVector<T> {
    fn from(values: &[T]) -> Self {
        values.to_vec().into()
    }
}

impl<T: Element, const N: usize> From<[T; N]> for MixedVector<T> {
    fn from(values: [T; N]) -> Self {
        Vec::from(values).into()
    }
}

impl<T: Element> From<MixedVector<T>> for Vec<T> {
    /// Takes the host vector without copying when the buffer is not shared.
    fn from(v: MixedVector<T>) -> Self {
        match v.buf.into_inner() {
            Ok(buffer) => buffer.into_vec(),
            Err(shared) => shared.get().host().map(<[T]>::to_vec),
        }
        .unwrap_or_else(|e| fatal(e))
    }
}

impl<T: Element + PartialEq> PartialEq for MixedVector<T> {
    fn eq(&self, other: &Self) -> bool {
        self.buffer()
            .content_eq(other.buffer())
            .unwrap_or_else(|e| fatal(e))
    }
}

impl<T: Element + Eq> Eq for MixedVector<T> {}

impl<T: Element + PartialEq> PartialEq<[T]> for MixedVector<T> {
    fn eq(&self, other: &[T]) -> bool {
        self.as_slice() == other
    }
}

impl<T: Element + PartialEq> PartialEq<Vec<T>> for MixedVector<T> {
    fn eq(&self, other: &Vec<T>) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Element + fmt::Debug> fmt::Debug for MixedVector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.try_as_slice() {
            Ok(values) => f.debug_list().entries(values).finish(),
            Err(e) => write!(f, "<{e}>"),
        }
    }
}

impl<T: Element + fmt::Display> fmt::Display for MixedVector<T> {
    /// Elements separated by single spaces.
    ///
    /// Panics with the transfer error if the host copy cannot be refreshed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values = self.try_as_slice().unwrap_or_else(|e| fatal(e));
        for (i, v) in values.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}
