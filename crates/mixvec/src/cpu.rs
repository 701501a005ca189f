//! Host-only fallback container.
//!
//! [`CpuVector`] is a thin wrapper over `Vec<T>` with the same surface as
//! the accelerated vector. Device places are rejected: `data_at` accepts
//! only [`Place::Host`], and the device accessors report
//! [`VectorError::Unsupported`].

use std::fmt;
use std::ops::{Index, IndexMut};
use std::slice::{self, SliceIndex};

use mixvec_core::{BufferId, DeviceId, Element, Place};

use crate::access::PlaceAccess;
use crate::error::VectorError;

/// A plain growable array. Cloning copies the elements.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CpuVector<T: Element> {
    data: Vec<T>,
}

impl<T: Element> CpuVector<T> {
    /// An empty vector.
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// An empty vector with room for `capacity` elements.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    /// `count` copies of `value`.
    pub fn from_elem(count: usize, value: T) -> Self {
        Self {
            data: vec![value; count],
        }
    }

    /// Element-wise conversion of a host slice.
    pub fn from_host<U>(values: &[U]) -> Self
    where
        U: Copy + Into<T>,
    {
        values.iter().map(|&v| v.into()).collect()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether there are no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Capacity in elements.
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// The elements.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// The elements, mutably.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Element at `index`.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.data.get(index)
    }

    /// Mutable element at `index`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.data.get_mut(index)
    }

    /// First element.
    pub fn first(&self) -> Option<&T> {
        self.data.first()
    }

    /// Last element.
    pub fn last(&self) -> Option<&T> {
        self.data.last()
    }

    /// Mutable first element.
    pub fn first_mut(&mut self) -> Option<&mut T> {
        self.data.first_mut()
    }

    /// Mutable last element.
    pub fn last_mut(&mut self) -> Option<&mut T> {
        self.data.last_mut()
    }

    /// Iterate over the elements.
    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.data.iter()
    }

    /// Iterate mutably over the elements.
    pub fn iter_mut(&mut self) -> slice::IterMut<'_, T> {
        self.data.iter_mut()
    }

    /// Append `value`.
    pub fn push(&mut self, value: T) {
        self.data.push(value);
    }

    /// Remove and return the last element.
    pub fn pop(&mut self) -> Option<T> {
        self.data.pop()
    }

    /// Resize to `len`, filling new slots with `T::default()`.
    pub fn resize(&mut self, len: usize)
    where
        T: Default,
    {
        self.data.resize(len, T::default());
    }

    /// Resize to `len`, filling new slots with `value`.
    pub fn resize_with_value(&mut self, len: usize, value: T) {
        self.data.resize(len, value);
    }

    /// Shorten to `len` elements.
    pub fn truncate(&mut self, len: usize) {
        self.data.truncate(len);
    }

    /// Remove every element, keeping the allocation.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Replace the contents with `values`.
    pub fn assign<I>(&mut self, values: I)
    where
        I: IntoIterator<Item = T>,
    {
        self.data.clear();
        self.data.extend(values);
    }

    /// Append a slice.
    pub fn extend_from_slice(&mut self, values: &[T]) {
        self.data.extend_from_slice(values);
    }

    /// Reserve room for `additional` more elements.
    pub fn reserve(&mut self, additional: usize) {
        self.data.reserve(additional);
    }

    /// Copy the elements into a plain vector.
    pub fn to_vec(&self) -> Vec<T> {
        self.data.clone()
    }

    /// Unwrap into the inner vector.
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Identity of the element storage.
    pub fn buffer_id(&self) -> BufferId {
        BufferId::from_addr(self.data.as_ptr())
    }
}

fn unsupported(operation: &'static str) -> VectorError {
    VectorError::Unsupported { operation }
}

fn host_only(place: Place) -> VectorError {
    VectorError::InvalidPlace {
        place,
        reason: "only the host place is available without accelerator support",
    }
}

impl<T: Element> PlaceAccess for CpuVector<T> {
    type Elem = T;

    fn data_at(&mut self, place: Place) -> Result<*const T, VectorError> {
        match place {
            Place::Host => Ok(self.data.as_ptr()),
            Place::Device(_) => Err(host_only(place)),
        }
    }

    fn mutable_data_at(&mut self, place: Place) -> Result<*mut T, VectorError> {
        match place {
            Place::Host => Ok(self.data.as_mut_ptr()),
            Place::Device(_) => Err(host_only(place)),
        }
    }

    fn device_data(&mut self, _device: DeviceId) -> Result<*const T, VectorError> {
        Err(unsupported("device_data"))
    }

    fn device_data_mut(&mut self, _device: DeviceId) -> Result<*mut T, VectorError> {
        Err(unsupported("device_data_mut"))
    }

    fn buffer_id(&self) -> BufferId {
        CpuVector::buffer_id(self)
    }

    fn supports_accelerator(&self) -> bool {
        false
    }
}

impl<T: Element> Default for CpuVector<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element, I: SliceIndex<[T]>> Index<I> for CpuVector<T> {
    type Output = I::Output;

    fn index(&self, index: I) -> &I::Output {
        &self.data[index]
    }
}

impl<T: Element, I: SliceIndex<[T]>> IndexMut<I> for CpuVector<T> {
    fn index_mut(&mut self, index: I) -> &mut I::Output {
        &mut self.data[index]
    }
}

impl<'a, T: Element> IntoIterator for &'a CpuVector<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

impl<'a, T: Element> IntoIterator for &'a mut CpuVector<T> {
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter_mut()
    }
}

impl<T: Element> IntoIterator for CpuVector<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.into_iter()
    }
}

impl<T: Element> Extend<T> for CpuVector<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.data.reserve(iter.size_hint().0);
        self.data.extend(iter);
    }
}

impl<'a, T: Element> Extend<&'a T> for CpuVector<T> {
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied());
    }
}

impl<T: Element> FromIterator<T> for CpuVector<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            data: iter.into_iter().collect(),
        }
    }
}

impl<T: Element> From<Vec<T>> for CpuVector<T> {
    fn from(data: Vec<T>) -> Self {
        Self { data }
    }
}

impl<T: Element> From<&[T]> for CpuVector<T> {
    fn from(values: &[T]) -> Self {
        Self {
            data: values.to_vec(),
        }
    }
}

impl<T: Element, const N: usize> From<[T; N]> for CpuVector<T> {
    fn from(values: [T; N]) -> Self {
        Self {
            data: Vec::from(values),
        }
    }
}

impl<T: Element> From<CpuVector<T>> for Vec<T> {
    fn from(v: CpuVector<T>) -> Self {
        v.data
    }
}

impl<T: Element + PartialEq> PartialEq<[T]> for CpuVector<T> {
    fn eq(&self, other: &[T]) -> bool {
        self.data.as_slice() == other
    }
}

impl<T: Element + PartialEq> PartialEq<Vec<T>> for CpuVector<T> {
    fn eq(&self, other: &Vec<T>) -> bool {
        &self.data == other
    }
}

impl<T: Element + fmt::Debug> fmt::Debug for CpuVector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.data).finish()
    }
}

impl<T: Element + fmt::Display> fmt::Display for CpuVector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.data.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn behaves_like_a_vec() {
        let mut v = CpuVector::from([1, 2, 3]);
        v.push(4);
        v[0] = 10;
        assert_eq!(v, vec![10, 2, 3, 4]);
        assert_eq!(v.pop(), Some(4));
        v.resize(5);
        assert_eq!(v, [10, 2, 3, 0, 0][..]);
        v.truncate(2);
        v.extend([7, 8].iter());
        assert_eq!(v.to_vec(), vec![10, 2, 7, 8]);
        assert_eq!(v.first(), Some(&10));
        assert_eq!(v.last(), Some(&8));
    }

    #[test]
    fn clone_is_deep() {
        let a = CpuVector::from_elem(3, 1u8);
        let mut b = a.clone();
        b[1] = 9;
        assert_eq!(a, vec![1, 1, 1]);
        assert_ne!(a.buffer_id(), b.buffer_id());
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut v: CpuVector<u32> = (0..100).collect();
        let cap = v.capacity();
        v.clear();
        assert!(v.is_empty());
        assert_eq!(v.capacity(), cap);
    }

    #[test]
    #[should_panic]
    fn index_is_bounds_checked() {
        let v = CpuVector::from([1u32]);
        let _out_of_bounds = v[1];
    }

    #[test]
    fn display_separates_with_spaces() {
        let v = CpuVector::from([1.5f32, 2.0]);
        assert_eq!(v.to_string(), "1.5 2");
        assert_eq!(CpuVector::<u8>::new().to_string(), "");
    }

    #[test]
    fn host_place_is_served() {
        let mut v = CpuVector::from([4u16, 5]);
        let ptr = v.data_at(Place::Host).unwrap();
        assert_eq!(ptr, v.as_slice().as_ptr());
        assert!(v.mutable_data_at(Place::Host).is_ok());
        assert!(!v.supports_accelerator());
    }

    #[test]
    fn device_places_are_rejected() {
        let mut v = CpuVector::from([4u16, 5]);
        assert!(matches!(
            v.data_at(Place::device(0)),
            Err(VectorError::InvalidPlace { .. })
        ));
        assert!(matches!(
            v.device_data(DeviceId(0)),
            Err(VectorError::Unsupported {
                operation: "device_data"
            })
        ));
        assert!(matches!(
            v.device_data_mut(DeviceId(0)),
            Err(VectorError::Unsupported { .. })
        ));
    }

    #[test]
    fn from_host_converts_elements() {
        let v: CpuVector<f64> = CpuVector::from_host(&[1u8, 2]);
        assert_eq!(v, vec![1.0, 2.0]);
    }
}
