//! Reference-counted copy-on-write pointer.
//!
//! [`CowPtr`] shares one value between any number of handles. Cloning a
//! `CowPtr` only bumps the reference count; [`CowPtr::make_mut`] forks the
//! value into private storage the first time a shared handle asks to
//! mutate it.

use std::sync::Arc;

use log::debug;

/// Values that can produce an independent deep copy of themselves.
///
/// Unlike `Clone`, forking may fail, for example when the copy needs data
/// that has to be transferred back from another memory first.
pub trait Fork: Sized {
    /// Error reported when the copy cannot be made.
    type Error;

    /// Produce a deep copy that shares no storage with `self`.
    fn fork(&self) -> Result<Self, Self::Error>;
}

/// Shared pointer that forks its target on first mutation.
#[derive(Debug)]
pub struct CowPtr<B> {
    inner: Arc<B>,
}

impl<B> CowPtr<B> {
    /// Take ownership of `value`.
    pub fn new(value: B) -> Self {
        Self {
            inner: Arc::new(value),
        }
    }

    /// Shared access. Never forks.
    pub fn get(&self) -> &B {
        &self.inner
    }

    /// Whether this is the only handle to the value.
    pub fn is_unique(&self) -> bool {
        Arc::strong_count(&self.inner) == 1
    }

    /// Number of handles sharing the value.
    pub fn share_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Whether both handles point at the same value.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Address of the shared value.
    pub fn as_ptr(&self) -> *const B {
        Arc::as_ptr(&self.inner)
    }

    /// Take the value out if this is the only handle, otherwise give the
    /// handle back.
    pub fn into_inner(self) -> Result<B, Self> {
        Arc::try_unwrap(self.inner).map_err(|inner| Self { inner })
    }
}

impl<B: Fork> CowPtr<B> {
    /// Exclusive access, forking first if the value is shared.
    pub fn make_mut(&mut self) -> Result<&mut B, B::Error> {
        if Arc::get_mut(&mut self.inner).is_none() {
            let forked = self.inner.fork()?;
            debug!(
                "forked shared value ({} handles)",
                Arc::strong_count(&self.inner)
            );
            self.inner = Arc::new(forked);
        }
        Ok(Arc::get_mut(&mut self.inner).expect("freshly forked value has one handle"))
    }
}

impl<B> Clone for CowPtr<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
