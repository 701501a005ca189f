//! Place-addressed data access shared by every vector flavour.

use mixvec_core::{BufferId, DeviceId, Element, Place};

use crate::error::VectorError;

/// Raw data pointers addressed by [`Place`].
///
/// Pointers are valid until the next call that takes the container by
/// `&mut`. Device pointers are only meaningful to code running on that
/// device.
///
/// Accessors take `&mut self` even for reads: serving a device other than
/// the one currently holding the data may detach the container from
/// buffers it shares with other handles. Read accessors never mark the
/// other location stale.
pub trait PlaceAccess {
    /// Element type.
    type Elem: Element;

    /// Read pointer to the data at `place`, materialising it there first.
    fn data_at(&mut self, place: Place) -> Result<*const Self::Elem, VectorError>;

    /// Write pointer to the data at `place`. Every other location becomes
    /// stale.
    fn mutable_data_at(&mut self, place: Place) -> Result<*mut Self::Elem, VectorError>;

    /// Read pointer to the data on `device`.
    fn device_data(&mut self, device: DeviceId) -> Result<*const Self::Elem, VectorError>;

    /// Write pointer to the data on `device`.
    fn device_data_mut(&mut self, device: DeviceId) -> Result<*mut Self::Elem, VectorError>;

    /// Opaque identity of the underlying storage.
    fn buffer_id(&self) -> BufferId;

    /// Whether device places can be served at all.
    fn supports_accelerator(&self) -> bool;
}
