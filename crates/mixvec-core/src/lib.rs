//! Core types for the mixvec workspace.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! vocabulary shared by the device layer and the containers: memory
//! places, device identifiers, the element bound, and buffer identity.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod element;
pub mod id;
pub mod place;

pub use element::Element;
pub use id::{BufferId, DeviceId};
pub use place::Place;
