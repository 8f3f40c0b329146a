//! # radar-index
//!
//! In-process spatial index and store for the toilet radar.
//!
//! [`SpatialIndex`] is an R-tree over record geometries supporting radius
//! containment, nearest-first traversal, and bounding-box intersection.
//! [`MemoryToiletStore`] combines it with an id-ordered record map to
//! implement [`radar_core::ToiletStore`] without a database.

pub mod memory_store;
pub mod spatial_index;

pub use memory_store::MemoryToiletStore;
pub use spatial_index::{IndexedToilet, SpatialIndex};
