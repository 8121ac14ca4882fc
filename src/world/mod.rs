//! World module - sector and portal map data
//!
//! - Point/wall/region records and the deduplicating point store
//! - MapDocument, the owned aggregate for one map
//! - Topology inference (region depth, portal linkage)
//! - WLD load/save and DMAP export

mod document;
mod geometry;
mod point_store;
mod topology;
pub mod dmap;
pub mod wld;

pub use document::*;
pub use geometry::*;
pub use point_store::PointStore;
pub use topology::*;
