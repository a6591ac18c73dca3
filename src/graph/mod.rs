//! Location graph: named nodes joined by undirected corridors.
//!
//! This module provides:
//! - The location/edge data model and its JSON shape
//! - The graph store with load/save and cascade-on-delete mutations

mod store;
mod types;

pub use store::{GraphSnapshot, GraphStore};
pub use types::{Edge, Location, Point};
