//! Route planning over the location graph.
//!
//! This module provides:
//! - A* route search between two locations
//! - Nearest eligible location lookup for raw map points
//! - Route polyline geometry
//! - Progress tracking and short-horizon bearing planning

pub mod astar;
pub mod bearing;
pub mod nearest;
pub mod polyline;
pub mod progress;

pub use astar::{PlannedRoute, find_path};
pub use bearing::{BearingPlan, plan_bearing, plan_bearing_on};
pub use nearest::{is_structural, nearest_location};
pub use polyline::{Projection, RouteGeometry};
pub use progress::{PathProgress, progress_on, track_progress};
