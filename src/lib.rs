//! # MargaNav: Indoor Walking Guidance
//!
//! Routes a walker between two authored locations on a floor graph and
//! steers them with five discrete commands sent to a directional feedback
//! actuator (for example a vibration belt).
//!
//! ## Pipeline
//!
//! 1. [`planning::find_path`] finds the shortest route with A*.
//! 2. [`planning::track_progress`] projects the live position onto the route.
//! 3. [`planning::plan_bearing`] looks a few percent ahead to get the target bearing.
//! 4. [`guidance::GuidanceController`] compares target and heading on every tick
//!    and emits at most one [`guidance::GuidanceCommand`] per dwell interval.
//!
//! ## Coordinate Frame
//!
//! Bearings are degrees in [0, 360), measured counter-clockwise from the +x
//! axis of the authored coordinates. A positive heading difference means the
//! target lies to the walker's left.
//!
//! ## Modules
//!
//! - [`graph`]: Locations, edges and the graph store
//! - [`planning`]: Route search, snapping, progress and bearing
//! - [`guidance`]: Command quantization and the guidance state machine
//! - [`feed`]: Inbound feed protocol
//! - [`sink`]: Command delivery
//! - [`shared`], [`threads`]: Runtime wiring for the daemon

pub mod config;
pub mod error;
pub mod feed;
pub mod graph;
pub mod guidance;
pub mod planning;
pub mod shared;
pub mod sink;
pub mod threads;
pub mod utils;

pub use config::MargaConfig;
pub use error::{MargaError, Result};
pub use graph::{Edge, GraphStore, Location, Point};
pub use guidance::{GuidanceCommand, GuidanceController, GuidanceState, RouteStatus};
pub use planning::{find_path, nearest_location, plan_bearing, track_progress};
