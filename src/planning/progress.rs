//! Path progress tracking.
//!
//! Expresses a live position as the percentage of route length already
//! traversed, using nearest-point projection onto the route polyline.

use std::collections::HashMap;

use super::polyline::RouteGeometry;
use crate::graph::Point;

/// Progress along a route.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathProgress {
    /// Percentage of route length traversed, in [0, 100]
    pub percent: f64,
    /// Closest point on the route, if the route has any known location
    pub projected: Option<Point>,
}

impl PathProgress {
    /// Progress for degenerate routes.
    pub fn zero(projected: Option<Point>) -> Self {
        Self {
            percent: 0.0,
            projected,
        }
    }
}

/// Compute progress of `live_position` along `path`.
///
/// Paths with fewer than two nodes, unknown ids or zero total length
/// report 0%.
pub fn track_progress(
    path: &[String],
    coordinates: &HashMap<String, Point>,
    live_position: Point,
) -> PathProgress {
    match RouteGeometry::from_path(path, coordinates) {
        Some(geometry) => progress_on(&geometry, live_position),
        None => PathProgress::zero(None),
    }
}

/// Compute progress against prebuilt route geometry.
///
/// A non-finite position reports 0% with no projected point.
pub fn progress_on(geometry: &RouteGeometry, live_position: Point) -> PathProgress {
    if !live_position.is_finite() {
        return PathProgress::zero(None);
    }

    let projection = geometry.project(live_position);
    if geometry.segment_count() == 0 {
        return PathProgress::zero(Some(projection.point));
    }

    PathProgress {
        percent: geometry.percent_of(projection.distance_along),
        projected: Some(projection.point),
    }
}
