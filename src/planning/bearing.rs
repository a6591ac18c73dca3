//! Short-horizon target bearing along a route.

use std::collections::HashMap;

use super::polyline::RouteGeometry;
use crate::graph::Point;

/// Below this separation the near and forward points are treated as equal.
const MIN_LOOKAHEAD_SEPARATION: f64 = 1e-9;

/// Target heading derived from route progress.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BearingPlan {
    /// Direction from the near point to the forward point, degrees in [0, 360)
    pub bearing_degrees: f64,
    /// Route point at the current progress
    pub near_point: Point,
    /// Route point `lookahead_percent` further along
    pub forward_point: Point,
}

/// Plan the target bearing for `progress_percent` along `path`.
///
/// Returns `None` when the near and forward points coincide (end of route,
/// zero-length route, unknown ids); callers keep their last bearing.
pub fn plan_bearing(
    path: &[String],
    coordinates: &HashMap<String, Point>,
    progress_percent: f64,
    lookahead_percent: f64,
) -> Option<BearingPlan> {
    let geometry = RouteGeometry::from_path(path, coordinates)?;
    plan_bearing_on(&geometry, progress_percent, lookahead_percent)
}

/// Plan the target bearing against prebuilt route geometry.
pub fn plan_bearing_on(
    geometry: &RouteGeometry,
    progress_percent: f64,
    lookahead_percent: f64,
) -> Option<BearingPlan> {
    let near_percent = progress_percent.clamp(0.0, 100.0);
    let forward_percent = (near_percent + lookahead_percent.max(0.0)).min(100.0);

    let near_point = geometry.point_at_percent(near_percent);
    let forward_point = geometry.point_at_percent(forward_percent);

    if near_point.distance(&forward_point) < MIN_LOOKAHEAD_SEPARATION {
        return None;
    }

    Some(BearingPlan {
        bearing_degrees: near_point.bearing_to(&forward_point),
        near_point,
        forward_point,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coords(points: &[(&str, f64, f64)]) -> HashMap<String, Point> {
        points
            .iter()
            .map(|(id, x, y)| (id.to_string(), Point::new(*x, *y)))
            .collect()
    }

    fn path(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_straight_horizontal_path() {
        let coordinates = coords(&[("a", 0.0, 0.0), ("b", 10.0, 0.0)]);
        let plan = plan_bearing(&path(&["a", "b"]), &coordinates, 50.0, 10.0).unwrap();

        assert!(plan.bearing_degrees.abs() < 1e-6);
        assert!(plan.near_point.distance(&Point::new(5.0, 0.0)) < 1e-9);
        assert!(plan.forward_point.distance(&Point::new(6.0, 0.0)) < 1e-9);
    }

    #[test]
    fn test_lookahead_across_corner() {
        // Near point 1 unit before the corner, forward point 1 unit after it
        let coordinates = coords(&[("a", 0.0, 0.0), ("b", 10.0, 0.0), ("c", 10.0, 10.0)]);
        let plan = plan_bearing(&path(&["a", "b", "c"]), &coordinates, 45.0, 10.0).unwrap();

        assert!((plan.bearing_degrees - 45.0).abs() < 1e-6);
    }

    #[test]
    fn test_bearing_is_normalized() {
        // Heading toward -y gives 270°, not -90°
        let coordinates = coords(&[("a", 0.0, 10.0), ("b", 0.0, 0.0)]);
        let plan = plan_bearing(&path(&["a", "b"]), &coordinates, 0.0, 5.0).unwrap();

        assert!((plan.bearing_degrees - 270.0).abs() < 1e-6);
    }

    #[test]
    fn test_forward_clamped_to_end() {
        let coordinates = coords(&[("a", 0.0, 0.0), ("b", 10.0, 0.0)]);
        let plan = plan_bearing(&path(&["a", "b"]), &coordinates, 95.0, 10.0).unwrap();
        assert_eq!(plan.forward_point, Point::new(10.0, 0.0));

        // At the very end near and forward coincide
        assert!(plan_bearing(&path(&["a", "b"]), &coordinates, 100.0, 10.0).is_none());
    }

    #[test]
    fn test_degenerate_routes() {
        let coordinates = coords(&[("a", 1.0, 1.0), ("b", 1.0, 1.0)]);
        assert!(plan_bearing(&path(&["a"]), &coordinates, 0.0, 10.0).is_none());
        assert!(plan_bearing(&path(&["a", "b"]), &coordinates, 0.0, 10.0).is_none());
        assert!(plan_bearing(&path(&["a", "x"]), &coordinates, 0.0, 10.0).is_none());
    }
}
