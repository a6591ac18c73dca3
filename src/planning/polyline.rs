//! Polyline geometry of a planned route.
//!
//! Converts between positions on the route and the fraction of total route
//! length they represent. Shared by progress tracking and bearing planning.

use std::collections::HashMap;

use crate::graph::Point;

/// Closest point on the route to a live position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    /// Projected point on the route
    pub point: Point,
    /// Index of the segment holding the projected point
    pub segment: usize,
    /// Route length from the start to the projected point
    pub distance_along: f64,
    /// Distance from the live position to the projected point
    pub offset: f64,
}

/// Route polyline with cumulative lengths.
#[derive(Clone, Debug, PartialEq)]
pub struct RouteGeometry {
    points: Vec<Point>,
    /// cumulative[i] = route length from points[0] to points[i]
    cumulative: Vec<f64>,
}

impl RouteGeometry {
    /// Build from ordered points. Returns `None` for an empty list.
    pub fn new(points: Vec<Point>) -> Option<Self> {
        if points.is_empty() {
            return None;
        }

        let mut cumulative = Vec::with_capacity(points.len());
        let mut total = 0.0;
        cumulative.push(0.0);
        for pair in points.windows(2) {
            total += pair[0].distance(&pair[1]);
            cumulative.push(total);
        }

        Some(Self { points, cumulative })
    }

    /// Build from a path of location ids.
    ///
    /// Returns `None` if the path is empty or references an unknown id.
    pub fn from_path(path: &[String], coordinates: &HashMap<String, Point>) -> Option<Self> {
        let points = path
            .iter()
            .map(|id| coordinates.get(id).copied())
            .collect::<Option<Vec<Point>>>()?;
        Self::new(points)
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Total route length.
    pub fn total_length(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    /// Number of segments (points - 1).
    pub fn segment_count(&self) -> usize {
        self.points.len().saturating_sub(1)
    }

    /// Project a position onto the closest segment.
    ///
    /// Each segment projection is clamped to the segment's endpoints. With a
    /// single point the projection is that point.
    pub fn project(&self, position: Point) -> Projection {
        let mut best = Projection {
            point: self.points[0],
            segment: 0,
            distance_along: 0.0,
            offset: self.points[0].distance(&position),
        };

        for (i, pair) in self.points.windows(2).enumerate() {
            let (a, b) = (pair[0], pair[1]);
            let ab = b - a;
            let len_sq = ab.dot(&ab);
            let t = if len_sq > 0.0 {
                ((position - a).dot(&ab) / len_sq).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let projected = a + ab * t;
            let offset = projected.distance(&position);

            if i == 0 || offset < best.offset {
                best = Projection {
                    point: projected,
                    segment: i,
                    distance_along: self.cumulative[i] + a.distance(&projected),
                    offset,
                };
            }
        }

        best
    }

    /// Percentage of total length represented by a distance along the route.
    ///
    /// Zero-length routes and non-finite distances report 0.
    pub fn percent_of(&self, distance_along: f64) -> f64 {
        let total = self.total_length();
        if total <= 0.0 || !distance_along.is_finite() {
            return 0.0;
        }
        let percent = distance_along / total * 100.0;
        if !percent.is_finite() {
            return 0.0;
        }
        percent.clamp(0.0, 100.0)
    }

    /// Point at the given percentage of total length.
    ///
    /// Walks segments until the cumulative length reaches the target;
    /// snaps to the final point if the end is reached.
    pub fn point_at_percent(&self, percent: f64) -> Point {
        let total = self.total_length();
        let target = percent.clamp(0.0, 100.0) / 100.0 * total;

        for (i, pair) in self.points.windows(2).enumerate() {
            let seg_len = self.cumulative[i + 1] - self.cumulative[i];
            if seg_len > 0.0 && self.cumulative[i + 1] >= target {
                let t = ((target - self.cumulative[i]) / seg_len).clamp(0.0, 1.0);
                return pair[0] + (pair[1] - pair[0]) * t;
            }
        }

        self.points[self.points.len() - 1]
    }
}
