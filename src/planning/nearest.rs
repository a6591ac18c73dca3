//! Snap raw map points to the closest real destination.

use crate::graph::{Location, Point};

/// Name fragments that mark purely structural locations.
const STRUCTURAL_MARKERS: [&str; 2] = ["door", "hallway"];

/// Check if a location name marks a corridor or door waypoint.
///
/// Case-sensitive substring match, as names are authored.
#[inline]
pub fn is_structural(name: &str) -> bool {
    STRUCTURAL_MARKERS.iter().any(|m| name.contains(m))
}

/// Find the closest non-structural location to `point`.
///
/// Ties go to the location listed first.
pub fn nearest_location<'a>(point: Point, locations: &'a [Location]) -> Option<&'a Location> {
    let mut best: Option<(&Location, f64)> = None;

    for location in locations.iter().filter(|l| !is_structural(&l.name)) {
        let d = location.coordinates.distance_squared(&point);
        if best.is_none_or(|(_, best_d)| d < best_d) {
            best = Some((location, d));
        }
    }

    best.map(|(location, _)| location)
}
