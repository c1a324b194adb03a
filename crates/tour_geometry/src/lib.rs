//! Map geometry derived from a tour's ordered locations.

use serde::Serialize;
use shared::domain::Location;

pub mod route;

pub use route::{distance_matrix, plan_route, plan_tour, RouteError, RoutePlan, RouteStrategy};

/// Mean Earth radius in miles.
pub const EARTH_RADIUS_MILES: f64 = 3958.8;

/// Closed `[lat, lon]` loop through every location in tour order.
///
/// Fewer than two locations produce no line at all; otherwise the first
/// point is repeated at the end so the renderer draws the return leg.
pub fn compute_polyline(locations: &[Location]) -> Vec<[f64; 2]> {
    if locations.len() < 2 {
        return Vec::new();
    }
    let mut points: Vec<[f64; 2]> = locations.iter().map(Location::lat_lon).collect();
    points.push(points[0]);
    points
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub south_west: [f64; 2],
    pub north_east: [f64; 2],
}

impl Bounds {
    pub fn center(&self) -> [f64; 2] {
        [
            (self.south_west[0] + self.north_east[0]) / 2.0,
            (self.south_west[1] + self.north_east[1]) / 2.0,
        ]
    }

    pub fn contains(&self, point: [f64; 2]) -> bool {
        (self.south_west[0]..=self.north_east[0]).contains(&point[0])
            && (self.south_west[1]..=self.north_east[1]).contains(&point[1])
    }
}

/// Viewport box around all locations; `None` when there is nothing to fit.
pub fn compute_bounds(locations: &[Location]) -> Option<Bounds> {
    let (first, rest) = locations.split_first()?;
    let mut bounds = Bounds {
        south_west: first.lat_lon(),
        north_east: first.lat_lon(),
    };
    for [lat, lon] in rest.iter().map(Location::lat_lon) {
        bounds.south_west[0] = bounds.south_west[0].min(lat);
        bounds.south_west[1] = bounds.south_west[1].min(lon);
        bounds.north_east[0] = bounds.north_east[0].max(lat);
        bounds.north_east[1] = bounds.north_east[1].max(lon);
    }
    Some(bounds)
}

/// Great-circle distance in miles between two `[lat, lon]` points.
pub fn haversine_miles(a: [f64; 2], b: [f64; 2]) -> f64 {
    let lat1 = a[0].to_radians();
    let lat2 = b[0].to_radians();
    let delta_lat = (b[0] - a[0]).to_radians();
    let delta_lon = (b[1] - a[1]).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_MILES * h.clamp(0.0, 1.0).sqrt().asin()
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
