//! Visiting order for a tour's stops.
//!
//! Small tours are solved exactly with Held-Karp; larger ones fall back to a
//! nearest-neighbour walk. Either way the result is a cycle rotated so that it
//! begins at the requested start stop.

use serde::Serialize;
use shared::domain::Location;
use thiserror::Error;
use tracing::debug;

use crate::haversine_miles;

/// Largest stop count solved exactly.
pub const EXACT_CUTOFF: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStrategy {
    Trivial,
    Exact,
    NearestNeighbour,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutePlan {
    /// Stop indices in visiting order, starting with the start stop.
    pub order: Vec<usize>,
    /// Total cycle length including the leg back to the start.
    pub length: f64,
    pub strategy: RouteStrategy,
}

#[derive(Debug, Error, PartialEq)]
pub enum RouteError {
    #[error("start index {start} out of range for {len} stops")]
    StartOutOfRange { start: usize, len: usize },
    #[error("distance matrix row {row} has {actual} entries, expected {expected}")]
    NotSquare {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("distance from stop {row} to stop {col} is not a finite number")]
    NonFiniteDistance { row: usize, col: usize },
}

pub fn distance_matrix(points: &[[f64; 2]]) -> Vec<Vec<f64>> {
    points
        .iter()
        .map(|a| points.iter().map(|b| haversine_miles(*a, *b)).collect())
        .collect()
}

/// Plans a round trip through `locations` beginning at `locations[start]`.
pub fn plan_tour(locations: &[Location], start: usize) -> Result<RoutePlan, RouteError> {
    let points: Vec<[f64; 2]> = locations.iter().map(Location::lat_lon).collect();
    plan_route(&distance_matrix(&points), start)
}

pub fn plan_route(distances: &[Vec<f64>], start: usize) -> Result<RoutePlan, RouteError> {
    let n = distances.len();
    for (row, entries) in distances.iter().enumerate() {
        if entries.len() != n {
            return Err(RouteError::NotSquare {
                row,
                expected: n,
                actual: entries.len(),
            });
        }
        if let Some(col) = entries.iter().position(|d| !d.is_finite()) {
            return Err(RouteError::NonFiniteDistance { row, col });
        }
    }
    if start >= n {
        return Err(RouteError::StartOutOfRange { start, len: n });
    }

    if n == 1 {
        return Ok(RoutePlan {
            order: vec![0],
            length: 0.0,
            strategy: RouteStrategy::Trivial,
        });
    }

    let plan = if n <= EXACT_CUTOFF {
        let (order, length) = held_karp(distances);
        RoutePlan {
            order: rotate_to(order, start),
            length,
            strategy: RouteStrategy::Exact,
        }
    } else {
        let (order, length) = nearest_neighbour(distances, start);
        RoutePlan {
            order,
            length,
            strategy: RouteStrategy::NearestNeighbour,
        }
    };
    debug!(stops = n, strategy = ?plan.strategy, length = plan.length, "route planned");
    Ok(plan)
}

/// Exact cycle rooted at stop 0. `cost[mask * n + v]` is the cheapest path
/// from 0 through the stops in `mask`, ending at `v`. Bit 0 is never set.
fn held_karp(d: &[Vec<f64>]) -> (Vec<usize>, f64) {
    let n = d.len();
    let full = 1usize << n;
    let mut cost = vec![f64::INFINITY; full * n];
    let mut parent = vec![0usize; full * n];

    for v in 1..n {
        cost[(1 << v) * n + v] = d[0][v];
    }

    for mask in (2..full).step_by(2) {
        for v in 1..n {
            if mask & (1 << v) == 0 {
                continue;
            }
            let base = cost[mask * n + v];
            if !base.is_finite() {
                continue;
            }
            for u in 1..n {
                if mask & (1 << u) != 0 {
                    continue;
                }
                let next = (mask | (1 << u)) * n + u;
                let candidate = base + d[v][u];
                if candidate < cost[next] {
                    cost[next] = candidate;
                    parent[next] = v;
                }
            }
        }
    }

    let all = (full - 1) & !1;
    let mut last = 1;
    let mut best = f64::INFINITY;
    for v in 1..n {
        let total = cost[all * n + v] + d[v][0];
        if total < best {
            best = total;
            last = v;
        }
    }

    let mut order = Vec::with_capacity(n);
    let mut mask = all;
    let mut v = last;
    while v != 0 {
        order.push(v);
        let prev = parent[mask * n + v];
        mask &= !(1 << v);
        v = prev;
    }
    order.push(0);
    order.reverse();
    (order, best)
}

fn nearest_neighbour(d: &[Vec<f64>], start: usize) -> (Vec<usize>, f64) {
    let n = d.len();
    let mut visited = vec![false; n];
    visited[start] = true;
    let mut order = vec![start];
    let mut length = 0.0;
    let mut current = start;

    while order.len() < n {
        let mut next = None;
        let mut best = f64::INFINITY;
        for (i, &edge) in d[current].iter().enumerate() {
            if !visited[i] && edge < best {
                best = edge;
                next = Some(i);
            }
        }
        let Some(next) = next else {
            break;
        };
        visited[next] = true;
        order.push(next);
        length += best;
        current = next;
    }

    length += d[current][start];
    (order, length)
}

fn rotate_to(mut order: Vec<usize>, start: usize) -> Vec<usize> {
    if let Some(pos) = order.iter().position(|&i| i == start) {
        order.rotate_left(pos);
    }
    order
}
