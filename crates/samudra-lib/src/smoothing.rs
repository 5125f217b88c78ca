//! Route simplification and smoothing.
//!
//! Raw engine output is grid-aligned and jittery. The filter runs in two
//! steps, always in this order:
//!
//! 1. Ramer–Douglas–Peucker simplification drops waypoints that lie within
//!    `epsilon` degrees of the chord between retained neighbours.
//! 2. A centred moving average over `window_size` waypoints smooths the
//!    interior of the simplified route.
//!
//! The first and last waypoints pass through both steps untouched, so the
//! output still starts and ends exactly where the engine's route did.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::geo::{Route, RouteObjective, Waypoint};

/// Default simplification tolerance in degrees.
pub const DEFAULT_EPSILON: f64 = 0.001;

/// Default moving-average window.
pub const DEFAULT_WINDOW_SIZE: usize = 3;

/// Parameters for a single smoothing invocation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothingParams {
    /// Perpendicular distance tolerance for simplification (degrees, >= 0).
    pub epsilon: f64,
    /// Moving-average window; must be odd and at least 1.
    pub window_size: usize,
}

impl Default for SmoothingParams {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }
}

impl SmoothingParams {
    /// Build validated parameters.
    pub fn new(epsilon: f64, window_size: usize) -> Result<Self> {
        let params = Self {
            epsilon,
            window_size,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.epsilon.is_finite() || self.epsilon < 0.0 {
            return Err(Error::SmoothingConfig {
                message: format!(
                    "epsilon must be a finite number >= 0, got {}",
                    self.epsilon
                ),
            });
        }
        if self.window_size == 0 || self.window_size % 2 == 0 {
            return Err(Error::SmoothingConfig {
                message: format!(
                    "window_size must be an odd number >= 1, got {}",
                    self.window_size
                ),
            });
        }
        Ok(())
    }
}

/// Simplify and smooth `route`, keeping its objective.
pub fn smooth_route(route: &Route, params: &SmoothingParams) -> Result<Route> {
    params.validate()?;

    let simplified = simplify(route.waypoints(), params.epsilon);
    let smoothed = moving_average(&simplified, params.window_size);

    debug!(
        objective = %route.objective(),
        input = route.len(),
        simplified = simplified.len(),
        "smoothed route"
    );

    Route::new(route.objective(), smoothed)
}

/// Read a raw route file, smooth it, and write the result to `output`.
pub fn smooth_route_file(
    input: &Path,
    output: &Path,
    objective: RouteObjective,
    params: &SmoothingParams,
) -> Result<Route> {
    let raw = Route::from_csv_path(objective, input)?;
    let smoothed = smooth_route(&raw, params)?;
    smoothed.write_csv_path(output)?;
    Ok(smoothed)
}

/// Ramer–Douglas–Peucker simplification.
///
/// Returns a subsequence of `points` that always includes the first and last
/// point. An `epsilon` of zero returns the input unchanged.
pub fn simplify(points: &[Waypoint], epsilon: f64) -> Vec<Waypoint> {
    if points.len() < 3 || epsilon == 0.0 {
        return points.to_vec();
    }

    let last = points.len() - 1;
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[last] = true;

    // Explicit stack instead of recursion; long ocean routes can have many
    // thousands of grid cells.
    let mut segments = vec![(0usize, last)];
    while let Some((start, end)) = segments.pop() {
        if end <= start + 1 {
            continue;
        }

        let mut farthest = start;
        let mut max_distance = 0.0;
        for index in (start + 1)..end {
            let distance = perpendicular_distance(&points[index], &points[start], &points[end]);
            if distance > max_distance {
                farthest = index;
                max_distance = distance;
            }
        }

        if max_distance > epsilon {
            keep[farthest] = true;
            segments.push((start, farthest));
            segments.push((farthest, end));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(point, kept)| kept.then_some(*point))
        .collect()
}

/// Centred moving average with the window clamped at the route boundary.
///
/// Endpoints are copied through unchanged.
pub fn moving_average(points: &[Waypoint], window_size: usize) -> Vec<Waypoint> {
    let half = window_size / 2;
    if points.len() < 3 || half == 0 {
        return points.to_vec();
    }

    let last = points.len() - 1;
    let mut smoothed = Vec::with_capacity(points.len());
    smoothed.push(points[0]);
    for index in 1..last {
        let window = &points[index.saturating_sub(half)..=(index + half).min(last)];
        let count = window.len() as f64;
        let (lat_sum, lon_sum) = window
            .iter()
            .fold((0.0, 0.0), |(lat, lon), point| (lat + point.lat, lon + point.lon));
        smoothed.push(Waypoint::new(lat_sum / count, lon_sum / count));
    }
    smoothed.push(points[last]);
    smoothed
}

/// Planar distance from `point` to the line through `a` and `b`, in degrees.
fn perpendicular_distance(point: &Waypoint, a: &Waypoint, b: &Waypoint) -> f64 {
    let dx = b.lon - a.lon;
    let dy = b.lat - a.lat;
    let chord = dx.hypot(dy);
    if chord == 0.0 {
        return (point.lon - a.lon).hypot(point.lat - a.lat);
    }
    (dy * (point.lon - a.lon) - dx * (point.lat - a.lat)).abs() / chord
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(coords: &[(f64, f64)]) -> Vec<Waypoint> {
        coords
            .iter()
            .map(|&(lat, lon)| Waypoint::new(lat, lon))
            .collect()
    }

    #[test]
    fn params_reject_even_window() {
        let err = SmoothingParams::new(0.001, 4).unwrap_err();
        assert!(matches!(err, Error::SmoothingConfig { .. }));
        assert!(err.to_string().contains("window_size"));
    }

    #[test]
    fn params_reject_zero_window_and_negative_epsilon() {
        assert!(SmoothingParams::new(0.001, 0).is_err());
        assert!(SmoothingParams::new(-0.5, 3).is_err());
        assert!(SmoothingParams::new(f64::NAN, 3).is_err());
    }

    #[test]
    fn defaults_match_pipeline_constants() {
        let params = SmoothingParams::default();
        assert_eq!(params.epsilon, 0.001);
        assert_eq!(params.window_size, 3);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn simplify_drops_collinear_points() {
        let input = points(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (3.0, 3.0)]);
        let output = simplify(&input, 0.001);
        assert_eq!(output, points(&[(0.0, 0.0), (3.0, 3.0)]));
    }

    #[test]
    fn simplify_keeps_corners() {
        let input = points(&[(0.0, 0.0), (0.0, 1.0), (0.0, 2.0), (1.0, 2.0), (2.0, 2.0)]);
        let output = simplify(&input, 0.1);
        assert_eq!(output, points(&[(0.0, 0.0), (0.0, 2.0), (2.0, 2.0)]));
    }

    #[test]
    fn simplify_with_zero_epsilon_is_identity() {
        let input = points(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]);
        assert_eq!(simplify(&input, 0.0), input);
    }

    #[test]
    fn simplify_handles_closed_loops() {
        let input = points(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)]);
        let output = simplify(&input, 0.1);
        assert_eq!(output.first(), input.first());
        assert_eq!(output.last(), input.last());
        assert!(output.len() >= 3);
    }

    #[test]
    fn moving_average_clamps_at_boundaries() {
        let input = points(&[(0.0, 0.0), (3.0, 0.0), (0.0, 3.0), (6.0, 6.0)]);
        let output = moving_average(&input, 3);
        assert_eq!(output[0], input[0]);
        assert_eq!(output[1], Waypoint::new(1.0, 1.0));
        assert_eq!(output[2], Waypoint::new(3.0, 3.0));
        assert_eq!(output[3], input[3]);
    }

    #[test]
    fn wide_window_uses_available_neighbours() {
        let input = points(&[(0.0, 0.0), (2.0, 2.0), (4.0, 4.0)]);
        let output = moving_average(&input, 9);
        assert_eq!(output[1], Waypoint::new(2.0, 2.0));
    }

    #[test]
    fn window_of_one_is_identity() {
        let input = points(&[(0.0, 0.0), (5.0, 1.0), (2.0, 2.0)]);
        assert_eq!(moving_average(&input, 1), input);
    }

    #[test]
    fn smooth_route_rejects_invalid_params() {
        let route = Route::new(RouteObjective::Fuel, points(&[(0.0, 0.0), (1.0, 1.0)])).unwrap();
        let params = SmoothingParams {
            epsilon: 0.001,
            window_size: 2,
        };
        assert!(matches!(
            smooth_route(&route, &params),
            Err(Error::SmoothingConfig { .. })
        ));
    }

    #[test]
    fn single_point_route_passes_through() {
        let route = Route::new(RouteObjective::Safe, points(&[(10.0, 70.0)])).unwrap();
        let smoothed = smooth_route(&route, &SmoothingParams::default()).unwrap();
        assert_eq!(smoothed, route);
    }

    #[test]
    fn perpendicular_distance_of_degenerate_chord() {
        let a = Waypoint::new(0.0, 0.0);
        let p = Waypoint::new(3.0, 4.0);
        assert_eq!(perpendicular_distance(&p, &a, &a), 5.0);
    }
}
