//! Property-based checks of the smoothing filter over arbitrary routes.

use proptest::prelude::*;

use samudra_lib::smoothing::simplify;
use samudra_lib::{
    smooth_route, smooth_route_file, Route, RouteObjective, SmoothingParams, Waypoint,
};

/// Finite waypoints anywhere on the globe, 1 to 80 of them.
fn route_strategy() -> impl Strategy<Value = Route> {
    prop::collection::vec((-90.0f64..=90.0, -180.0f64..=180.0), 1..80).prop_map(|coords| {
        let points = coords
            .into_iter()
            .map(|(lat, lon)| Waypoint::new(lat, lon))
            .collect();
        Route::new(RouteObjective::Fuel, points).expect("non-empty route")
    })
}

/// Valid parameters: epsilon >= 0 and an odd window from 1 to 15.
fn params_strategy() -> impl Strategy<Value = SmoothingParams> {
    (
        prop_oneof![Just(0.0f64), 0.0f64..5.0],
        (0usize..8).prop_map(|half| half * 2 + 1),
    )
        .prop_map(|(epsilon, window_size)| {
            SmoothingParams::new(epsilon, window_size).expect("valid parameters")
        })
}

proptest! {
    #[test]
    fn endpoints_are_preserved_exactly(route in route_strategy(), params in params_strategy()) {
        let smoothed = smooth_route(&route, &params).unwrap();
        prop_assert_eq!(smoothed.first(), route.first());
        prop_assert_eq!(smoothed.last(), route.last());
    }

    #[test]
    fn output_never_grows(route in route_strategy(), params in params_strategy()) {
        let smoothed = smooth_route(&route, &params).unwrap();
        prop_assert!(smoothed.len() <= route.len());
    }

    #[test]
    fn output_has_no_consecutive_duplicates(
        route in route_strategy(),
        params in params_strategy(),
    ) {
        let smoothed = smooth_route(&route, &params).unwrap();
        for pair in smoothed.waypoints().windows(2) {
            prop_assert_ne!(pair[0], pair[1]);
        }
    }

    #[test]
    fn filter_is_deterministic(route in route_strategy(), params in params_strategy()) {
        let first = smooth_route(&route, &params).unwrap();
        let second = smooth_route(&route, &params).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn zero_epsilon_leaves_simplification_a_no_op(route in route_strategy()) {
        prop_assert_eq!(simplify(route.waypoints(), 0.0), route.waypoints().to_vec());
    }

    #[test]
    fn simplification_output_is_a_subsequence(
        route in route_strategy(),
        epsilon in 0.0f64..5.0,
    ) {
        let simplified = simplify(route.waypoints(), epsilon);
        prop_assert_eq!(simplified.first(), route.waypoints().first());
        prop_assert_eq!(simplified.last(), route.waypoints().last());

        let mut remaining = route.waypoints().iter();
        for point in &simplified {
            prop_assert!(remaining.any(|candidate| candidate == point), "{:?} out of order", point);
        }
    }
}

#[test]
fn zero_epsilon_still_smooths_interior_points() {
    let route = Route::new(
        RouteObjective::Safe,
        vec![
            Waypoint::new(10.0, 70.0),
            Waypoint::new(10.5, 70.1),
            Waypoint::new(10.2, 70.5),
            Waypoint::new(10.8, 70.6),
            Waypoint::new(11.0, 71.0),
        ],
    )
    .unwrap();

    let smoothed = smooth_route(&route, &SmoothingParams::new(0.0, 3).unwrap()).unwrap();
    assert_eq!(smoothed.len(), route.len());
    assert_ne!(smoothed.waypoints()[1], route.waypoints()[1]);
}

#[test]
fn file_helper_writes_headerless_csv() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("path_fuel.csv");
    let output = dir.path().join("path_fuel_smoothed.csv");
    std::fs::write(
        &input,
        "10.0,70.0\n10.5,70.4\n11.0,71.1\n11.5,71.4\n15.0,75.0\n",
    )
    .unwrap();

    let route = smooth_route_file(
        &input,
        &output,
        RouteObjective::Fuel,
        &SmoothingParams::default(),
    )
    .unwrap();
    let written = std::fs::read_to_string(&output).unwrap();
    assert!(written.starts_with("10,70\n"));
    assert!(written.ends_with("15,75\n"));
    assert_eq!(written.lines().count(), route.len());
}
