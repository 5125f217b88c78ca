//! Test utilities for service handler testing.
//!
//! Provides an [`AppState`] wired to in-process fake engines over a
//! temporary directory, so handlers can be exercised without the external
//! pathfinding and optimizer programs.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use samudra_lib::{
    EngineError, OptimizerEngine, OptimizerParams, PathfinderParams, PathfindingEngine,
    PipelineConfig,
};
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::state::AppState;

/// Pathfinder fake that writes straight-line-with-detour primary routes.
#[derive(Debug, Default)]
pub struct StubPathfinder {
    /// When set, every call is rejected with this message.
    pub reject: Option<String>,
}

impl PathfindingEngine for StubPathfinder {
    fn find_paths(
        &self,
        workspace: &Path,
        params: &PathfinderParams,
    ) -> Result<Value, EngineError> {
        if let Some(message) = &self.reject {
            return Err(EngineError::InvalidInput(message.clone()));
        }
        for (objective, offset) in [("fuel", 0.2), ("safe", 0.4), ("short", 0.0)] {
            let mid_lat = (params.start_lat + params.goal_lat) / 2.0 + offset;
            let mid_lon = (params.start_lon + params.goal_lon) / 2.0;
            let csv = format!(
                "{},{}\n{mid_lat},{mid_lon}\n{},{}\n",
                params.start_lat, params.start_lon, params.goal_lat, params.goal_lon
            );
            fs::write(workspace.join(format!("path_{objective}.csv")), csv)
                .map_err(|err| EngineError::Failed(err.to_string()))?;
        }
        Ok(json!({ "status": "ok" }))
    }
}

/// Optimizer fake writing two candidates and a results table.
#[derive(Debug, Default)]
pub struct StubOptimizer;

impl OptimizerEngine for StubOptimizer {
    fn optimize(
        &self,
        workspace: &Path,
        output_dir: &Path,
        params: &OptimizerParams,
    ) -> Result<(), EngineError> {
        if params.flag.is_some() {
            return Ok(());
        }
        let write = |path: std::path::PathBuf, contents: &str| {
            fs::write(path, contents).map_err(|err| EngineError::Failed(err.to_string()))
        };
        let line = format!(
            "{},{}\n{},{}\n",
            params.start_lat, params.start_lon, params.goal_lat, params.goal_lon
        );
        write(output_dir.join("path_1_smoothed.csv"), &line)?;
        write(output_dir.join("path_2_smoothed.csv"), &line)?;
        write(workspace.join("results.csv"), "1,1510,410.5,34.25\n2,1520,411.0,33.9\n")
    }
}

/// Handler test state together with the directory backing it.
///
/// Keep the [`TempDir`] alive for as long as the state is used.
pub fn test_state() -> (AppState, TempDir) {
    test_state_with(StubPathfinder::default(), StubOptimizer)
}

pub fn test_state_with(
    pathfinder: impl PathfindingEngine + 'static,
    optimizer: impl OptimizerEngine + 'static,
) -> (AppState, TempDir) {
    let dir = TempDir::new().unwrap_or_else(|e| panic!("failed to create temp dir: {}", e));
    let config = PipelineConfig::with_root(dir.path());
    let state = AppState::with_engines(config, Arc::new(pathfinder), Arc::new(optimizer))
        .unwrap_or_else(|e| panic!("failed to build test state: {}", e));
    (state, dir)
}

/// Route request body from the reference scenario.
pub fn scenario_body() -> Value {
    json!({
        "start_lat": 10.0,
        "start_lon": 70.0,
        "goal_lat": 15.0,
        "goal_lon": 75.0,
        "ship_speed": 12,
        "ship_height": 8,
        "ship_dis": 200,
        "area_front": 500,
        "ship_reso": 1,
        "hull_eff": 0.9,
        "prop_eff": 0.7,
        "engine_eff": 0.4,
        "c_sfoc": 180,
        "shipw": [0.3, 0.3, 0.4]
    })
}

/// Generate a unique request ID for testing.
pub fn test_request_id() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    format!("test-{}", COUNTER.fetch_add(1, Ordering::Relaxed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use samudra_lib::RouteParameters;

    #[test]
    fn test_state_runs_the_scenario() {
        let (state, _dir) = test_state();
        let params: RouteParameters = serde_json::from_value(scenario_body()).unwrap();

        let computation = state.orchestrator().compute_route(&params).unwrap();
        assert_eq!(computation.results.map(|r| r.len()), Some(2));
        assert!(state.destination_dir().join("path_fuel_smoothed.csv").exists());
    }

    #[test]
    fn test_request_ids_are_unique() {
        assert_ne!(test_request_id(), test_request_id());
    }
}
