//! Shared fixtures for the pipeline integration tests.
//!
//! The fake engines behave like the real ones at the file boundary: the
//! pathfinder writes three grid-snapped routes into the workspace and the
//! optimizer writes numbered candidates plus a results table.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use samudra_lib::{
    EngineError, OptimizerEngine, OptimizerParams, PathfinderParams, PathfindingEngine,
    PipelineConfig, PipelineOrchestrator, RouteParameters,
};
use serde_json::{json, Value};
use tempfile::TempDir;

/// Parameters from the reference scenario: (10, 70) to (15, 75).
#[allow(dead_code)]
pub fn scenario_params() -> RouteParameters {
    serde_json::from_value(json!({
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
    }))
    .expect("scenario parameters deserialize")
}

/// Grid-walk from start to goal with a small zig-zag, as a raster engine would emit.
#[allow(dead_code)]
pub fn grid_route(params: &PathfinderParams, steps: usize, wobble: f64) -> String {
    let mut csv = String::new();
    for step in 0..=steps {
        let t = step as f64 / steps as f64;
        let jitter = if step == 0 || step == steps {
            0.0
        } else if step % 2 == 0 {
            wobble
        } else {
            -wobble
        };
        let lat = params.start_lat + (params.goal_lat - params.start_lat) * t + jitter;
        let lon = params.start_lon + (params.goal_lon - params.start_lon) * t;
        csv.push_str(&format!("{lat},{lon}\n"));
    }
    csv
}

/// Pathfinder double writing `path_fuel.csv`, `path_safe.csv`, `path_short.csv`.
#[derive(Default)]
pub struct FakePathfinder {
    /// Objective file to leave out, simulating an engine that silently fails.
    pub skip: Option<&'static str>,
    /// Reject every request with this message.
    pub reject: Option<String>,
    /// Delay while holding the workspace, used by the lock tests.
    pub delay: Option<Duration>,
    pub calls: AtomicUsize,
    pub active: AtomicUsize,
    pub max_active: AtomicUsize,
}

impl PathfindingEngine for FakePathfinder {
    fn find_paths(
        &self,
        workspace: &Path,
        params: &PathfinderParams,
    ) -> Result<Value, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.reject {
            return Err(EngineError::InvalidInput(message.clone()));
        }

        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        let routes = [("fuel", 40, 0.02), ("safe", 30, 0.05), ("short", 20, 0.01)];
        let result = (|| {
            for (objective, steps, wobble) in routes {
                if self.skip == Some(objective) {
                    continue;
                }
                fs::write(
                    workspace.join(format!("path_{objective}.csv")),
                    grid_route(params, steps, wobble),
                )?;
            }
            Ok::<_, std::io::Error>(())
        })();
        self.active.fetch_sub(1, Ordering::SeqCst);
        result.map_err(|err| EngineError::Failed(err.to_string()))?;

        Ok(json!({
            "start": [params.start_lat, params.start_lon],
            "goal": [params.goal_lat, params.goal_lon],
            "distance_nm": 412.5
        }))
    }
}

/// Optimizer double writing numbered candidates, an auxiliary plot and `results.csv`.
pub struct FakeOptimizer {
    pub candidates: u32,
    pub write_results: bool,
    pub reject: Option<String>,
    pub calls: AtomicUsize,
    pub last_flag: std::sync::Mutex<Option<Value>>,
}

impl Default for FakeOptimizer {
    fn default() -> Self {
        Self {
            candidates: 3,
            write_results: true,
            reject: None,
            calls: AtomicUsize::new(0),
            last_flag: std::sync::Mutex::new(None),
        }
    }
}

impl OptimizerEngine for FakeOptimizer {
    fn optimize(
        &self,
        workspace: &Path,
        output_dir: &Path,
        params: &OptimizerParams,
    ) -> Result<(), EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_flag.lock().expect("flag lock") = params.flag.clone();
        if let Some(message) = &self.reject {
            return Err(EngineError::InvalidInput(message.clone()));
        }
        if params.flag.is_some() {
            return Ok(());
        }

        let write = |path: std::path::PathBuf, contents: String| {
            fs::write(path, contents).map_err(|err| EngineError::Failed(err.to_string()))
        };
        for index in 1..=self.candidates {
            let mid_lat = (params.start_lat + params.goal_lat) / 2.0 + index as f64 * 0.1;
            let mid_lon = (params.start_lon + params.goal_lon) / 2.0;
            write(
                output_dir.join(format!("path_{index}_smoothed.csv")),
                format!(
                    "{},{}\n{mid_lat},{mid_lon}\n{},{}\n",
                    params.start_lat, params.start_lon, params.goal_lat, params.goal_lon
                ),
            )?;
        }
        write(output_dir.join("pareto_front.txt"), "front\n".to_string())?;
        if self.write_results {
            let rows: String = (1..=self.candidates)
                .map(|index| format!("{index},{},{},{}\n", 1500 + index * 10, 410.5, 34.25))
                .collect();
            write(workspace.join("results.csv"), rows)?;
        }
        Ok(())
    }
}

/// Temporary workspace + destination with an orchestrator wired to fakes.
pub struct PipelineEnv {
    pub root: TempDir,
    pub config: PipelineConfig,
    pub pathfinder: Arc<FakePathfinder>,
    pub optimizer: Arc<FakeOptimizer>,
    pub orchestrator: PipelineOrchestrator,
}

#[allow(dead_code)]
impl PipelineEnv {
    pub fn new() -> Self {
        Self::with_engines(FakePathfinder::default(), FakeOptimizer::default())
    }

    pub fn with_engines(pathfinder: FakePathfinder, optimizer: FakeOptimizer) -> Self {
        let root = TempDir::new().expect("create temp dir");
        let config = PipelineConfig::with_root(root.path());
        let pathfinder = Arc::new(pathfinder);
        let optimizer = Arc::new(optimizer);
        let orchestrator =
            PipelineOrchestrator::new(&config, pathfinder.clone(), optimizer.clone())
                .expect("orchestrator builds");
        Self {
            root,
            config,
            pathfinder,
            optimizer,
            orchestrator,
        }
    }

    pub fn destination_file(&self, name: &str) -> std::path::PathBuf {
        self.config.destination_dir.join(name)
    }

    pub fn destination_names(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(&self.config.destination_dir)
            .expect("read destination")
            .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}
