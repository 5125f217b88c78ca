//! Invocation of the external pathfinding and optimizer engines.
//!
//! Engines are reached through the [`PathfindingEngine`] and
//! [`OptimizerEngine`] traits so the orchestrator never depends on how an
//! engine is hosted. The runner translates engine failures into
//! [`StageError`] and turns the files an engine leaves behind into typed
//! [`Artifact`] handles.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::geo::RouteObjective;
use crate::request::{OptimizerParams, PathfinderParams};
use crate::results::RESULTS_FILE_NAME;
use crate::staging::{list_files, Artifact};

/// The two external stages of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Pathfinder,
    Optimizer,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Pathfinder => f.write_str("pathfinder"),
            Stage::Optimizer => f.write_str("optimizer"),
        }
    }
}

/// Failure reported by an engine implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The engine rejected its parameters.
    #[error("{0}")]
    InvalidInput(String),
    /// The engine failed for any other reason.
    #[error("{0}")]
    Failed(String),
}

/// Engine failure attributed to the stage that raised it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageError {
    #[error("{stage} rejected its input: {message}")]
    InvalidInput { stage: Stage, message: String },

    #[error("{stage} failed: {message}")]
    InternalFailure { stage: Stage, message: String },
}

impl StageError {
    pub fn stage(&self) -> Stage {
        match self {
            StageError::InvalidInput { stage, .. } | StageError::InternalFailure { stage, .. } => {
                *stage
            }
        }
    }

    fn from_engine(stage: Stage, error: EngineError) -> Self {
        match error {
            EngineError::InvalidInput(message) => StageError::InvalidInput { stage, message },
            EngineError::Failed(message) => StageError::InternalFailure { stage, message },
        }
    }
}

/// Engine that writes the three primary routes into the workspace.
pub trait PathfindingEngine: Send + Sync {
    /// Compute routes for `params`, writing `path_fuel.csv`, `path_safe.csv`
    /// and `path_short.csv` into `workspace`. The returned value is passed
    /// back to the caller untouched.
    fn find_paths(&self, workspace: &Path, params: &PathfinderParams) -> Result<Value, EngineError>;
}

/// Multi-objective optimizer writing candidate routes and a results table.
pub trait OptimizerEngine: Send + Sync {
    /// Run the optimizer with `workspace` as working directory. Candidate
    /// routes and auxiliary files go into `output_dir`; the results table is
    /// written to the workspace.
    fn optimize(
        &self,
        workspace: &Path,
        output_dir: &Path,
        params: &OptimizerParams,
    ) -> Result<(), EngineError>;
}

/// Result of the pathfinding stage.
#[derive(Debug, Clone)]
pub struct PathfinderOutput {
    /// Result object returned by the engine.
    pub result: Value,
    /// Expected raw route handles, one per primary objective. Existence is
    /// checked separately by the orchestrator.
    pub routes: Vec<(RouteObjective, Artifact)>,
}

/// Everything the optimizer left behind.
#[derive(Debug, Clone, Default)]
pub struct OptimizerManifest {
    /// Candidate route files recognized by name, ordered by file name.
    pub candidates: Vec<(RouteObjective, Artifact)>,
    /// Results table, if the optimizer wrote one.
    pub results_table: Option<Artifact>,
    /// Other files found in the output directory.
    pub auxiliary: Vec<Artifact>,
}

impl OptimizerManifest {
    /// Every file in the output directory, candidates first.
    pub fn output_files(&self) -> Vec<Artifact> {
        self.candidates
            .iter()
            .map(|(_, artifact)| artifact.clone())
            .chain(self.auxiliary.iter().cloned())
            .collect()
    }
}

/// Runs the engines against a fixed workspace.
#[derive(Clone)]
pub struct StageRunner {
    pathfinder: Arc<dyn PathfindingEngine>,
    optimizer: Arc<dyn OptimizerEngine>,
    workspace: PathBuf,
    output_dir: PathBuf,
}

impl fmt::Debug for StageRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageRunner")
            .field("workspace", &self.workspace)
            .field("output_dir", &self.output_dir)
            .finish_non_exhaustive()
    }
}

impl StageRunner {
    pub fn new(
        pathfinder: Arc<dyn PathfindingEngine>,
        optimizer: Arc<dyn OptimizerEngine>,
        workspace: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            pathfinder,
            optimizer,
            workspace: workspace.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn run_pathfinder(
        &self,
        params: &PathfinderParams,
    ) -> Result<PathfinderOutput, StageError> {
        info!(
            start_lat = params.start_lat,
            start_lon = params.start_lon,
            goal_lat = params.goal_lat,
            goal_lon = params.goal_lon,
            "running pathfinder"
        );
        let result = self
            .pathfinder
            .find_paths(&self.workspace, params)
            .map_err(|err| StageError::from_engine(Stage::Pathfinder, err))?;

        let routes = RouteObjective::PRIMARY
            .into_iter()
            .map(|objective| {
                (
                    objective,
                    Artifact::in_dir(&self.workspace, objective.raw_file_name()),
                )
            })
            .collect();

        Ok(PathfinderOutput { result, routes })
    }

    pub fn run_optimizer(&self, params: &OptimizerParams) -> Result<OptimizerManifest, StageError> {
        info!(
            weights = ?params.shipw,
            reposition = params.flag.is_some(),
            "running optimizer"
        );
        self.optimizer
            .optimize(&self.workspace, &self.output_dir, params)
            .map_err(|err| StageError::from_engine(Stage::Optimizer, err))?;

        let mut manifest = OptimizerManifest::default();
        if self.output_dir.is_dir() {
            let files = list_files(&self.output_dir).map_err(|err| StageError::InternalFailure {
                stage: Stage::Optimizer,
                message: err.to_string(),
            })?;
            for artifact in files {
                match RouteObjective::from_candidate_file_name(artifact.name()) {
                    Some(objective) => manifest.candidates.push((objective, artifact)),
                    None => manifest.auxiliary.push(artifact),
                }
            }
        } else {
            warn!(dir = %self.output_dir.display(), "optimizer output directory missing");
        }

        let results = Artifact::in_dir(&self.workspace, RESULTS_FILE_NAME);
        if results.exists() {
            manifest.results_table = Some(results);
        }

        info!(
            candidates = manifest.candidates.len(),
            auxiliary = manifest.auxiliary.len(),
            results_table = manifest.results_table.is_some(),
            "optimizer finished"
        );
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Waypoint;
    use crate::request::VesselParams;
    use std::fs;
    use tempfile::TempDir;

    struct Rejecting;

    impl PathfindingEngine for Rejecting {
        fn find_paths(&self, _: &Path, _: &PathfinderParams) -> Result<Value, EngineError> {
            Err(EngineError::InvalidInput("start point is on land".into()))
        }
    }

    impl OptimizerEngine for Rejecting {
        fn optimize(&self, _: &Path, _: &Path, _: &OptimizerParams) -> Result<(), EngineError> {
            Err(EngineError::Failed("population collapsed".into()))
        }
    }

    struct WritesCandidates;

    impl OptimizerEngine for WritesCandidates {
        fn optimize(
            &self,
            workspace: &Path,
            output_dir: &Path,
            _: &OptimizerParams,
        ) -> Result<(), EngineError> {
            let write = |path: PathBuf| {
                fs::write(path, "1,2\n").map_err(|e| EngineError::Failed(e.to_string()))
            };
            write(output_dir.join("path_2_smoothed.csv"))?;
            write(output_dir.join("path_1_smoothed.csv"))?;
            write(output_dir.join("pareto.png"))?;
            write(workspace.join(RESULTS_FILE_NAME))?;
            Ok(())
        }
    }

    fn pathfinder_params() -> PathfinderParams {
        PathfinderParams {
            start_lat: 10.0,
            start_lon: 70.0,
            goal_lat: 15.0,
            goal_lon: 75.0,
            vessel: VesselParams {
                ship_speed: 12.0,
                ship_dis: 200.0,
                area_front: 500.0,
                ship_height: 8.0,
                ship_reso: 1.0,
                hull_eff: 0.9,
                prop_eff: 0.7,
                engine_eff: 0.4,
                c_sfoc: 180.0,
            },
        }
    }

    fn optimizer_params() -> OptimizerParams {
        let start = Waypoint::new(10.0, 70.0);
        let goal = Waypoint::new(15.0, 75.0);
        OptimizerParams {
            start_lat: start.lat,
            start_lon: start.lon,
            goal_lat: goal.lat,
            goal_lon: goal.lon,
            shipw: vec![0.3, 0.3, 0.4],
            flag: None,
        }
    }

    fn runner(dir: &TempDir, optimizer: Arc<dyn OptimizerEngine>) -> StageRunner {
        let output = dir.path().join("output");
        fs::create_dir_all(&output).unwrap();
        StageRunner::new(Arc::new(Rejecting), optimizer, dir.path(), output)
    }

    #[test]
    fn engine_input_errors_keep_their_class() {
        let dir = TempDir::new().unwrap();
        let err = runner(&dir, Arc::new(Rejecting))
            .run_pathfinder(&pathfinder_params())
            .unwrap_err();
        assert_eq!(
            err,
            StageError::InvalidInput {
                stage: Stage::Pathfinder,
                message: "start point is on land".into()
            }
        );
        assert_eq!(err.to_string(), "pathfinder rejected its input: start point is on land");
    }

    #[test]
    fn other_engine_errors_are_internal() {
        let dir = TempDir::new().unwrap();
        let err = runner(&dir, Arc::new(Rejecting))
            .run_optimizer(&optimizer_params())
            .unwrap_err();
        assert!(matches!(err, StageError::InternalFailure { stage: Stage::Optimizer, .. }));
    }

    #[test]
    fn optimizer_manifest_lists_what_was_written() {
        let dir = TempDir::new().unwrap();
        let manifest = runner(&dir, Arc::new(WritesCandidates))
            .run_optimizer(&optimizer_params())
            .unwrap();

        let candidates: Vec<_> = manifest
            .candidates
            .iter()
            .map(|(objective, _)| *objective)
            .collect();
        assert_eq!(
            candidates,
            vec![RouteObjective::Candidate(1), RouteObjective::Candidate(2)]
        );
        assert_eq!(manifest.auxiliary.len(), 1);
        assert_eq!(manifest.auxiliary[0].name(), "pareto.png");
        assert!(manifest.results_table.is_some());
        assert_eq!(manifest.output_files().len(), 3);
    }
}
