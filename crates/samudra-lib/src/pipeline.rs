//! The pipeline orchestrator: one run per request, one run at a time.
//!
//! A run moves through [`PipelineState`] in a fixed order. Any failure moves
//! it to [`PipelineState::Errored`] and aborts the remaining states; artifacts
//! already published by that point stay in the destination area.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::engine::CommandEngine;
use crate::error::{Error, ErrorKind, Result};
use crate::geo::{Route, RouteObjective};
use crate::request::{RepositionParameters, RepositionRequest, RouteParameters, RouteRequest};
use crate::results::{ResultsTable, RESULTS_FILE_NAME};
use crate::smoothing::{smooth_route, SmoothingParams};
use crate::stages::{OptimizerEngine, PathfindingEngine, StageRunner};
use crate::staging::{Artifact, OutputStaging};

/// Message returned by a successful reposition run.
pub const REPOSITION_ACK_MESSAGE: &str = "Route position calculation completed successfully";

/// Observable state of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Cleaning,
    Computing,
    Verifying,
    Smoothing,
    Publishing,
    TearingDown,
    Done,
    Errored(ErrorKind),
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Errored(_))
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Cleaning => f.write_str("cleaning"),
            PipelineState::Computing => f.write_str("computing"),
            PipelineState::Verifying => f.write_str("verifying"),
            PipelineState::Smoothing => f.write_str("smoothing"),
            PipelineState::Publishing => f.write_str("publishing"),
            PipelineState::TearingDown => f.write_str("tearing_down"),
            PipelineState::Done => f.write_str("done"),
            PipelineState::Errored(kind) => write!(f, "errored({kind})"),
        }
    }
}

/// Callback notified of every state a run enters.
pub type PipelineObserver = Arc<dyn Fn(PipelineState) + Send + Sync>;

/// The three smoothed primary routes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrimaryRoutes {
    pub fuel: Route,
    pub safe: Route,
    pub short: Route,
}

/// Outcome of a successful route computation.
#[derive(Debug, Clone, Serialize)]
pub struct RouteComputation {
    /// Result object returned by the pathfinding engine.
    pub pathfinder: Value,
    /// Converted results table; `None` when it was absent or unreadable.
    pub results: Option<ResultsTable>,
    pub routes: PrimaryRoutes,
    /// Names written to the destination area by this run.
    pub published: Vec<String>,
}

/// Outcome of a successful reposition run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Acknowledgement {
    pub message: String,
}

/// Sequences staging, engines and smoothing over a shared workspace.
pub struct PipelineOrchestrator {
    staging: OutputStaging,
    runner: StageRunner,
    smoothing: SmoothingParams,
    endpoint_tolerance: f64,
    run_lock: Mutex<()>,
    observer: Option<PipelineObserver>,
}

impl fmt::Debug for PipelineOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineOrchestrator")
            .field("staging", &self.staging)
            .field("runner", &self.runner)
            .field("smoothing", &self.smoothing)
            .field("endpoint_tolerance", &self.endpoint_tolerance)
            .finish_non_exhaustive()
    }
}

impl PipelineOrchestrator {
    pub fn new(
        config: &PipelineConfig,
        pathfinder: Arc<dyn PathfindingEngine>,
        optimizer: Arc<dyn OptimizerEngine>,
    ) -> Result<Self> {
        config.validate()?;
        let staging = OutputStaging::new(
            &config.workspace_dir,
            &config.output_dir_name,
            &config.destination_dir,
        );
        let runner = StageRunner::new(
            pathfinder,
            optimizer,
            staging.workspace(),
            staging.aux_dir(),
        );
        Ok(Self {
            staging,
            runner,
            smoothing: config.smoothing,
            endpoint_tolerance: config.endpoint_tolerance,
            run_lock: Mutex::new(()),
            observer: None,
        })
    }

    /// Build an orchestrator whose engines are the configured external commands.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let pathfinder = CommandEngine::from_argv(&config.pathfinder_command)?;
        let optimizer = CommandEngine::from_argv(&config.optimizer_command)?;
        Self::new(config, Arc::new(pathfinder), Arc::new(optimizer))
    }

    pub fn with_observer(mut self, observer: PipelineObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn staging(&self) -> &OutputStaging {
        &self.staging
    }

    /// Run the full pipeline for one route request.
    pub fn compute_route(&self, params: &RouteParameters) -> Result<RouteComputation> {
        let request = params.to_request()?;
        let _guard = self.run_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut state = PipelineState::Cleaning;
        let outcome = self.compute_route_locked(&request, &mut state);
        self.finish(outcome, state)
    }

    /// Run the optimizer in repositioning mode.
    pub fn reposition(&self, params: &RepositionParameters) -> Result<Acknowledgement> {
        let request = params.to_request()?;
        let _guard = self.run_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut state = PipelineState::Cleaning;
        let outcome = self.reposition_locked(&request, &mut state);
        self.finish(outcome, state)
    }

    fn reposition_locked(
        &self,
        request: &RepositionRequest,
        state: &mut PipelineState,
    ) -> Result<Acknowledgement> {
        self.enter(state, PipelineState::Cleaning);
        self.staging.prepare()?;

        self.enter(state, PipelineState::Computing);
        self.runner.run_optimizer(&request.optimizer_params())?;

        // Repositioning persists nothing the caller depends on, so there is
        // nothing to verify or publish.
        self.enter(state, PipelineState::Verifying);
        self.enter(state, PipelineState::Publishing);

        Ok(Acknowledgement {
            message: REPOSITION_ACK_MESSAGE.to_string(),
        })
    }

    fn compute_route_locked(
        &self,
        request: &RouteRequest,
        state: &mut PipelineState,
    ) -> Result<RouteComputation> {
        self.enter(state, PipelineState::Cleaning);
        self.clean()?;

        self.enter(state, PipelineState::Computing);
        let pathfinder = self.runner.run_pathfinder(&request.pathfinder_params())?;
        let optimizer = self.runner.run_optimizer(&request.optimizer_params())?;

        self.enter(state, PipelineState::Verifying);
        let raw_names: Vec<&str> = pathfinder
            .routes
            .iter()
            .map(|(_, artifact)| artifact.name())
            .collect();
        self.staging.verify_present(&raw_names)?;

        self.enter(state, PipelineState::Smoothing);
        let mut smoothed = Vec::with_capacity(pathfinder.routes.len());
        for (objective, artifact) in &pathfinder.routes {
            let raw = Route::from_csv_path(*objective, artifact.path())?;
            let route = smooth_route(&raw, &self.smoothing)?;
            if !route.connects(&request.start, &request.goal, self.endpoint_tolerance) {
                warn!(
                    objective = %objective,
                    first = ?route.first(),
                    last = ?route.last(),
                    "smoothed route endpoints drift from the requested start/goal"
                );
            }
            let target = self.staging.workspace_artifact(objective.smoothed_file_name());
            route.write_csv_path(target.path())?;
            smoothed.push((target, route));
        }

        self.enter(state, PipelineState::Publishing);
        let mut to_publish: Vec<Artifact> = smoothed
            .iter()
            .map(|(artifact, _)| artifact.clone())
            .collect();
        to_publish.push(
            optimizer
                .results_table
                .clone()
                .unwrap_or_else(|| self.staging.workspace_artifact(RESULTS_FILE_NAME)),
        );
        to_publish.extend(optimizer.output_files());

        // Record every intended name before copying so a publish that fails
        // partway still leaves the next Cleaning a complete list.
        let intended: Vec<String> = to_publish
            .iter()
            .map(|artifact| artifact.name().to_string())
            .collect();
        self.staging.write_manifest(&intended)?;

        let report = self.staging.publish(&to_publish)?;
        if !report.skipped.is_empty() {
            warn!(
                skipped = ?report.skipped,
                "some artifacts were not produced and were not published"
            );
        }
        self.staging.write_manifest(&report.copied)?;

        let results = optimizer
            .results_table
            .as_ref()
            .and_then(|artifact| ResultsTable::load_lenient(artifact.path()));

        self.enter(state, PipelineState::TearingDown);
        self.staging.teardown_workspace_dir(self.staging.aux_dir())?;

        let routes = primary_routes(smoothed.into_iter().map(|(_, route)| route))?;
        Ok(RouteComputation {
            pathfinder: pathfinder.result,
            results,
            routes,
            published: report.copied,
        })
    }

    /// Remove everything a previous run could have left behind.
    fn clean(&self) -> Result<()> {
        let mut names: BTreeSet<String> = RouteObjective::PRIMARY
            .into_iter()
            .flat_map(|objective| [objective.raw_file_name(), objective.smoothed_file_name()])
            .collect();
        names.insert(RESULTS_FILE_NAME.to_string());
        names.extend(self.staging.read_manifest());

        let removed = self.staging.reset(&names)?;
        self.staging.teardown_workspace_dir(self.staging.aux_dir())?;
        self.staging.prepare()?;
        info!(removed, "workspace cleaned");
        Ok(())
    }

    fn enter(&self, current: &mut PipelineState, next: PipelineState) {
        if *current != next {
            debug!(from = %current, to = %next, "pipeline transition");
        } else {
            debug!(state = %next, "pipeline state entered");
        }
        *current = next;
        if let Some(observer) = &self.observer {
            observer(next);
        }
    }

    fn finish<T>(&self, outcome: Result<T>, mut state: PipelineState) -> Result<T> {
        match outcome {
            Ok(value) => {
                self.enter(&mut state, PipelineState::Done);
                info!("pipeline run completed");
                Ok(value)
            }
            Err(err) => {
                let failed_in = state;
                self.enter(&mut state, PipelineState::Errored(err.kind()));
                warn!(state = %failed_in, kind = %err.kind(), error = %err, "pipeline run failed");
                Err(err)
            }
        }
    }
}

fn primary_routes(routes: impl IntoIterator<Item = Route>) -> Result<PrimaryRoutes> {
    let (mut fuel, mut safe, mut short) = (None, None, None);
    for route in routes {
        match route.objective() {
            RouteObjective::Fuel => fuel = Some(route),
            RouteObjective::Safe => safe = Some(route),
            RouteObjective::Short => short = Some(route),
            RouteObjective::Candidate(_) => {}
        }
    }
    match (fuel, safe, short) {
        (Some(fuel), Some(safe), Some(short)) => Ok(PrimaryRoutes { fuel, safe, short }),
        (fuel, safe, short) => {
            let missing = [
                (RouteObjective::Fuel, fuel.is_none()),
                (RouteObjective::Safe, safe.is_none()),
                (RouteObjective::Short, short.is_none()),
            ]
            .into_iter()
            .filter(|(_, absent)| *absent)
            .map(|(objective, _)| objective.smoothed_file_name())
            .collect();
            Err(Error::IncompleteOutput { missing })
        }
    }
}
