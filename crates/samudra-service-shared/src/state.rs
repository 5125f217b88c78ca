//! Application state for the HTTP services.
//!
//! Handlers reach the pipeline orchestrator and its resolved configuration
//! through this state.

use std::path::Path;
use std::sync::Arc;

use samudra_lib::{
    Error as LibError, OptimizerEngine, PathfindingEngine, PipelineConfig, PipelineOrchestrator,
};

/// Error during application state initialization.
#[derive(Debug)]
pub enum AppStateError {
    /// Configuration could not be resolved from the environment.
    Config(LibError),

    /// The orchestrator rejected the configuration or its engines.
    Orchestrator(LibError),
}

impl std::fmt::Display for AppStateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(e) => write!(f, "failed to load pipeline configuration: {}", e),
            Self::Orchestrator(e) => write!(f, "failed to build pipeline orchestrator: {}", e),
        }
    }
}

impl std::error::Error for AppStateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) | Self::Orchestrator(e) => Some(e),
        }
    }
}

/// Shared application state for all axum handlers.
///
/// Cheaply cloneable; the orchestrator serializes runs internally so
/// concurrent handlers can share one instance.
///
/// # Example
///
/// ```ignore
/// use axum::{Router, routing::post, extract::State};
/// use samudra_service_shared::AppState;
///
/// async fn handler(State(state): State<AppState>) {
///     let orchestrator = state.orchestrator();
///     // ... run the pipeline on a blocking thread
/// }
///
/// let state = AppState::from_env().unwrap();
/// let app = Router::new()
///     .route("/calculate_route", post(handler))
///     .with_state(state);
/// ```
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: PipelineConfig,
    orchestrator: Arc<PipelineOrchestrator>,
}

impl AppState {
    /// Build state whose engines are the configured external commands.
    pub fn from_config(config: PipelineConfig) -> Result<Self, AppStateError> {
        let orchestrator =
            PipelineOrchestrator::from_config(&config).map_err(AppStateError::Orchestrator)?;
        tracing::info!(
            workspace = %config.workspace_dir.display(),
            destination = %config.destination_dir.display(),
            pathfinder = %config.pathfinder_command.join(" "),
            optimizer = %config.optimizer_command.join(" "),
            "pipeline configured"
        );
        Ok(Self::with_orchestrator(config, orchestrator))
    }

    /// Resolve configuration from `SAMUDRA_*` environment variables.
    pub fn from_env() -> Result<Self, AppStateError> {
        let config = PipelineConfig::from_env().map_err(AppStateError::Config)?;
        Self::from_config(config)
    }

    /// Build state around caller-supplied engines.
    pub fn with_engines(
        config: PipelineConfig,
        pathfinder: Arc<dyn PathfindingEngine>,
        optimizer: Arc<dyn OptimizerEngine>,
    ) -> Result<Self, AppStateError> {
        let orchestrator = PipelineOrchestrator::new(&config, pathfinder, optimizer)
            .map_err(AppStateError::Orchestrator)?;
        Ok(Self::with_orchestrator(config, orchestrator))
    }

    pub fn with_orchestrator(config: PipelineConfig, orchestrator: PipelineOrchestrator) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                orchestrator: Arc::new(orchestrator),
            }),
        }
    }

    /// Shared handle, suitable for moving into `spawn_blocking`.
    pub fn orchestrator(&self) -> Arc<PipelineOrchestrator> {
        Arc::clone(&self.inner.orchestrator)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.inner.config
    }

    pub fn workspace_dir(&self) -> &Path {
        &self.inner.config.workspace_dir
    }

    pub fn destination_dir(&self) -> &Path {
        &self.inner.config.destination_dir
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.inner.config)
            .field("orchestrator", &self.inner.orchestrator)
            .finish()
    }
}
