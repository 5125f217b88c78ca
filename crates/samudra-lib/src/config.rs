use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::smoothing::SmoothingParams;

/// Environment variable overriding the transient workspace directory.
pub const WORKSPACE_ENV: &str = "SAMUDRA_WORKSPACE_DIR";
/// Environment variable overriding the publish destination directory.
pub const DESTINATION_ENV: &str = "SAMUDRA_DESTINATION_DIR";
/// Whitespace-separated argv of the pathfinding engine.
pub const PATHFINDER_CMD_ENV: &str = "SAMUDRA_PATHFINDER_CMD";
/// Whitespace-separated argv of the optimizer engine.
pub const OPTIMIZER_CMD_ENV: &str = "SAMUDRA_OPTIMIZER_CMD";
pub const SMOOTHING_EPSILON_ENV: &str = "SAMUDRA_SMOOTHING_EPSILON";
pub const SMOOTHING_WINDOW_ENV: &str = "SAMUDRA_SMOOTHING_WINDOW";
pub const ENDPOINT_TOLERANCE_ENV: &str = "SAMUDRA_ENDPOINT_TOLERANCE";

/// Name of the optimizer's auxiliary output directory inside the workspace.
pub const DEFAULT_OUTPUT_DIR_NAME: &str = "output";
/// Allowed distance in degrees between a smoothed endpoint and the request.
pub const DEFAULT_ENDPOINT_TOLERANCE: f64 = 0.5;
pub const DEFAULT_PATHFINDER_COMMAND: &str = "samudra-pathfinder";
pub const DEFAULT_OPTIMIZER_COMMAND: &str = "samudra-optimizer";

/// Everything needed to build a [`crate::PipelineOrchestrator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub workspace_dir: PathBuf,
    #[serde(default = "default_output_dir_name")]
    pub output_dir_name: String,
    pub destination_dir: PathBuf,
    #[serde(default)]
    pub smoothing: SmoothingParams,
    #[serde(default = "default_endpoint_tolerance")]
    pub endpoint_tolerance: f64,
    #[serde(default = "default_pathfinder_command")]
    pub pathfinder_command: Vec<String>,
    #[serde(default = "default_optimizer_command")]
    pub optimizer_command: Vec<String>,
}

impl PipelineConfig {
    /// Configuration rooted at `root`: the workspace is `root/workspace` and
    /// the destination is `root/public`.
    pub fn with_root(root: &Path) -> Self {
        Self::with_dirs(root.join("workspace"), root.join("public"))
    }

    pub fn with_dirs(
        workspace_dir: impl Into<PathBuf>,
        destination_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            workspace_dir: workspace_dir.into(),
            output_dir_name: default_output_dir_name(),
            destination_dir: destination_dir.into(),
            smoothing: SmoothingParams::default(),
            endpoint_tolerance: DEFAULT_ENDPOINT_TOLERANCE,
            pathfinder_command: default_pathfinder_command(),
            optimizer_command: default_optimizer_command(),
        }
    }

    /// Resolve configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration from an arbitrary variable source.
    ///
    /// Directories fall back to the platform project directories when their
    /// variables are unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let (workspace_dir, destination_dir) =
            match (lookup(WORKSPACE_ENV), lookup(DESTINATION_ENV)) {
                (Some(workspace), Some(destination)) => {
                    (PathBuf::from(workspace), PathBuf::from(destination))
                }
                (workspace, destination) => {
                    let dirs = project_dirs()?;
                    (
                        workspace
                            .map(PathBuf::from)
                            .unwrap_or_else(|| dirs.cache_dir().join("workspace")),
                        destination
                            .map(PathBuf::from)
                            .unwrap_or_else(|| dirs.data_dir().join("public")),
                    )
                }
            };

        let mut config = Self::with_dirs(workspace_dir, destination_dir);

        if let Some(command) = lookup(PATHFINDER_CMD_ENV) {
            config.pathfinder_command = split_command(&command);
        }
        if let Some(command) = lookup(OPTIMIZER_CMD_ENV) {
            config.optimizer_command = split_command(&command);
        }
        if let Some(raw) = lookup(SMOOTHING_EPSILON_ENV) {
            config.smoothing.epsilon = parse_var(SMOOTHING_EPSILON_ENV, &raw)?;
        }
        if let Some(raw) = lookup(SMOOTHING_WINDOW_ENV) {
            config.smoothing.window_size = parse_var(SMOOTHING_WINDOW_ENV, &raw)?;
        }
        if let Some(raw) = lookup(ENDPOINT_TOLERANCE_ENV) {
            config.endpoint_tolerance = parse_var(ENDPOINT_TOLERANCE_ENV, &raw)?;
        }

        config.validate()?;
        debug!(
            workspace = %config.workspace_dir.display(),
            destination = %config.destination_dir.display(),
            "resolved pipeline configuration"
        );
        Ok(config)
    }

    /// Reject configurations the orchestrator cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.smoothing.validate()?;
        if !self.endpoint_tolerance.is_finite() || self.endpoint_tolerance < 0.0 {
            return Err(Error::Config {
                message: format!(
                    "endpoint tolerance must be a finite number >= 0, got {}",
                    self.endpoint_tolerance
                ),
            });
        }
        let name = Path::new(&self.output_dir_name);
        if self.output_dir_name.is_empty() || name.components().count() != 1 || name.is_absolute() {
            return Err(Error::Config {
                message: format!(
                    "output directory name '{}' must be a single path component",
                    self.output_dir_name
                ),
            });
        }
        if self.pathfinder_command.is_empty() || self.optimizer_command.is_empty() {
            return Err(Error::Config {
                message: "engine commands must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Directory the optimizer writes candidates and auxiliary files into.
    pub fn output_dir(&self) -> PathBuf {
        self.workspace_dir.join(&self.output_dir_name)
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("org", "samudra", "samudra").ok_or(Error::ProjectDirsUnavailable)
}

fn split_command(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

fn parse_var<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| Error::Config {
        message: format!("{name} has an invalid value '{raw}'"),
    })
}

fn default_output_dir_name() -> String {
    DEFAULT_OUTPUT_DIR_NAME.to_string()
}

fn default_endpoint_tolerance() -> f64 {
    DEFAULT_ENDPOINT_TOLERANCE
}

fn default_pathfinder_command() -> Vec<String> {
    vec![DEFAULT_PATHFINDER_COMMAND.to_string()]
}

fn default_optimizer_command() -> Vec<String> {
    vec![DEFAULT_OPTIMIZER_COMMAND.to_string()]
}
