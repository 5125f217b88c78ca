use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use samudra_cli::commands::{
    compute::handle_compute, reposition::handle_reposition, results::handle_results,
    smooth::{handle_smooth, parse_objective},
};
use samudra_cli::output::OutputFormat;
use samudra_lib::config::{
    DESTINATION_ENV, OPTIMIZER_CMD_ENV, PATHFINDER_CMD_ENV, WORKSPACE_ENV,
};
use samudra_lib::smoothing::{DEFAULT_EPSILON, DEFAULT_WINDOW_SIZE};
use samudra_lib::{PipelineConfig, RouteObjective};

#[derive(Parser, Debug)]
#[command(author, version, about = "Samudra maritime route pipeline")]
struct Cli {
    /// Workspace directory shared with the engines.
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,

    /// Destination directory that receives published routes.
    #[arg(long, global = true)]
    destination: Option<PathBuf>,

    /// Pathfinding engine command line (whitespace-separated).
    #[arg(long = "pathfinder-cmd", global = true)]
    pathfinder_cmd: Option<String>,

    /// Optimizer engine command line (whitespace-separated).
    #[arg(long = "optimizer-cmd", global = true)]
    optimizer_cmd: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute fuel, safe and short routes plus optimizer candidates.
    Compute {
        /// JSON file with the route parameters, or `-` for stdin.
        #[arg(long)]
        params: PathBuf,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Rerun the optimizer in repositioning mode.
    Reposition {
        /// JSON file with the reposition parameters, or `-` for stdin.
        #[arg(long)]
        params: PathBuf,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Simplify and smooth a single route CSV file.
    Smooth {
        input: PathBuf,
        /// Output path; defaults to `<input stem>_smoothed.csv`.
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Objective tag; inferred from `path_<objective>.csv` names when omitted.
        #[arg(long, value_parser = parse_objective)]
        objective: Option<RouteObjective>,
        #[arg(long, default_value_t = DEFAULT_EPSILON)]
        epsilon: f64,
        #[arg(long = "window-size", default_value_t = DEFAULT_WINDOW_SIZE)]
        window_size: usize,
    },
    /// Convert a headerless results table to JSON.
    Results { path: PathBuf },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match &cli.command {
        Command::Compute { params, format } => {
            handle_compute(&pipeline_config(&cli)?, params, *format)
        }
        Command::Reposition { params, format } => {
            handle_reposition(&pipeline_config(&cli)?, params, *format)
        }
        Command::Smooth {
            input,
            output,
            objective,
            epsilon,
            window_size,
        } => handle_smooth(input, output.as_deref(), *objective, *epsilon, *window_size),
        Command::Results { path } => handle_results(path),
    }
}

/// Environment configuration with command-line flags taking precedence.
fn pipeline_config(cli: &Cli) -> Result<PipelineConfig> {
    let path_flag = |flag: &Option<PathBuf>| flag.as_ref().map(|p| p.display().to_string());
    PipelineConfig::from_lookup(|key| {
        let flag = match key {
            WORKSPACE_ENV => path_flag(&cli.workspace),
            DESTINATION_ENV => path_flag(&cli.destination),
            PATHFINDER_CMD_ENV => cli.pathfinder_cmd.clone(),
            OPTIMIZER_CMD_ENV => cli.optimizer_cmd.clone(),
            _ => None,
        };
        flag.or_else(|| std::env::var(key).ok())
    })
    .context("failed to resolve pipeline configuration")
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
