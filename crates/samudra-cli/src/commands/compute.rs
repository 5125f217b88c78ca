//! `compute` subcommand: run the full route pipeline.

use std::path::Path;

use anyhow::{Context, Result};

use samudra_lib::{PipelineConfig, PipelineOrchestrator, RouteParameters};

use crate::commands::read_params;
use crate::output::{write_computation_text, write_json, OutputFormat};

pub fn handle_compute(config: &PipelineConfig, params: &Path, format: OutputFormat) -> Result<()> {
    let params: RouteParameters = read_params(params)?;
    let orchestrator =
        PipelineOrchestrator::from_config(config).context("failed to configure the pipeline")?;

    let computation = orchestrator
        .compute_route(&params)
        .context("route calculation failed")?;

    let stdout = std::io::stdout().lock();
    match format {
        OutputFormat::Json => write_json(stdout, &computation)?,
        OutputFormat::Text => write_computation_text(stdout, &computation)?,
    }
    Ok(())
}
