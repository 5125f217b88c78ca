//! `reposition` subcommand: rerun the optimizer in repositioning mode.

use std::path::Path;

use anyhow::{Context, Result};

use samudra_lib::{PipelineConfig, PipelineOrchestrator, RepositionParameters};

use crate::commands::read_params;
use crate::output::{write_json, OutputFormat};

pub fn handle_reposition(
    config: &PipelineConfig,
    params: &Path,
    format: OutputFormat,
) -> Result<()> {
    let params: RepositionParameters = read_params(params)?;
    let orchestrator =
        PipelineOrchestrator::from_config(config).context("failed to configure the pipeline")?;

    let ack = orchestrator
        .reposition(&params)
        .context("reposition failed")?;

    match format {
        OutputFormat::Json => write_json(std::io::stdout().lock(), &ack)?,
        OutputFormat::Text => println!("{}", ack.message),
    }
    Ok(())
}
