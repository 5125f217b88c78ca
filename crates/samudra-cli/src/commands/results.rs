//! `results` subcommand: convert a headerless results table to JSON.

use std::path::Path;

use anyhow::{Context, Result};

use samudra_lib::ResultsTable;

use crate::output::write_json;

pub fn handle_results(path: &Path) -> Result<()> {
    let table = ResultsTable::from_path(path)
        .with_context(|| format!("failed to convert results table {}", path.display()))?;
    write_json(std::io::stdout().lock(), &table)?;
    Ok(())
}
