// One module per subcommand; main.rs only parses arguments and dispatches.

pub mod compute;
pub mod reposition;
pub mod results;
pub mod smooth;

use std::fs;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

/// Read a JSON parameter document from `path`, or from stdin when `path` is `-`.
pub fn read_params<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read parameters from stdin")?;
        buf
    } else {
        fs::read_to_string(path)
            .with_context(|| format!("failed to read parameters from {}", path.display()))?
    };
    serde_json::from_str(&raw).context("parameters are not a valid JSON object")
}
