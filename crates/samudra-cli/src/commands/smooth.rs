//! `smooth` subcommand: run the smoothing filter over a single route file.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use samudra_lib::{smooth_route_file, RouteObjective, SmoothingParams};

/// Parse `fuel`, `safe`, `short` or `candidate-<i>` as printed by `Display`.
pub fn parse_objective(value: &str) -> std::result::Result<RouteObjective, String> {
    if let Some(objective) = RouteObjective::PRIMARY
        .into_iter()
        .find(|objective| objective.to_string() == value)
    {
        return Ok(objective);
    }
    value
        .strip_prefix("candidate-")
        .and_then(|index| index.parse::<u32>().ok())
        .map(RouteObjective::Candidate)
        .ok_or_else(|| {
            format!("unknown objective `{value}`; expected fuel, safe, short or candidate-<i>")
        })
}

/// The explicit objective, else the one implied by the engine file name.
fn objective_for(input: &Path, explicit: Option<RouteObjective>) -> Result<RouteObjective> {
    if let Some(objective) = explicit {
        return Ok(objective);
    }
    input
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(RouteObjective::from_raw_file_name)
        .ok_or_else(|| {
            anyhow!(
                "cannot infer the route objective from {}; pass --objective",
                input.display()
            )
        })
}

/// `path_fuel.csv` becomes `path_fuel_smoothed.csv` next to the input.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "route".to_string());
    input.with_file_name(format!("{stem}_smoothed.csv"))
}

pub fn handle_smooth(
    input: &Path,
    output: Option<&Path>,
    objective: Option<RouteObjective>,
    epsilon: f64,
    window_size: usize,
) -> Result<()> {
    let params = SmoothingParams::new(epsilon, window_size)?;
    let objective = objective_for(input, objective)?;
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output_path(input));

    let route = smooth_route_file(input, &output, objective, &params)
        .with_context(|| format!("failed to smooth {}", input.display()))?;

    println!(
        "Wrote {} waypoints to {}",
        route.len(),
        output.display()
    );
    Ok(())
}
