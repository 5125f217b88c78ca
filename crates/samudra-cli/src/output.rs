//! Output formatting for pipeline outcomes.

use std::io::{self, Write};

use clap::ValueEnum;
use serde::Serialize;

use samudra_lib::{Route, RouteComputation};

/// How command results are written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary.
    #[default]
    Text,
    /// Pretty-printed JSON document.
    Json,
}

/// Write `value` as pretty JSON followed by a newline.
pub fn write_json<W: Write, T: Serialize>(mut out: W, value: &T) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)
}

fn describe_route(route: &Route) -> String {
    let first = route.first();
    let last = route.last();
    format!(
        "{:<6} {:>5} waypoints  ({:.4}, {:.4}) -> ({:.4}, {:.4})",
        route.objective().to_string(),
        route.len(),
        first.lat,
        first.lon,
        last.lat,
        last.lon
    )
}

/// Render a route computation as a short text report.
pub fn write_computation_text<W: Write>(
    mut out: W,
    computation: &RouteComputation,
) -> io::Result<()> {
    writeln!(out, "Routes:")?;
    for route in [
        &computation.routes.fuel,
        &computation.routes.safe,
        &computation.routes.short,
    ] {
        writeln!(out, "  {}", describe_route(route))?;
    }

    match &computation.results {
        Some(table) => writeln!(out, "Results: {} rows", table.len())?,
        None => writeln!(out, "Results: unavailable")?,
    }

    writeln!(out, "Published {} artifacts:", computation.published.len())?;
    for name in &computation.published {
        writeln!(out, "  {name}")?;
    }
    Ok(())
}
