//! Waypoints, routes, and the headerless CSV format the engines exchange.

use std::fmt;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A single latitude/longitude position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub lat: f64,
    pub lon: f64,
}

impl Waypoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Whether both coordinates lie within `tolerance` degrees of `other`.
    pub fn approx_eq(&self, other: &Waypoint, tolerance: f64) -> bool {
        (self.lat - other.lat).abs() <= tolerance && (self.lon - other.lon).abs() <= tolerance
    }

    fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }
}

/// Objective a route was optimized for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RouteObjective {
    /// Minimal fuel consumption.
    Fuel,
    /// Maximal safety.
    Safe,
    /// Shortest distance.
    Short,
    /// Numbered candidate produced by the multi-objective optimizer.
    Candidate(u32),
}

impl RouteObjective {
    /// The three routes produced by the pathfinding engine.
    pub const PRIMARY: [RouteObjective; 3] =
        [RouteObjective::Fuel, RouteObjective::Safe, RouteObjective::Short];

    /// File name of the raw route as written by the engine.
    pub fn raw_file_name(self) -> String {
        match self {
            RouteObjective::Candidate(index) => format!("path_{index}.csv"),
            other => format!("path_{}.csv", other.stem()),
        }
    }

    /// File name of the smoothed route.
    pub fn smoothed_file_name(self) -> String {
        match self {
            RouteObjective::Candidate(index) => format!("path_{index}_smoothed.csv"),
            other => format!("path_{}_smoothed.csv", other.stem()),
        }
    }

    /// Recognize an optimizer candidate file (`path_<i>_smoothed.csv`).
    pub fn from_candidate_file_name(name: &str) -> Option<RouteObjective> {
        let index = name
            .strip_prefix("path_")?
            .strip_suffix("_smoothed.csv")?
            .parse::<u32>()
            .ok()?;
        Some(RouteObjective::Candidate(index))
    }

    /// Recognize a raw engine route file (`path_fuel.csv`, `path_<i>.csv`).
    pub fn from_raw_file_name(name: &str) -> Option<RouteObjective> {
        if let Some(primary) = Self::PRIMARY
            .into_iter()
            .find(|objective| objective.raw_file_name() == name)
        {
            return Some(primary);
        }
        let index = name
            .strip_prefix("path_")?
            .strip_suffix(".csv")?
            .parse::<u32>()
            .ok()?;
        Some(RouteObjective::Candidate(index))
    }

    fn stem(self) -> &'static str {
        match self {
            RouteObjective::Fuel => "fuel",
            RouteObjective::Safe => "safe",
            RouteObjective::Short => "short",
            RouteObjective::Candidate(_) => "candidate",
        }
    }
}

impl fmt::Display for RouteObjective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteObjective::Candidate(index) => write!(f, "candidate-{index}"),
            other => f.write_str(other.stem()),
        }
    }
}

impl Serialize for RouteObjective {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Ordered, non-empty waypoint sequence tagged with its objective.
///
/// Consecutive duplicate waypoints are collapsed on construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    objective: RouteObjective,
    waypoints: Vec<Waypoint>,
}

impl Route {
    pub fn new(objective: RouteObjective, mut waypoints: Vec<Waypoint>) -> Result<Self> {
        if waypoints.is_empty() {
            return Err(Error::EmptyRoute {
                objective: objective.to_string(),
            });
        }
        waypoints.dedup();
        Ok(Self {
            objective,
            waypoints,
        })
    }

    pub fn objective(&self) -> RouteObjective {
        self.objective
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Never true: construction rejects empty waypoint lists.
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn first(&self) -> Waypoint {
        self.waypoints[0]
    }

    pub fn last(&self) -> Waypoint {
        self.waypoints[self.waypoints.len() - 1]
    }

    /// Whether the route starts at `start` and ends at `goal` within `tolerance` degrees.
    pub fn connects(&self, start: &Waypoint, goal: &Waypoint, tolerance: f64) -> bool {
        self.first().approx_eq(start, tolerance) && self.last().approx_eq(goal, tolerance)
    }

    /// Load a route from a headerless `lat,lon` CSV file.
    pub fn from_csv_path(objective: RouteObjective, path: &Path) -> Result<Self> {
        let file = fs::File::open(path).map_err(|err| Error::filesystem("open", path, err))?;
        Self::from_reader(objective, file).map_err(|err| match err {
            Error::RouteFormat { row, message, .. } => Error::RouteFormat {
                path: path.to_path_buf(),
                row,
                message,
            },
            other => other,
        })
    }

    /// Load a route from any reader producing headerless `lat,lon` rows.
    ///
    /// A single non-numeric first row is treated as a header and skipped.
    pub fn from_reader<R: Read>(objective: RouteObjective, reader: R) -> Result<Self> {
        let mut csv_reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let mut waypoints = Vec::new();
        for (row, record) in csv_reader.records().enumerate() {
            let record = record?;
            match parse_waypoint(&record) {
                Ok(point) => waypoints.push(point),
                Err(_) if row == 0 => continue,
                Err(message) => {
                    return Err(Error::RouteFormat {
                        path: Default::default(),
                        row: row + 1,
                        message,
                    })
                }
            }
        }

        Self::new(objective, waypoints)
    }

    /// Write the route as headerless `lat,lon` rows.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = WriterBuilder::new().has_headers(false).from_writer(writer);
        for point in &self.waypoints {
            csv_writer.write_record([point.lat.to_string(), point.lon.to_string()])?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Write the route to `path`, replacing any existing file.
    pub fn write_csv_path(&self, path: &Path) -> Result<()> {
        let file = fs::File::create(path).map_err(|err| Error::filesystem("create", path, err))?;
        self.write_to(file)
    }
}

fn parse_waypoint(record: &StringRecord) -> std::result::Result<Waypoint, String> {
    if record.len() < 2 {
        return Err(format!("expected 2 columns, found {}", record.len()));
    }
    let parse = |index: usize, label: &str| {
        record[index]
            .parse::<f64>()
            .map_err(|_| format!("{label} '{}' is not a number", &record[index]))
    };
    let point = Waypoint::new(parse(0, "latitude")?, parse(1, "longitude")?);
    if !point.is_finite() {
        return Err("coordinates must be finite".to_string());
    }
    Ok(point)
}
