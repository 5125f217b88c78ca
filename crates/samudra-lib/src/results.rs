//! Conversion of the optimizer's headerless results table into row records.
//!
//! Each row becomes a JSON object keyed by column index (`"0"`, `"1"`, ...),
//! which is the shape downstream consumers already read.

use std::fs;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use serde::Serialize;
use serde_json::{Map, Number, Value};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// File name of the results table written by the optimizer.
pub const RESULTS_FILE_NAME: &str = "results.csv";

/// One row of the results table.
pub type ResultRecord = Map<String, Value>;

/// Ordered collection of result rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResultsTable {
    rows: Vec<ResultRecord>,
}

impl ResultsTable {
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = fs::File::open(path).map_err(|err| Error::filesystem("open", path, err))?;
        Self::from_reader(file)
    }

    /// Parse headerless CSV rows. Short rows are padded with `null` so the
    /// table stays rectangular.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let mut raw_rows = Vec::new();
        let mut width = 0;
        for record in csv_reader.records() {
            let record = record?;
            width = width.max(record.len());
            raw_rows.push(record.iter().map(cell_value).collect::<Vec<_>>());
        }

        let rows = raw_rows
            .into_iter()
            .map(|mut cells| {
                cells.resize(width, Value::Null);
                cells
                    .into_iter()
                    .enumerate()
                    .map(|(column, value)| (column.to_string(), value))
                    .collect::<ResultRecord>()
            })
            .collect();

        Ok(Self { rows })
    }

    /// Load the table, logging and returning `None` on any failure.
    pub fn load_lenient(path: &Path) -> Option<Self> {
        match Self::from_path(path) {
            Ok(table) => {
                debug!(path = %path.display(), rows = table.len(), "converted results table");
                Some(table)
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to convert results table");
                None
            }
        }
    }

    pub fn rows(&self) -> &[ResultRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn cell_value(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    if let Ok(int) = raw.parse::<i64>() {
        return Value::Number(int.into());
    }
    if let Some(number) = raw.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(number);
    }
    Value::String(raw.to_string())
}
