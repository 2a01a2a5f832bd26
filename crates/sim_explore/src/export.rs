//! Sample files, reports and result export.
//!
//! Strategies reach the file system only through the [`SampleStore`] trait.
//! [`CsvSampleStore`] is the default implementation; raw results and report
//! structures can additionally be exported to CSV and JSON.

use std::path::Path;

use serde::Serialize;

use crate::dispatcher::EvaluationResult;
use crate::error::{ExploreError, Result};
use crate::parameters::{CandidatePoint, ParameterSpace, Value};

#[path = "export/csv.rs"]
mod csv;
#[path = "export/json.rs"]
mod json;
#[path = "export/writer_utils.rs"]
mod writer_utils;

pub use self::csv::CsvSampleStore;

/// Sample matrix as stored on disk: a header of variable names and one row of
/// rendered values per candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleMatrix {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl SampleMatrix {
    /// Render candidates with columns in the space's declaration order.
    pub fn from_candidates(space: &ParameterSpace, candidates: &[CandidatePoint]) -> Self {
        let header = space.names();
        let rows = candidates
            .iter()
            .map(|candidate| {
                header
                    .iter()
                    .map(|name| {
                        candidate
                            .get(name)
                            .map(Value::to_string)
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect();
        Self { header, rows }
    }

    /// Parse rows back into candidates of `space`.
    ///
    /// Columns are matched by name, so a file may order them differently;
    /// every declared variable must have a column and every cell must parse
    /// as an admissible value.
    pub fn to_candidates(&self, space: &ParameterSpace) -> Result<Vec<CandidatePoint>> {
        let mut columns = Vec::with_capacity(space.dimension());
        for variable in space.variables() {
            let column = self
                .header
                .iter()
                .position(|h| h == variable.name())
                .ok_or_else(|| {
                    ExploreError::configuration(format!(
                        "sample file has no column for variable '{}'",
                        variable.name()
                    ))
                })?;
            columns.push((variable, column));
        }

        self.rows
            .iter()
            .enumerate()
            .map(|(line, row)| {
                let mut entries = Vec::with_capacity(columns.len());
                for (variable, column) in &columns {
                    let raw = row.get(*column).map(String::as_str).unwrap_or("");
                    let value = Value::parse_as(variable.kind(), raw)
                        .filter(|value| variable.contains(value))
                        .ok_or_else(|| {
                            ExploreError::configuration(format!(
                                "sample row {}: '{raw}' is not a valid value for '{}'",
                                line + 1,
                                variable.name()
                            ))
                        })?;
                    entries.push((variable.name().to_string(), value));
                }
                Ok(CandidatePoint::from_entries(entries))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// File-I/O collaborator for sample files and reports.
pub trait SampleStore: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    fn read_sample(&self, path: &Path) -> Result<SampleMatrix>;

    fn write_sample(&self, path: &Path, matrix: &SampleMatrix) -> Result<()>;

    fn write_report(&self, path: &Path, text: &str) -> Result<()>;
}

/// Export one line per replicate: input columns, the replicate index, then
/// one column per output. A failed candidate gets a single line with empty
/// outputs and its error in the `error` column.
///
/// # Arguments
///
/// * `space` - Declares the input columns and their order
/// * `outputs` - Output columns, in order
/// * `results` - Results to export, in row order
/// * `path` - Path to output CSV file
///
/// # Errors
///
/// Returns an error if there is nothing to export or file writing fails.
pub fn export_raw_results<'a, I>(
    space: &ParameterSpace,
    outputs: &[String],
    results: I,
    path: impl AsRef<Path>,
) -> Result<()>
where
    I: IntoIterator<Item = &'a EvaluationResult>,
{
    let results: Vec<&EvaluationResult> = results.into_iter().collect();
    writer_utils::ensure_not_empty(&results)?;
    let file = writer_utils::create_output_file(path)?;
    csv::export_raw_results_impl(space, outputs, &results, file)
}

/// Export any serialisable report or result set as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if file creation or JSON serialization fails.
pub fn export_to_json<T: Serialize + ?Sized>(value: &T, path: impl AsRef<Path>) -> Result<()> {
    let file = writer_utils::create_output_file(path)?;
    json::export_to_json_impl(value, file)
}
