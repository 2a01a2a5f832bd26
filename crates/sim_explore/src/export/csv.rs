use std::fs::File;
use std::path::Path;

use tracing::info;

use super::writer_utils::create_output_file;
use super::{SampleMatrix, SampleStore};
use crate::dispatcher::{EvaluationOutcome, EvaluationResult};
use crate::error::Result;
use crate::parameters::ParameterSpace;

/// [`SampleStore`] backed by CSV sample files and plain-text reports.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvSampleStore;

impl SampleStore for CsvSampleStore {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_sample(&self, path: &Path) -> Result<SampleMatrix> {
        // Text cells keep their surrounding spaces.
        let mut reader = csv::ReaderBuilder::new().from_path(path)?;
        let header: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
        let mut rows: Vec<Vec<String>> = Vec::new();
        for record in reader.records() {
            rows.push(record?.iter().map(str::to_string).collect());
        }
        Ok(SampleMatrix { header, rows })
    }

    fn write_sample(&self, path: &Path, matrix: &SampleMatrix) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(create_output_file(path)?);
        wtr.write_record(&matrix.header)?;
        for row in &matrix.rows {
            wtr.write_record(row)?;
        }
        wtr.flush()?;
        info!(path = %path.display(), rows = matrix.len(), "Wrote sample file");
        Ok(())
    }

    fn write_report(&self, path: &Path, text: &str) -> Result<()> {
        std::fs::write(path, text)?;
        info!(path = %path.display(), "Wrote report");
        Ok(())
    }
}

pub(crate) fn export_raw_results_impl(
    space: &ParameterSpace,
    outputs: &[String],
    results: &[&EvaluationResult],
    file: File,
) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(file);

    let mut header = space.names();
    header.push("replicate".to_string());
    header.extend(outputs.iter().cloned());
    header.push("error".to_string());
    wtr.write_record(&header)?;

    for result in results {
        let inputs: Vec<String> = space
            .variables()
            .iter()
            .map(|v| {
                result
                    .candidate
                    .get(v.name())
                    .map(ToString::to_string)
                    .unwrap_or_default()
            })
            .collect();

        match &result.outcome {
            EvaluationOutcome::Completed(values) => {
                let replicates = values.values().map(Vec::len).max().unwrap_or(0);
                for replicate in 0..replicates {
                    let mut record = inputs.clone();
                    record.push(replicate.to_string());
                    for output in outputs {
                        record.push(
                            values
                                .get(output)
                                .and_then(|v| v.get(replicate))
                                .map(ToString::to_string)
                                .unwrap_or_default(),
                        );
                    }
                    record.push(String::new());
                    wtr.write_record(&record)?;
                }
            }
            EvaluationOutcome::Failed(failure) => {
                let mut record = inputs;
                record.push(failure.replicate.to_string());
                record.extend(outputs.iter().map(|_| String::new()));
                record.push(failure.message.clone());
                wtr.write_record(&record)?;
            }
        }
    }

    wtr.flush()?;
    Ok(())
}
