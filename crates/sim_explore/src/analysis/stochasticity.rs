use std::fmt;

use serde::Serialize;
use tracing::warn;

use super::{mean, sample_std};
use crate::dispatcher::ResultMap;
use crate::parameters::CandidatePoint;

/// Relative-change thresholds for which the required replicate count is
/// reported.
pub const STOCHASTICITY_THRESHOLDS: [f64; 3] = [0.05, 0.01, 0.001];

/// Replicates needed for the running mean to stabilise below one threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdSummary {
    pub threshold: f64,
    pub min_replicates: usize,
    pub max_replicates: usize,
    pub mean_replicates: f64,
    /// Points whose running mean never stabilised within the replicates run.
    pub not_reached: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputStochasticity {
    pub output: String,
    pub points: usize,
    pub skipped_points: usize,
    /// Mean over points of the coefficient of variation across replicates.
    pub mean_cv: f64,
    /// Mean over points of the standard error of the replicate mean.
    pub mean_standard_error: f64,
    pub thresholds: Vec<ThresholdSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StochasticityReport {
    pub replicates: usize,
    pub outputs: Vec<OutputStochasticity>,
}

impl StochasticityReport {
    pub fn output(&self, output: &str) -> Option<&OutputStochasticity> {
        self.outputs.iter().find(|report| report.output == output)
    }
}

impl fmt::Display for StochasticityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "STOCHASTICITY ANALYSIS ({} replicates)", self.replicates)?;
        for report in &self.outputs {
            writeln!(f)?;
            writeln!(f, "Output: {}", report.output)?;
            writeln!(
                f,
                "  points: {} (skipped {})",
                report.points, report.skipped_points
            )?;
            writeln!(f, "  mean coefficient of variation: {:.6}", report.mean_cv)?;
            writeln!(f, "  mean standard error: {:.6}", report.mean_standard_error)?;
            for t in &report.thresholds {
                writeln!(
                    f,
                    "  threshold {}: min {} / max {} / mean {:.2} replicates ({} not reached)",
                    t.threshold, t.min_replicates, t.max_replicates, t.mean_replicates, t.not_reached
                )?;
            }
        }
        Ok(())
    }
}

/// Smallest replicate count from which every further replicate changes the
/// running mean by less than `threshold` (relative). `None` if the last
/// change is still above it.
fn replicates_to_stabilise(values: &[f64], threshold: f64) -> Option<usize> {
    if values.len() < 2 {
        return None;
    }
    let mut running = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, v) in values.iter().enumerate() {
        sum += v;
        running.push(sum / (i + 1) as f64);
    }
    let change = |r: usize| {
        let (previous, current) = (running[r - 1], running[r]);
        let delta = (current - previous).abs();
        if previous.abs() > f64::EPSILON {
            delta / previous.abs()
        } else {
            delta
        }
    };
    let mut needed = None;
    for r in (1..running.len()).rev() {
        if change(r) < threshold {
            needed = Some(r);
        } else {
            break;
        }
    }
    needed
}

/// Replicate-variance analysis of every point of `rows`.
pub fn stochasticity(
    rows: &[CandidatePoint],
    results: &ResultMap,
    outputs: &[String],
    replicates: usize,
) -> StochasticityReport {
    let mut report = StochasticityReport {
        replicates,
        outputs: Vec::with_capacity(outputs.len()),
    };
    for output in outputs {
        let series: Vec<&[f64]> = rows
            .iter()
            .filter_map(|row| results.get(row)?.values(output))
            .filter(|values| !values.is_empty())
            .collect();
        let skipped_points = rows.len() - series.len();
        if skipped_points > 0 {
            warn!(output = %output, skipped_points, "Stochasticity computed from partial results");
        }

        let cvs: Vec<f64> = series
            .iter()
            .filter_map(|values| {
                let m = mean(values);
                (m.abs() > f64::EPSILON).then(|| sample_std(values) / m.abs())
            })
            .collect();
        let errors: Vec<f64> = series
            .iter()
            .map(|values| sample_std(values) / (values.len() as f64).sqrt())
            .collect();

        let thresholds = STOCHASTICITY_THRESHOLDS
            .iter()
            .map(|&threshold| {
                let needed: Vec<Option<usize>> = series
                    .iter()
                    .map(|values| replicates_to_stabilise(values, threshold))
                    .collect();
                let reached: Vec<usize> = needed.iter().flatten().copied().collect();
                ThresholdSummary {
                    threshold,
                    min_replicates: reached.iter().copied().min().unwrap_or(0),
                    max_replicates: reached.iter().copied().max().unwrap_or(0),
                    mean_replicates: if reached.is_empty() {
                        0.0
                    } else {
                        reached.iter().sum::<usize>() as f64 / reached.len() as f64
                    },
                    not_reached: needed.len() - reached.len(),
                }
            })
            .collect();

        report.outputs.push(OutputStochasticity {
            output: output.clone(),
            points: series.len(),
            skipped_points,
            mean_cv: mean(&cvs),
            mean_standard_error: mean(&errors),
            thresholds,
        });
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::{EvaluationOutcome, EvaluationResult};
    use std::collections::{BTreeMap, HashMap};

    #[test]
    fn test_constant_series_stabilises_immediately() {
        assert_eq!(replicates_to_stabilise(&[5.0, 5.0, 5.0, 5.0], 0.01), Some(1));
        assert_eq!(replicates_to_stabilise(&[5.0], 0.01), None);
    }

    #[test]
    fn test_late_jump_delays_stabilisation() {
        // Running means: 1, 1, 1, 2.5, 2.2
        let values = [1.0, 1.0, 1.0, 7.0, 1.0];
        assert_eq!(replicates_to_stabilise(&values, 0.1), None);
        assert_eq!(replicates_to_stabilise(&values, 0.5), Some(4));
        assert_eq!(replicates_to_stabilise(&values, 2.0), Some(1));
    }

    #[test]
    fn test_report_counts_points_and_failures() {
        let ok = CandidatePoint::new().set("x", 1i64);
        let missing = CandidatePoint::new().set("x", 2i64);
        let mut results = HashMap::new();
        results.insert(
            ok.clone(),
            EvaluationResult {
                candidate: ok.clone(),
                outcome: EvaluationOutcome::Completed(BTreeMap::from([(
                    "y".to_string(),
                    vec![10.0, 10.0, 10.0, 10.0],
                )])),
            },
        );

        let report = stochasticity(&[ok, missing], &results, &["y".to_string()], 4);
        let y = report.output("y").unwrap();

        assert_eq!(y.points, 1);
        assert_eq!(y.skipped_points, 1);
        assert_eq!(y.mean_cv, 0.0);
        assert_eq!(y.thresholds.len(), 3);
        assert!(y.thresholds.iter().all(|t| t.max_replicates == 1));
    }
}
