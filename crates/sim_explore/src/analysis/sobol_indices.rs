use std::fmt;

use serde::Serialize;
use tracing::warn;

use super::{lookup, variance};
use crate::dispatcher::ResultMap;
use crate::parameters::CandidatePoint;
use crate::sampling::SaltelliPlan;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SobolIndex {
    pub first_order: f64,
    pub total_order: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SobolOutputReport {
    pub output: String,
    /// Indices per variable, in declaration order.
    pub indices: Vec<(String, SobolIndex)>,
    /// Variance of the output over the `A` and `B` rows.
    pub variance: f64,
    /// Plan rows without a usable value for this output.
    pub skipped_rows: usize,
}

impl SobolOutputReport {
    pub fn index(&self, variable: &str) -> Option<SobolIndex> {
        self.indices
            .iter()
            .find(|(name, _)| name == variable)
            .map(|(_, index)| *index)
    }

    pub fn is_partial(&self) -> bool {
        self.skipped_rows > 0
    }
}

/// Output name to per-variable first- and total-order indices.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SobolReport {
    pub outputs: Vec<SobolOutputReport>,
}

impl SobolReport {
    pub fn output(&self, output: &str) -> Option<&SobolOutputReport> {
        self.outputs.iter().find(|report| report.output == output)
    }
}

impl fmt::Display for SobolReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SOBOL ANALYSIS")?;
        for report in &self.outputs {
            writeln!(f)?;
            writeln!(f, "Output: {}", report.output)?;
            if report.is_partial() {
                writeln!(
                    f,
                    "  partial: {} row(s) without a result were skipped",
                    report.skipped_rows
                )?;
            }
            writeln!(f, "  {:<24} {:>12} {:>12}", "variable", "first", "total")?;
            for (name, index) in &report.indices {
                writeln!(
                    f,
                    "  {:<24} {:>12.6} {:>12.6}",
                    name, index.first_order, index.total_order
                )?;
            }
        }
        Ok(())
    }
}

/// First- and total-order Sobol indices from a Saltelli plan.
///
/// First order: `mean(f(B) * (f(A_Bi) - f(A))) / V`.
/// Total order: `mean((f(B) - f(B_Ai))^2) / (2V)`.
/// `V` is the variance of the outputs of `A` and `B`. Each estimate averages
/// over the base rows whose required values are all present.
pub fn sobol_indices(
    plan: &SaltelliPlan,
    variables: &[String],
    results: &ResultMap,
    outputs: &[String],
) -> SobolReport {
    let n = plan.sample_size();
    let k = plan.dimension();
    let mut report = SobolReport::default();

    for output in outputs {
        let value = |candidate: &CandidatePoint| lookup(results, candidate, output);
        let skipped_rows = plan
            .rows()
            .iter()
            .filter(|&row| value(row).is_none())
            .count();

        let f_a: Vec<Option<f64>> = (0..n).map(|j| value(plan.a(j))).collect();
        let f_b: Vec<Option<f64>> = (0..n).map(|j| value(plan.b(j))).collect();
        let base: Vec<f64> = f_a.iter().chain(f_b.iter()).flatten().copied().collect();
        let total_variance = variance(&base);

        let mut indices = Vec::with_capacity(k);
        for (i, name) in variables.iter().enumerate().take(k) {
            let mut first_terms = Vec::with_capacity(n);
            let mut total_terms = Vec::with_capacity(n);
            for j in 0..n {
                if let (Some(a), Some(b), Some(ab)) = (f_a[j], f_b[j], value(plan.a_b(i, j))) {
                    first_terms.push(b * (ab - a));
                }
                if let (Some(b), Some(ba)) = (f_b[j], value(plan.b_a(i, j))) {
                    total_terms.push((b - ba).powi(2));
                }
            }
            let index = if total_variance > 0.0 {
                SobolIndex {
                    first_order: average(&first_terms) / total_variance,
                    total_order: average(&total_terms) / (2.0 * total_variance),
                }
            } else {
                SobolIndex {
                    first_order: 0.0,
                    total_order: 0.0,
                }
            };
            indices.push((name.clone(), index));
        }

        if skipped_rows > 0 {
            warn!(output = %output, skipped_rows, "Sobol indices computed from partial results");
        }
        report.outputs.push(SobolOutputReport {
            output: output.clone(),
            indices,
            variance: total_variance,
            skipped_rows,
        });
    }
    report
}

fn average(terms: &[f64]) -> f64 {
    if terms.is_empty() {
        0.0
    } else {
        terms.iter().sum::<f64>() / terms.len() as f64
    }
}
