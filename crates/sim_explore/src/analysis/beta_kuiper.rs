use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use tracing::warn;

use super::lookup;
use crate::dispatcher::ResultMap;
use crate::parameters::{CandidatePoint, Domain, ParameterSpace, Value};

/// Number of equal-width unit-space classes used to condition on a
/// continuous variable.
const CONDITIONING_CLASSES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BetaOutputReport {
    pub output: String,
    /// Kuiper-distance index per variable, in declaration order.
    pub indices: Vec<(String, f64)>,
    pub skipped_rows: usize,
}

impl BetaOutputReport {
    pub fn index(&self, variable: &str) -> Option<f64> {
        self.indices
            .iter()
            .find(|(name, _)| name == variable)
            .map(|(_, index)| *index)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BetaReport {
    pub outputs: Vec<BetaOutputReport>,
}

impl BetaReport {
    pub fn output(&self, output: &str) -> Option<&BetaOutputReport> {
        self.outputs.iter().find(|report| report.output == output)
    }
}

impl fmt::Display for BetaReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BETA^KU DENSITY-BASED SENSITIVITY")?;
        for report in &self.outputs {
            writeln!(f)?;
            writeln!(f, "Output: {}", report.output)?;
            if report.skipped_rows > 0 {
                writeln!(f, "  partial: {} row(s) skipped", report.skipped_rows)?;
            }
            for (name, index) in &report.indices {
                writeln!(f, "  {name:<24} {index:>12.6}")?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Class {
    Bin(usize),
    Exact(Value),
}

fn class_of(space: &ParameterSpace, variable: usize, candidate: &CandidatePoint) -> Option<Class> {
    let descriptor = &space.variables()[variable];
    let value = candidate.get(descriptor.name())?;
    match descriptor.domain() {
        Domain::Boolean | Domain::Among(_) => Some(Class::Exact(value.clone())),
        Domain::Point { min, max, .. } => {
            let Value::Point(p) = value else {
                return None;
            };
            // Condition on the first axis with a non-empty range.
            let axis = (0..3).find(|&a| max[a] > min[a])?;
            let u = (p[axis] - min[axis]) / (max[axis] - min[axis]);
            Some(Class::Bin(bin(u)))
        }
        _ => descriptor.to_unit(value).map(|u| Class::Bin(bin(u))),
    }
}

fn bin(u: f64) -> usize {
    ((u * CONDITIONING_CLASSES as f64).floor() as usize).min(CONDITIONING_CLASSES - 1)
}

/// Kuiper distance `sup(Fc - F) + sup(F - Fc)` between the empirical CDF of
/// `subset` and that of `sorted` (which must contain `subset`).
fn kuiper_distance(sorted: &[f64], subset: &mut [f64]) -> f64 {
    subset.sort_by(f64::total_cmp);
    let n = sorted.len() as f64;
    let m = subset.len() as f64;
    let (mut above, mut below) = (0.0_f64, 0.0_f64);
    let (mut i, mut j) = (0, 0);
    while i < sorted.len() {
        let y = sorted[i];
        while i < sorted.len() && sorted[i] <= y {
            i += 1;
        }
        while j < subset.len() && subset[j] <= y {
            j += 1;
        }
        let diff = j as f64 / m - i as f64 / n;
        above = above.max(diff);
        below = below.max(-diff);
    }
    above + below
}

/// β^Ku density-based sensitivity indices.
///
/// For each variable the rows are grouped by conditioning class (unit-space
/// bins for ordered domains, exact values for booleans and enumerations); the
/// index is the mean Kuiper distance between each group's output
/// distribution and the unconditional one.
pub fn beta_indices(
    space: &ParameterSpace,
    rows: &[CandidatePoint],
    results: &ResultMap,
    outputs: &[String],
) -> BetaReport {
    let mut report = BetaReport::default();
    for output in outputs {
        let observed: Vec<(&CandidatePoint, f64)> = rows
            .iter()
            .filter_map(|row| lookup(results, row, output).map(|y| (row, y)))
            .collect();
        let skipped_rows = rows.len() - observed.len();
        if skipped_rows > 0 {
            warn!(output = %output, skipped_rows, "Beta indices computed from partial results");
        }

        let mut sorted: Vec<f64> = observed.iter().map(|(_, y)| *y).collect();
        sorted.sort_by(f64::total_cmp);

        let indices = space
            .variables()
            .iter()
            .enumerate()
            .map(|(i, descriptor)| {
                let mut groups: HashMap<Class, Vec<f64>> = HashMap::new();
                for (row, y) in &observed {
                    if let Some(class) = class_of(space, i, row) {
                        groups.entry(class).or_default().push(*y);
                    }
                }
                let index = if groups.is_empty() || sorted.is_empty() {
                    0.0
                } else {
                    let total: f64 = groups
                        .values_mut()
                        .map(|group| kuiper_distance(&sorted, group))
                        .sum();
                    total / groups.len() as f64
                };
                (descriptor.name().to_string(), index)
            })
            .collect();

        report.outputs.push(BetaOutputReport {
            output: output.clone(),
            indices,
            skipped_rows,
        });
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExecutionMode;
    use crate::dispatcher::{Dispatcher, Outputs};
    use crate::parameters::VariableDescriptor;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    #[test]
    fn test_kuiper_distance_of_identical_samples_is_zero() {
        let sorted = vec![1.0, 2.0, 3.0, 4.0];
        let mut same = sorted.clone();
        assert!(kuiper_distance(&sorted, &mut same).abs() < 1e-12);

        let mut low = vec![1.0, 2.0];
        assert!((kuiper_distance(&sorted, &mut low) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_influential_variable_ranks_first() {
        let mut space = ParameterSpace::new();
        space.declare(VariableDescriptor::float("driver", 0.0, 1.0)).unwrap();
        space.declare(VariableDescriptor::float("noise", 0.0, 1.0)).unwrap();
        space.declare(VariableDescriptor::boolean("switch")).unwrap();
        let model = |c: &CandidatePoint, _: u64| -> Result<Outputs, String> {
            let driver = c.get("driver").and_then(Value::as_f64).unwrap_or(0.0);
            let noise = c.get("noise").and_then(Value::as_f64).unwrap_or(0.0);
            Ok(Outputs::from([("y".to_string(), 10.0 * driver + 0.1 * noise)]))
        };
        let mut rng = StdRng::seed_from_u64(4);
        let rows = space.sample_uniform(2000, &mut rng).unwrap();
        let dispatcher = Dispatcher::new(Arc::new(model), ExecutionMode::Sequential).unwrap();
        let results = dispatcher.evaluate(&rows);

        let report = beta_indices(&space, &rows, &results, &["y".to_string()]);
        let y = report.output("y").unwrap();

        let driver = y.index("driver").unwrap();
        let noise = y.index("noise").unwrap();
        let switch = y.index("switch").unwrap();
        assert!(driver > 0.8, "driver index {driver}");
        assert!(noise < 0.2, "noise index {noise}");
        assert!(switch < 0.2, "switch index {switch}");
        assert_eq!(y.skipped_rows, 0);
    }
}
