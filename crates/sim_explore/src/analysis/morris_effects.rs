use std::fmt;

use serde::Serialize;
use tracing::warn;

use super::{lookup, mean, sample_std};
use crate::dispatcher::ResultMap;
use crate::sampling::MorrisPlan;

/// Elementary-effect statistics of one variable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ElementaryEffects {
    /// Mean effect.
    pub mu: f64,
    /// Mean absolute effect.
    pub mu_star: f64,
    /// Sample standard deviation of the effects.
    pub sigma: f64,
    /// Number of effects the statistics were computed from.
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MorrisOutputReport {
    pub output: String,
    pub effects: Vec<(String, ElementaryEffects)>,
    /// Trajectory steps dropped because an endpoint had no result.
    pub skipped_steps: usize,
}

impl MorrisOutputReport {
    pub fn effects_of(&self, variable: &str) -> Option<ElementaryEffects> {
        self.effects
            .iter()
            .find(|(name, _)| name == variable)
            .map(|(_, effects)| *effects)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MorrisReport {
    pub outputs: Vec<MorrisOutputReport>,
}

impl MorrisReport {
    pub fn output(&self, output: &str) -> Option<&MorrisOutputReport> {
        self.outputs.iter().find(|report| report.output == output)
    }
}

impl fmt::Display for MorrisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "MORRIS ANALYSIS")?;
        for report in &self.outputs {
            writeln!(f)?;
            writeln!(f, "Output: {}", report.output)?;
            if report.skipped_steps > 0 {
                writeln!(f, "  partial: {} step(s) skipped", report.skipped_steps)?;
            }
            writeln!(
                f,
                "  {:<24} {:>12} {:>12} {:>12}",
                "variable", "mu", "mu*", "sigma"
            )?;
            for (name, e) in &report.effects {
                writeln!(
                    f,
                    "  {:<24} {:>12.6} {:>12.6} {:>12.6}",
                    name, e.mu, e.mu_star, e.sigma
                )?;
            }
        }
        Ok(())
    }
}

/// Elementary effects `(f(x + delta e_i) - f(x)) / delta` aggregated per
/// variable into mu, mu* and sigma.
pub fn morris_effects(
    plan: &MorrisPlan,
    variables: &[String],
    results: &ResultMap,
    outputs: &[String],
) -> MorrisReport {
    let mut report = MorrisReport::default();
    for output in outputs {
        let mut per_variable: Vec<Vec<f64>> = vec![Vec::new(); variables.len()];
        let mut skipped_steps = 0;
        for trajectory in plan.trajectories() {
            for (s, step) in trajectory.steps.iter().enumerate() {
                let before = &plan.rows()[trajectory.start + s];
                let after = &plan.rows()[trajectory.start + s + 1];
                match (
                    lookup(results, before, output),
                    lookup(results, after, output),
                ) {
                    (Some(y0), Some(y1)) if step.delta != 0.0 => {
                        if let Some(effects) = per_variable.get_mut(step.variable) {
                            effects.push((y1 - y0) / step.delta);
                        }
                    }
                    _ => skipped_steps += 1,
                }
            }
        }

        if skipped_steps > 0 {
            warn!(output = %output, skipped_steps, "Morris effects computed from partial results");
        }
        let effects = variables
            .iter()
            .zip(per_variable)
            .map(|(name, effects)| {
                let absolute: Vec<f64> = effects.iter().map(|e| e.abs()).collect();
                (
                    name.clone(),
                    ElementaryEffects {
                        mu: mean(&effects),
                        mu_star: mean(&absolute),
                        sigma: sample_std(&effects),
                        count: effects.len(),
                    },
                )
            })
            .collect();
        report.outputs.push(MorrisOutputReport {
            output: output.clone(),
            effects,
            skipped_steps,
        });
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExecutionMode;
    use crate::dispatcher::{Dispatcher, Outputs};
    use crate::parameters::{CandidatePoint, ParameterSpace, Value, VariableDescriptor};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    #[test]
    fn test_linear_effects_are_slopes() {
        let mut space = ParameterSpace::new();
        space.declare(VariableDescriptor::float("a", 0.0, 1.0)).unwrap();
        space.declare(VariableDescriptor::float("b", 0.0, 1.0)).unwrap();
        space.declare(VariableDescriptor::float("c", 0.0, 1.0)).unwrap();
        let model = |c: &CandidatePoint, _: u64| -> Result<Outputs, String> {
            let x = |n: &str| c.get(n).and_then(Value::as_f64).unwrap_or(0.0);
            Ok(Outputs::from([("y".to_string(), 3.0 * x("a") - x("b"))]))
        };
        let mut rng = StdRng::seed_from_u64(9);
        let plan = MorrisPlan::generate(&space, 4, 10, &mut rng).unwrap();
        let dispatcher = Dispatcher::new(Arc::new(model), ExecutionMode::Sequential).unwrap();
        let results = dispatcher.evaluate(plan.rows());

        let report = morris_effects(&plan, &space.names(), &results, &["y".to_string()]);
        let y = report.output("y").unwrap();

        let a = y.effects_of("a").unwrap();
        let b = y.effects_of("b").unwrap();
        let c = y.effects_of("c").unwrap();
        assert!((a.mu - 3.0).abs() < 1e-9 && (a.mu_star - 3.0).abs() < 1e-9);
        assert!(a.sigma < 1e-9);
        assert!((b.mu + 1.0).abs() < 1e-9 && (b.mu_star - 1.0).abs() < 1e-9);
        assert!(c.mu_star.abs() < 1e-12);
        assert_eq!(a.count, 10);
        assert_eq!(y.skipped_steps, 0);
    }
}
