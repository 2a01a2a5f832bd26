//! Post-processing of evaluation results.
//!
//! Sensitivity estimators consume a sample plan together with the dispatcher's
//! result map; failed or missing evaluations are skipped per estimate and
//! counted. The outranking decision works on plain criterion vectors.

use crate::dispatcher::ResultMap;
use crate::parameters::CandidatePoint;

#[path = "analysis/beta_kuiper.rs"]
mod beta_kuiper;
#[path = "analysis/electre.rs"]
mod electre;
#[path = "analysis/morris_effects.rs"]
mod morris_effects;
#[path = "analysis/sobol_indices.rs"]
mod sobol_indices;
#[path = "analysis/stochasticity.rs"]
mod stochasticity;

pub use beta_kuiper::{beta_indices, BetaOutputReport, BetaReport};
pub use electre::{Alternative, Criterion, Electre, Relation};
pub use morris_effects::{morris_effects, ElementaryEffects, MorrisOutputReport, MorrisReport};
pub use sobol_indices::{sobol_indices, SobolIndex, SobolOutputReport, SobolReport};
pub use stochasticity::{
    stochasticity, OutputStochasticity, StochasticityReport, ThresholdSummary,
    STOCHASTICITY_THRESHOLDS,
};

/// Mean of `output` for `candidate`, if it was evaluated successfully.
pub(crate) fn lookup(results: &ResultMap, candidate: &CandidatePoint, output: &str) -> Option<f64> {
    results.get(candidate)?.value(output)
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance.
pub(crate) fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (`n - 1` denominator); zero below two values.
pub(crate) fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let sum: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (sum / (values.len() - 1) as f64).sqrt()
}
