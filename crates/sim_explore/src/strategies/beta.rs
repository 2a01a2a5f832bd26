use tracing::info;

use super::{ExplorationContext, ExplorationOutcome, ExplorationStrategy};
use crate::analysis::beta_indices;
use crate::config::StrategyOptions;
use crate::error::Result;

/// β^d moment-independent sensitivity on a Beta-distributed sample.
///
/// `alpha = beta = 1` gives a uniform sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BetaExploration {
    alpha: f64,
    beta: f64,
}

impl BetaExploration {
    pub fn new(alpha: f64, beta: f64) -> Self {
        Self { alpha, beta }
    }

    /// Options: `alpha`, `beta` (both default 1).
    pub fn from_options(options: &StrategyOptions) -> Result<Self> {
        Ok(Self::new(
            options.f64_or("alpha", 1.0)?,
            options.f64_or("beta", 1.0)?,
        ))
    }
}

impl Default for BetaExploration {
    fn default() -> Self {
        Self::new(1.0, 1.0)
    }
}

impl ExplorationStrategy for BetaExploration {
    fn name(&self) -> &'static str {
        "beta"
    }

    fn is_fitness_based(&self) -> bool {
        false
    }

    fn explore(&mut self, ctx: &mut ExplorationContext<'_>) -> Result<ExplorationOutcome> {
        let sample_size = ctx.config.validate_for_sampling()?;
        let space = ctx.space;
        space.ensure_samplable()?;
        let (alpha, beta) = (self.alpha, self.beta);

        let rows = ctx.load_or_generate_sample(|rng| {
            Ok(space
                .beta_unit_matrix(sample_size, alpha, beta, rng)?
                .iter()
                .map(|row| space.from_unit_row(row))
                .collect())
        })?;
        info!(rows = rows.len(), alpha, beta, "Starting beta analysis");

        let results = ctx.dispatch(&rows);
        let report = beta_indices(space, &rows, &results, &ctx.config.outputs);

        ctx.export_results(ExplorationContext::ordered_results(&rows, &results));
        let outcome = ExplorationOutcome::Beta(report);
        ctx.write_report(&outcome.report_text());
        Ok(outcome)
    }
}
