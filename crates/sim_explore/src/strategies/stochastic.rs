use tracing::info;

use super::{ExplorationContext, ExplorationOutcome, ExplorationStrategy, SamplingMethod};
use crate::analysis::stochasticity;
use crate::config::StrategyOptions;
use crate::error::{ExploreError, Result};

/// Replicate-count analysis.
///
/// Every point of the plan is run `replicates` times; the report tells how
/// many replicates each output needs before its running mean settles.
#[derive(Debug, Clone, Copy)]
pub struct StochasticAnalysis {
    method: SamplingMethod,
    replicates: usize,
}

impl StochasticAnalysis {
    pub fn new(method: SamplingMethod, replicates: usize) -> Self {
        Self { method, replicates }
    }

    /// Options: `method` (default `latin`), `replicates` (default 10, at least 2).
    pub fn from_options(options: &StrategyOptions) -> Result<Self> {
        let replicates = options.usize_or("replicates", 10)?;
        if replicates < 2 {
            return Err(ExploreError::configuration(
                "stochasticity analysis needs at least 2 replicates",
            ));
        }
        Ok(Self::new(
            SamplingMethod::parse(options.str_or("method", "latin")?)?,
            replicates,
        ))
    }
}

impl Default for StochasticAnalysis {
    fn default() -> Self {
        Self::new(SamplingMethod::Latin, 10)
    }
}

impl ExplorationStrategy for StochasticAnalysis {
    fn name(&self) -> &'static str {
        "stochanalysis"
    }

    fn is_fitness_based(&self) -> bool {
        false
    }

    fn explore(&mut self, ctx: &mut ExplorationContext<'_>) -> Result<ExplorationOutcome> {
        ctx.config.validate()?;
        if ctx.config.outputs.is_empty() {
            return Err(ExploreError::configuration(
                "at least one output must be declared",
            ));
        }
        let (method, replicates) = (self.method, self.replicates.max(2));
        let space = ctx.space;
        let sample_size = ctx.config.sample_size;

        let rows = ctx.load_or_generate_sample(|rng| method.plan(space, sample_size, rng))?;
        info!(points = rows.len(), replicates, "Starting stochasticity analysis");

        let results = ctx.dispatch_replicated(&rows, replicates);
        let report = stochasticity(&rows, &results, &ctx.config.outputs, replicates);

        ctx.export_results(ExplorationContext::ordered_results(&rows, &results));
        let outcome = ExplorationOutcome::Stochasticity(report);
        ctx.write_report(&outcome.report_text());
        Ok(outcome)
    }
}
