use tracing::info;

use super::{ExplorationContext, ExplorationOutcome, ExplorationStrategy};
use crate::analysis::sobol_indices;
use crate::config::StrategyOptions;
use crate::error::Result;
use crate::sampling::SaltelliPlan;

/// Variance-based sensitivity analysis on a Saltelli plan.
///
/// The plan is read from the configured sample file when it exists, and
/// generated (and written there) otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct SobolExploration;

impl SobolExploration {
    pub fn from_options(_options: &StrategyOptions) -> Result<Self> {
        Ok(Self)
    }
}

impl ExplorationStrategy for SobolExploration {
    fn name(&self) -> &'static str {
        "sobol"
    }

    fn is_fitness_based(&self) -> bool {
        false
    }

    fn explore(&mut self, ctx: &mut ExplorationContext<'_>) -> Result<ExplorationOutcome> {
        let sample_size = ctx.config.validate_for_sampling()?;
        let space = ctx.space;
        space.ensure_samplable()?;

        let rows = ctx.load_or_generate_sample(|rng| {
            Ok(SaltelliPlan::generate(space, sample_size, rng)?.rows().to_vec())
        })?;
        let plan = SaltelliPlan::from_rows(rows, sample_size, space.dimension())?;
        info!(
            sample_size,
            variables = space.dimension(),
            rows = plan.rows().len(),
            "Starting Sobol analysis"
        );

        let results = ctx.dispatch(plan.rows());
        let report = sobol_indices(&plan, &space.names(), &results, &ctx.config.outputs);

        ctx.export_results(ExplorationContext::ordered_results(plan.rows(), &results));
        let outcome = ExplorationOutcome::Sobol(report);
        ctx.write_report(&outcome.report_text());
        Ok(outcome)
    }
}
