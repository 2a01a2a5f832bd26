use tracing::info;

use super::{ExplorationContext, ExplorationOutcome, ExplorationStrategy};
use crate::analysis::morris_effects;
use crate::config::StrategyOptions;
use crate::error::{ExploreError, Result};
use crate::sampling::MorrisPlan;

/// Morris elementary-effects screening.
///
/// The number of trajectories comes from the `trajectories` option, falling
/// back to the configured sample size.
#[derive(Debug, Clone, Copy)]
pub struct MorrisExploration {
    levels: usize,
    trajectories: Option<usize>,
}

impl MorrisExploration {
    pub fn new(levels: usize) -> Self {
        Self {
            levels,
            trajectories: None,
        }
    }

    /// Options: `levels` (even, default 4), `trajectories`.
    pub fn from_options(options: &StrategyOptions) -> Result<Self> {
        let trajectories = options
            .contains("trajectories")
            .then(|| options.usize_or("trajectories", 0))
            .transpose()?;
        Ok(Self {
            levels: options.usize_or("levels", 4)?,
            trajectories,
        })
    }

    pub fn trajectories(mut self, trajectories: usize) -> Self {
        self.trajectories = Some(trajectories);
        self
    }
}

impl Default for MorrisExploration {
    fn default() -> Self {
        Self::new(4)
    }
}

impl ExplorationStrategy for MorrisExploration {
    fn name(&self) -> &'static str {
        "morris"
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
        let trajectories = match self.trajectories.or(ctx.config.sample_size) {
            Some(n) if n > 0 => n,
            _ => {
                return Err(ExploreError::configuration(
                    "morris needs a positive number of trajectories",
                ))
            }
        };
        let levels = self.levels;
        let space = ctx.space;
        space.ensure_samplable()?;

        let rows = ctx.load_or_generate_sample(|rng| {
            Ok(MorrisPlan::generate(space, levels, trajectories, rng)?.rows().to_vec())
        })?;
        let plan = MorrisPlan::from_rows(space, rows, levels, trajectories)?;
        info!(levels, trajectories, rows = plan.rows().len(), "Starting Morris screening");

        let results = ctx.dispatch(plan.rows());
        let report = morris_effects(&plan, &space.names(), &results, &ctx.config.outputs);

        ctx.export_results(ExplorationContext::ordered_results(plan.rows(), &results));
        let outcome = ExplorationOutcome::Morris(report);
        ctx.write_report(&outcome.report_text());
        Ok(outcome)
    }
}
