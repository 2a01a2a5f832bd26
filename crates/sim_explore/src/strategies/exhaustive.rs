use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{
    ExplorationContext, ExplorationOutcome, ExplorationStrategy, SweepReport,
};
use crate::config::StrategyOptions;
use crate::error::{ExploreError, Result};
use crate::parameters::{CandidatePoint, ParameterSpace};

/// How a sweep chooses its points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingMethod {
    /// Full cartesian product of every variable's grid.
    #[default]
    Factorial,
    /// `sample_size` independent uniform draws.
    Uniform,
    /// Latin hypercube of `sample_size` points.
    Latin,
}

impl SamplingMethod {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "factorial" => Ok(Self::Factorial),
            "uniform" => Ok(Self::Uniform),
            "latin" | "lhs" => Ok(Self::Latin),
            other => Err(ExploreError::configuration(format!(
                "unknown sampling method '{other}'"
            ))),
        }
    }

    /// Points of the plan over `space`.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` when a random method has no sample size, and
    /// propagates grid or sampling errors of the space.
    pub fn plan(
        self,
        space: &ParameterSpace,
        sample_size: Option<usize>,
        rng: &mut StdRng,
    ) -> Result<Vec<CandidatePoint>> {
        let required = || {
            sample_size.filter(|n| *n > 0).ok_or_else(|| {
                ExploreError::configuration(format!(
                    "sampling method {self:?} needs a positive sample_size"
                ))
            })
        };
        match self {
            Self::Factorial => space.grid(),
            Self::Uniform => space.sample_uniform(required()?, rng),
            Self::Latin => space.latin_hypercube(required()?, rng),
        }
    }
}

/// Evaluates every point of a plan.
///
/// With a fitness, the sweep also reports the best point.
#[derive(Debug, Clone, Default)]
pub struct ExhaustiveExploration {
    method: SamplingMethod,
}

impl ExhaustiveExploration {
    pub fn new(method: SamplingMethod) -> Self {
        Self { method }
    }

    /// Options: `method` (`factorial`, `uniform` or `latin`).
    pub fn from_options(options: &StrategyOptions) -> Result<Self> {
        Ok(Self::new(SamplingMethod::parse(
            options.str_or("method", "factorial")?,
        )?))
    }
}

impl ExplorationStrategy for ExhaustiveExploration {
    fn name(&self) -> &'static str {
        "exhaustive"
    }

    fn is_fitness_based(&self) -> bool {
        false
    }

    fn explore(&mut self, ctx: &mut ExplorationContext<'_>) -> Result<ExplorationOutcome> {
        let method = self.method;
        let space = ctx.space;
        let sample_size = ctx.config.sample_size;
        let rows = ctx.load_or_generate_sample(|rng| method.plan(space, sample_size, rng))?;
        info!(points = rows.len(), method = ?method, "Starting exhaustive exploration");

        let results = ctx.dispatch(&rows);
        let ordered: Vec<_> = ExplorationContext::ordered_results(&rows, &results)
            .into_iter()
            .cloned()
            .collect();

        let mut best: Option<(CandidatePoint, f64)> = None;
        if let Some(fitness) = ctx.fitness {
            let objective = fitness.objective();
            for result in &ordered {
                let Some(value) = fitness.evaluate(result) else {
                    continue;
                };
                if best
                    .as_ref()
                    .map_or(true, |(_, incumbent)| objective.is_better(value, *incumbent))
                {
                    best = Some((result.candidate.clone(), value));
                }
            }
        }

        ctx.export_results(&ordered);
        let report = SweepReport {
            points: ordered.len(),
            failed: ordered.iter().filter(|r| r.is_failed()).count(),
            best_fitness: best.as_ref().map(|(_, f)| *f),
            best: best.map(|(candidate, _)| candidate),
            results: ordered,
        };
        let outcome = ExplorationOutcome::Sweep(report);
        ctx.write_report(&outcome.report_text());
        Ok(outcome)
    }
}
