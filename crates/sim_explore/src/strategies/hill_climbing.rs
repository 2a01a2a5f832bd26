use super::driver::{best_scored, improves, run_search, Scored, SearchPolicy};
use super::{
    finish_search, neighborhood_from_options, ExplorationContext, ExplorationOutcome,
    ExplorationStrategy, InitialSolution,
};
use crate::config::StrategyOptions;
use crate::error::Result;
use crate::neighborhood::{Neighborhood1Var, NeighborhoodGenerator};
use crate::parameters::CandidatePoint;
use crate::stopping::{MaxIterations, SearchState, StoppingCriterion};

/// Steepest-ascent hill climbing.
///
/// Each iteration evaluates the whole neighbourhood of the current point and
/// moves to its best member if that strictly improves the current fitness;
/// otherwise the search has reached a local optimum and stops.
pub struct HillClimbing {
    iter_max: MaxIterations,
    neighborhood: Box<dyn NeighborhoodGenerator>,
    init: InitialSolution,
    current: Option<Scored>,
}

impl HillClimbing {
    pub fn new() -> Self {
        Self {
            iter_max: MaxIterations(50),
            neighborhood: Box::new(Neighborhood1Var),
            init: InitialSolution::default(),
            current: None,
        }
    }

    /// Options: `iter_max`, `neighborhood`, `init_solution`.
    pub fn from_options(options: &StrategyOptions) -> Result<Self> {
        Ok(Self {
            iter_max: MaxIterations(options.usize_or("iter_max", 50)?),
            neighborhood: neighborhood_from_options(options)?,
            init: InitialSolution::from_options(options),
            current: None,
        })
    }

    pub fn iter_max(mut self, iter_max: usize) -> Self {
        self.iter_max = MaxIterations(iter_max);
        self
    }

    pub fn neighborhood(mut self, neighborhood: impl NeighborhoodGenerator + 'static) -> Self {
        self.neighborhood = Box::new(neighborhood);
        self
    }

    pub fn init_solution(mut self, point: CandidatePoint) -> Self {
        self.init = InitialSolution::point(point);
        self
    }
}

impl Default for HillClimbing {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchPolicy for HillClimbing {
    fn name(&self) -> &'static str {
        "hill_climbing"
    }

    fn own_criterion(&self) -> Option<&dyn StoppingCriterion> {
        Some(&self.iter_max)
    }

    fn seed(&mut self, ctx: &mut ExplorationContext<'_>) -> Result<Vec<CandidatePoint>> {
        self.current = None;
        Ok(vec![self.init.resolve(ctx)?])
    }

    fn absorb_seed(&mut self, _ctx: &mut ExplorationContext<'_>, scored: Vec<Scored>) -> Result<()> {
        self.current = scored.into_iter().next();
        Ok(())
    }

    fn generate(
        &mut self,
        ctx: &mut ExplorationContext<'_>,
        _state: &mut SearchState,
    ) -> Result<Vec<CandidatePoint>> {
        let Some((point, _)) = &self.current else {
            return Ok(Vec::new());
        };
        Ok(self.neighborhood.neighbors(ctx.space, point, &mut ctx.rng))
    }

    fn absorb(
        &mut self,
        ctx: &mut ExplorationContext<'_>,
        state: &mut SearchState,
        scored: Vec<Scored>,
    ) -> Result<()> {
        let objective = ctx.require_fitness()?.objective();
        let incumbent = self.current.as_ref().and_then(|(_, fitness)| *fitness);
        match best_scored(&scored, objective) {
            Some((candidate, fitness)) if improves(fitness, incumbent, objective) => {
                self.current = Some((candidate.clone(), Some(fitness)));
            }
            _ => state.converged = true,
        }
        Ok(())
    }
}

impl ExplorationStrategy for HillClimbing {
    fn name(&self) -> &'static str {
        SearchPolicy::name(self)
    }

    fn is_fitness_based(&self) -> bool {
        true
    }

    fn explore(&mut self, ctx: &mut ExplorationContext<'_>) -> Result<ExplorationOutcome> {
        let report = run_search(self, ctx)?;
        Ok(finish_search(ctx, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::Value;
    use crate::strategies::test_support::run_peak;

    #[test]
    fn test_climbs_to_the_peak_and_converges() {
        let start = CandidatePoint::new().set("x", 20i64).set("y", 20i64);
        let report = run_peak(&mut HillClimbing::new().init_solution(start));

        assert!(report.converged);
        assert_eq!(report.best_fitness, Some(0.0));
        let best = report.best.unwrap();
        assert_eq!(best.get("x"), Some(&Value::Int(7)));
        assert_eq!(best.get("y"), Some(&Value::Int(3)));
    }

    #[test]
    fn test_iteration_limit_stops_before_the_peak() {
        let start = CandidatePoint::new().set("x", 20i64).set("y", 20i64);
        let report = run_peak(&mut HillClimbing::new().iter_max(2).init_solution(start));

        assert!(!report.converged);
        assert_eq!(report.iterations, 2);
        assert!(report.best_fitness.unwrap() < 0.0);
    }

    #[test]
    fn test_trace_never_gets_worse() {
        let report = run_peak(&mut HillClimbing::new());
        assert!(report.trace.windows(2).all(|w| w[1] >= w[0]));
    }
}
