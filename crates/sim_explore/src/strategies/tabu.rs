use std::collections::{HashMap, VecDeque};

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use super::driver::{improves, run_search, Scored, SearchPolicy};
use super::{
    finish_search, neighborhood_from_options, ExplorationContext, ExplorationOutcome,
    ExplorationStrategy, InitialSolution,
};
use crate::config::StrategyOptions;
use crate::error::{ExploreError, Result};
use crate::neighborhood::{Neighborhood1Var, NeighborhoodGenerator};
use crate::parameters::CandidatePoint;
use crate::stopping::{MaxIterations, SearchState, StoppingCriterion};

/// Tenure adaptation of the reactive variant.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Reaction {
    tenure_min: usize,
    tenure_max: usize,
    nb_tests_without_collision_max: usize,
    cycle_size_min: usize,
    cycle_size_max: usize,
}

/// Shared tabu machinery; [`TabuSearch`] keeps the tenure fixed while
/// [`ReactiveTabuSearch`] adapts it to revisits.
struct TabuCore {
    name: &'static str,
    iter_max: MaxIterations,
    tenure: usize,
    initial_tenure: usize,
    reaction: Option<Reaction>,
    neighborhood: Box<dyn NeighborhoodGenerator>,
    init: InitialSolution,
    current: Option<Scored>,
    tabu: VecDeque<CandidatePoint>,
    visits: HashMap<CandidatePoint, usize>,
    tests_without_collision: usize,
    escape: Option<CandidatePoint>,
}

impl TabuCore {
    fn new(name: &'static str, iter_max: usize, tenure: usize, reaction: Option<Reaction>) -> Self {
        Self {
            name,
            iter_max: MaxIterations(iter_max),
            tenure,
            initial_tenure: tenure,
            reaction,
            neighborhood: Box::new(Neighborhood1Var),
            init: InitialSolution::default(),
            current: None,
            tabu: VecDeque::new(),
            visits: HashMap::new(),
            tests_without_collision: 0,
            escape: None,
        }
    }

    fn reset(&mut self) {
        self.current = None;
        self.tenure = self.initial_tenure;
        self.tabu.clear();
        self.visits.clear();
        self.tests_without_collision = 0;
        self.escape = None;
    }

    fn make_tabu(&mut self, point: CandidatePoint) {
        self.tabu.retain(|p| p != &point);
        self.tabu.push_back(point);
        while self.tabu.len() > self.tenure {
            self.tabu.pop_front();
        }
    }

    /// Record a move; the reactive variant adapts its tenure and may plan an
    /// escape walk.
    fn visit(&mut self, ctx: &mut ExplorationContext<'_>, point: &CandidatePoint, iteration: usize) {
        let previous = self.visits.insert(point.clone(), iteration);
        let Some(reaction) = self.reaction else {
            return;
        };
        match previous {
            Some(last) => {
                self.tenure = (self.tenure + 1).min(reaction.tenure_max);
                self.tests_without_collision = 0;
                let cycle = iteration - last;
                if (reaction.cycle_size_min..=reaction.cycle_size_max).contains(&cycle) {
                    let steps = 1 + ctx.rng.gen_range(0..=cycle / 2);
                    self.escape = self.random_walk(ctx, point, steps);
                    debug!(cycle, steps, tenure = self.tenure, "Cycle detected, escaping");
                }
            }
            None => {
                self.tests_without_collision += 1;
                if self.tests_without_collision > reaction.nb_tests_without_collision_max {
                    self.tenure = self.tenure.saturating_sub(1).max(reaction.tenure_min);
                    self.tests_without_collision = 0;
                }
            }
        }
        while self.tabu.len() > self.tenure {
            self.tabu.pop_front();
        }
    }

    fn random_walk(
        &self,
        ctx: &mut ExplorationContext<'_>,
        from: &CandidatePoint,
        steps: usize,
    ) -> Option<CandidatePoint> {
        let mut point = from.clone();
        for _ in 0..steps {
            let neighbors = self.neighborhood.neighbors(ctx.space, &point, &mut ctx.rng);
            point = neighbors.choose(&mut ctx.rng)?.clone();
        }
        Some(point)
    }
}

impl SearchPolicy for TabuCore {
    fn name(&self) -> &'static str {
        self.name
    }

    fn own_criterion(&self) -> Option<&dyn StoppingCriterion> {
        Some(&self.iter_max)
    }

    fn seed(&mut self, ctx: &mut ExplorationContext<'_>) -> Result<Vec<CandidatePoint>> {
        self.reset();
        Ok(vec![self.init.resolve(ctx)?])
    }

    fn absorb_seed(&mut self, _ctx: &mut ExplorationContext<'_>, scored: Vec<Scored>) -> Result<()> {
        if let Some((point, fitness)) = scored.into_iter().next() {
            self.visits.insert(point.clone(), 0);
            self.current = Some((point, fitness));
        }
        Ok(())
    }

    fn generate(
        &mut self,
        ctx: &mut ExplorationContext<'_>,
        _state: &mut SearchState,
    ) -> Result<Vec<CandidatePoint>> {
        if let Some(escape) = &self.escape {
            return Ok(vec![escape.clone()]);
        }
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

        if self.escape.take().is_some() {
            if let Some((point, fitness)) = scored.into_iter().next() {
                if let Some((previous, _)) = self.current.take() {
                    self.make_tabu(previous);
                }
                self.visits.insert(point.clone(), state.iteration);
                self.current = Some((point, fitness));
            }
            return Ok(());
        }

        // Aspiration: a tabu move is admissible if it beats the best so far.
        let best_ever = state.best_fitness;
        let mut chosen: Option<(CandidatePoint, f64)> = None;
        for (candidate, fitness) in scored {
            let Some(fitness) = fitness else { continue };
            let admissible = !self.tabu.contains(&candidate) || improves(fitness, best_ever, objective);
            let better = chosen
                .as_ref()
                .map_or(true, |(_, incumbent)| objective.is_better(fitness, *incumbent));
            if admissible && better {
                chosen = Some((candidate, fitness));
            }
        }

        let Some((next, fitness)) = chosen else {
            state.converged = true;
            return Ok(());
        };
        if let Some((previous, _)) = self.current.take() {
            self.make_tabu(previous);
        }
        self.visit(ctx, &next, state.iteration);
        self.current = Some((next, Some(fitness)));
        Ok(())
    }
}

/// Tabu search with a fixed-size tabu list of recently left solutions.
///
/// Each iteration moves to the best admissible neighbour, even when it is
/// worse than the current solution. A tabu neighbour is admissible only if it
/// beats the best fitness found so far.
pub struct TabuSearch(TabuCore);

impl TabuSearch {
    pub fn new() -> Self {
        Self(TabuCore::new("tabu", 50, 5, None))
    }

    /// Options: `iter_max`, `tabu_list_size`, `neighborhood`, `init_solution`.
    pub fn from_options(options: &StrategyOptions) -> Result<Self> {
        let size = options.usize_or("tabu_list_size", 5)?;
        if size == 0 {
            return Err(ExploreError::configuration("tabu_list_size must be positive"));
        }
        let mut core = TabuCore::new("tabu", options.usize_or("iter_max", 50)?, size, None);
        core.neighborhood = neighborhood_from_options(options)?;
        core.init = InitialSolution::from_options(options);
        Ok(Self(core))
    }

    pub fn iter_max(mut self, iter_max: usize) -> Self {
        self.0.iter_max = MaxIterations(iter_max);
        self
    }

    pub fn tabu_list_size(mut self, size: usize) -> Self {
        self.0.tenure = size.max(1);
        self.0.initial_tenure = self.0.tenure;
        self
    }

    pub fn init_solution(mut self, point: CandidatePoint) -> Self {
        self.0.init = InitialSolution::point(point);
        self
    }
}

impl Default for TabuSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl ExplorationStrategy for TabuSearch {
    fn name(&self) -> &'static str {
        self.0.name
    }

    fn is_fitness_based(&self) -> bool {
        true
    }

    fn explore(&mut self, ctx: &mut ExplorationContext<'_>) -> Result<ExplorationOutcome> {
        let report = run_search(&mut self.0, ctx)?;
        Ok(finish_search(ctx, report))
    }
}

/// Reactive tabu search.
///
/// Revisiting a solution lengthens the tabu tenure (up to `tenure_max`); a
/// run of `nb_tests_without_collision_max` fresh moves shortens it (down to
/// `tenure_min`). A revisit after a cycle of `cycle_size_min..=cycle_size_max`
/// iterations triggers a random escape walk.
pub struct ReactiveTabuSearch(TabuCore);

impl ReactiveTabuSearch {
    pub fn new() -> Self {
        Self(TabuCore::new(
            "reactive_tabu",
            100,
            5,
            Some(Reaction {
                tenure_min: 2,
                tenure_max: 10,
                nb_tests_without_collision_max: 20,
                cycle_size_min: 2,
                cycle_size_max: 20,
            }),
        ))
    }

    /// Options: `iter_max`, `tenure_init`, `tenure_min`, `tenure_max`,
    /// `nb_tests_without_collision_max`, `cycle_size_min`, `cycle_size_max`,
    /// `neighborhood`, `init_solution`.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` unless `1 <= tenure_min <= tenure_init <=
    /// tenure_max` and `cycle_size_min <= cycle_size_max`.
    pub fn from_options(options: &StrategyOptions) -> Result<Self> {
        let reaction = Reaction {
            tenure_min: options.usize_or("tenure_min", 2)?,
            tenure_max: options.usize_or("tenure_max", 10)?,
            nb_tests_without_collision_max: options.usize_or("nb_tests_without_collision_max", 20)?,
            cycle_size_min: options.usize_or("cycle_size_min", 2)?,
            cycle_size_max: options.usize_or("cycle_size_max", 20)?,
        };
        let tenure = options.usize_or("tenure_init", 5)?;
        if reaction.tenure_min == 0
            || reaction.tenure_min > tenure
            || tenure > reaction.tenure_max
        {
            return Err(ExploreError::configuration(
                "tenures must satisfy 1 <= tenure_min <= tenure_init <= tenure_max",
            ));
        }
        if reaction.cycle_size_min > reaction.cycle_size_max {
            return Err(ExploreError::configuration(
                "cycle_size_min must not exceed cycle_size_max",
            ));
        }
        let mut core = TabuCore::new(
            "reactive_tabu",
            options.usize_or("iter_max", 100)?,
            tenure,
            Some(reaction),
        );
        core.neighborhood = neighborhood_from_options(options)?;
        core.init = InitialSolution::from_options(options);
        Ok(Self(core))
    }

    pub fn iter_max(mut self, iter_max: usize) -> Self {
        self.0.iter_max = MaxIterations(iter_max);
        self
    }

    pub fn init_solution(mut self, point: CandidatePoint) -> Self {
        self.0.init = InitialSolution::point(point);
        self
    }

    /// Current tabu tenure.
    pub fn tenure(&self) -> usize {
        self.0.tenure
    }
}

impl Default for ReactiveTabuSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl ExplorationStrategy for ReactiveTabuSearch {
    fn name(&self) -> &'static str {
        self.0.name
    }

    fn is_fitness_based(&self) -> bool {
        true
    }

    fn explore(&mut self, ctx: &mut ExplorationContext<'_>) -> Result<ExplorationOutcome> {
        let report = run_search(&mut self.0, ctx)?;
        Ok(finish_search(ctx, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExplorationConfig;
    use crate::export::CsvSampleStore;
    use crate::parameters::Value;
    use crate::strategies::test_support::{dispatcher, peak_space, run_peak};

    fn point(x: i64, y: i64) -> CandidatePoint {
        CandidatePoint::new().set("x", x).set("y", y)
    }

    /// Runs `check` against a fresh reactive core and a context over the peak space.
    fn with_reactive_core(check: impl FnOnce(&mut TabuCore, &mut ExplorationContext<'_>)) {
        let space = peak_space();
        let config = ExplorationConfig::new().seed(3);
        let dispatcher = dispatcher();
        let mut ctx = ExplorationContext::new(&space, &config, &dispatcher, &CsvSampleStore);
        let mut core = ReactiveTabuSearch::new().0;
        check(&mut core, &mut ctx);
    }

    #[test]
    fn test_tabu_finds_peak_and_runs_to_iteration_limit() {
        let start = CandidatePoint::new().set("x", 0i64).set("y", 0i64);
        let mut search = TabuSearch::new()
            .iter_max(30)
            .tabu_list_size(2)
            .init_solution(start);
        let report = run_peak(&mut search);

        assert_eq!(report.best_fitness, Some(0.0));
        let best = report.best.unwrap();
        assert_eq!(best.get("x"), Some(&Value::Int(7)));
        // Tabu search keeps moving past the optimum until the limit.
        assert_eq!(report.iterations, 30);
    }

    #[test]
    fn test_tabu_list_is_bounded() {
        let mut core = TabuCore::new("tabu", 10, 3, None);
        for x in 0..10i64 {
            core.make_tabu(CandidatePoint::new().set("x", x));
        }
        assert_eq!(core.tabu.len(), 3);
        assert_eq!(core.tabu.front(), Some(&CandidatePoint::new().set("x", 7i64)));
    }

    #[test]
    fn test_reactive_search_finds_peak() {
        let start = CandidatePoint::new().set("x", 15i64).set("y", 10i64);
        let mut search = ReactiveTabuSearch::new().iter_max(60).init_solution(start);
        let report = run_peak(&mut search);

        assert_eq!(report.best_fitness, Some(0.0));
        assert!((2..=10).contains(&search.tenure()));
    }

    #[test]
    fn test_revisit_lengthens_tenure_and_plans_escape() {
        with_reactive_core(|core, ctx| {
            core.visit(ctx, &point(4, 4), 1);
            core.visit(ctx, &point(5, 4), 2);
            assert_eq!(core.tenure, 5);
            assert!(core.escape.is_none());

            core.visit(ctx, &point(4, 4), 3);

            assert_eq!(core.tenure, 6);
            let escape = core.escape.clone().unwrap();
            assert!(ctx.space.validate(&escape));

            // The planned walk is the next and only candidate.
            let mut state = SearchState::new();
            assert_eq!(core.generate(ctx, &mut state).unwrap(), vec![escape]);
        });
    }

    #[test]
    fn test_revisit_outside_cycle_range_does_not_escape() {
        with_reactive_core(|core, ctx| {
            core.visit(ctx, &point(4, 4), 1);
            // A cycle of one iteration is below cycle_size_min.
            core.visit(ctx, &point(4, 4), 2);
            assert_eq!(core.tenure, 6);
            assert!(core.escape.is_none());
        });
    }

    #[test]
    fn test_tenure_is_capped_at_maximum() {
        with_reactive_core(|core, ctx| {
            for iteration in 0..20 {
                core.visit(ctx, &point(4, 4), iteration);
            }
            assert_eq!(core.tenure, 10);
        });
    }

    #[test]
    fn test_fresh_moves_shorten_tenure_down_to_minimum() {
        with_reactive_core(|core, ctx| {
            for x in 0..=20 {
                core.visit(ctx, &point(x, 0), x as usize);
            }
            // 21 fresh moves exceed the 20-move window once.
            assert_eq!(core.tenure, 4);

            for i in 0..200usize {
                let (x, y) = ((i % 21) as i64, 1 + (i / 21) as i64);
                core.visit(ctx, &point(x, y), 21 + i);
            }
            assert_eq!(core.tenure, 2);
        });
    }

    #[test]
    fn test_plain_tabu_keeps_fixed_tenure() {
        let space = peak_space();
        let config = ExplorationConfig::new();
        let dispatcher = dispatcher();
        let mut ctx = ExplorationContext::new(&space, &config, &dispatcher, &CsvSampleStore);
        let mut core = TabuSearch::new().0;
        core.visit(&mut ctx, &point(4, 4), 1);
        core.visit(&mut ctx, &point(4, 4), 3);
        assert_eq!(core.tenure, 5);
        assert!(core.escape.is_none());
    }

    #[test]
    fn test_reactive_tenure_bounds_are_validated() {
        let options = StrategyOptions::new()
            .with("tenure_min", 6)
            .with("tenure_init", 5);
        assert!(ReactiveTabuSearch::from_options(&options).is_err());
        let options = StrategyOptions::new()
            .with("cycle_size_min", 30)
            .with("cycle_size_max", 20);
        assert!(ReactiveTabuSearch::from_options(&options).is_err());
    }
}
