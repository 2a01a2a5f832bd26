use rand::seq::SliceRandom;
use rand::Rng;

use super::driver::{improves, run_search, Scored, SearchPolicy};
use super::{
    finish_search, neighborhood_from_options, ExplorationContext, ExplorationOutcome,
    ExplorationStrategy, InitialSolution,
};
use crate::config::StrategyOptions;
use crate::error::{ExploreError, Result};
use crate::neighborhood::{Neighborhood1Var, NeighborhoodGenerator};
use crate::parameters::CandidatePoint;
use crate::stopping::{SearchState, StoppingCriterion};

/// Simulated annealing with a geometric cooling schedule.
///
/// Each iteration draws one random neighbour. An improving move is always
/// accepted; a worsening move with probability `exp(-|delta| / T)`. The
/// temperature is multiplied by `temp_decrease` every `nb_iter_cst_temp`
/// iterations and the search ends once it falls below `temp_end`.
pub struct SimulatedAnnealing {
    temp_init: f64,
    temp_end: f64,
    temp_decrease: f64,
    nb_iter_cst_temp: usize,
    neighborhood: Box<dyn NeighborhoodGenerator>,
    init: InitialSolution,
    current: Option<Scored>,
    temperature: f64,
    iterations_at_temperature: usize,
}

impl SimulatedAnnealing {
    pub fn new() -> Self {
        Self {
            temp_init: 100.0,
            temp_end: 1.0,
            temp_decrease: 0.5,
            nb_iter_cst_temp: 5,
            neighborhood: Box::new(Neighborhood1Var),
            init: InitialSolution::default(),
            current: None,
            temperature: 100.0,
            iterations_at_temperature: 0,
        }
    }

    /// Options: `temp_init`, `temp_end`, `temp_decrease`, `nb_iter_cst_temp`,
    /// `neighborhood`, `init_solution`.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` for a non-positive end temperature, an initial
    /// temperature below it, or a decrease factor outside `(0, 1)`.
    pub fn from_options(options: &StrategyOptions) -> Result<Self> {
        let defaults = Self::new();
        Self {
            temp_init: options.f64_or("temp_init", defaults.temp_init)?,
            temp_end: options.f64_or("temp_end", defaults.temp_end)?,
            temp_decrease: options.f64_or("temp_decrease", defaults.temp_decrease)?,
            nb_iter_cst_temp: options.usize_or("nb_iter_cst_temp", defaults.nb_iter_cst_temp)?,
            neighborhood: neighborhood_from_options(options)?,
            init: InitialSolution::from_options(options),
            ..defaults
        }
        .validated()
    }

    pub fn schedule(mut self, temp_init: f64, temp_end: f64, temp_decrease: f64) -> Result<Self> {
        self.temp_init = temp_init;
        self.temp_end = temp_end;
        self.temp_decrease = temp_decrease;
        self.validated()
    }

    pub fn nb_iter_cst_temp(mut self, iterations: usize) -> Self {
        self.nb_iter_cst_temp = iterations.max(1);
        self
    }

    pub fn init_solution(mut self, point: CandidatePoint) -> Self {
        self.init = InitialSolution::point(point);
        self
    }

    fn validated(self) -> Result<Self> {
        if self.temp_end.is_nan() || self.temp_end <= 0.0 {
            return Err(ExploreError::configuration("temp_end must be positive"));
        }
        if self.temp_init.is_nan() || self.temp_init < self.temp_end {
            return Err(ExploreError::configuration(
                "temp_init must not be below temp_end",
            ));
        }
        if !(0.0..1.0).contains(&self.temp_decrease) || self.temp_decrease == 0.0 {
            return Err(ExploreError::configuration(
                "temp_decrease must lie strictly between 0 and 1",
            ));
        }
        Ok(Self {
            nb_iter_cst_temp: self.nb_iter_cst_temp.max(1),
            ..self
        })
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    fn cool(&mut self, state: &mut SearchState) {
        self.iterations_at_temperature += 1;
        if self.iterations_at_temperature >= self.nb_iter_cst_temp {
            self.iterations_at_temperature = 0;
            self.temperature *= self.temp_decrease;
        }
        if self.temperature < self.temp_end {
            state.converged = true;
        }
    }
}

impl Default for SimulatedAnnealing {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchPolicy for SimulatedAnnealing {
    fn name(&self) -> &'static str {
        "annealing"
    }

    fn own_criterion(&self) -> Option<&dyn StoppingCriterion> {
        None
    }

    fn seed(&mut self, ctx: &mut ExplorationContext<'_>) -> Result<Vec<CandidatePoint>> {
        self.current = None;
        self.temperature = self.temp_init;
        self.iterations_at_temperature = 0;
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
        let neighbors = self.neighborhood.neighbors(ctx.space, point, &mut ctx.rng);
        Ok(neighbors.choose(&mut ctx.rng).cloned().into_iter().collect())
    }

    fn absorb(
        &mut self,
        ctx: &mut ExplorationContext<'_>,
        state: &mut SearchState,
        scored: Vec<Scored>,
    ) -> Result<()> {
        let objective = ctx.require_fitness()?.objective();
        let incumbent = self.current.as_ref().and_then(|(_, fitness)| *fitness);
        if let Some((candidate, Some(fitness))) = scored.into_iter().next() {
            let accept = match incumbent {
                _ if improves(fitness, incumbent, objective) => true,
                Some(incumbent) => {
                    let delta = objective.gain(fitness, incumbent).abs();
                    ctx.rng.gen::<f64>() < (-delta / self.temperature).exp()
                }
                None => true,
            };
            if accept {
                self.current = Some((candidate, Some(fitness)));
            }
        }
        self.cool(state);
        Ok(())
    }
}

impl ExplorationStrategy for SimulatedAnnealing {
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
