use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::driver::{best_scored, improves, run_search, Scored, SearchPolicy};
use super::{
    finish_search, ExplorationContext, ExplorationOutcome, ExplorationStrategy, InitialSolution,
};
use crate::config::StrategyOptions;
use crate::error::{ExploreError, Result};
use crate::fitness::Objective;
use crate::neighborhood::{Neighborhood1Var, NeighborhoodGenerator};
use crate::parameters::{CandidatePoint, ParameterSpace};
use crate::stopping::{MaxIterations, SearchState, StoppingCriterion};

/// Parent selection scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    /// Best of `size` individuals drawn at random.
    Tournament { size: usize },
    /// Fitness-proportional (roulette wheel).
    Stochastic,
}

/// Local improvement applied to each child when `improve_sol` is set.
const IMPROVE_STEPS: usize = 10;

/// Generational genetic algorithm.
///
/// Individuals that fail evaluation never enter the population. With
/// elitism, the best individual survives unchanged into the next generation.
pub struct GeneticAlgorithm {
    pop_dim: usize,
    crossover_prob: f64,
    mutation_prob: f64,
    max_gen: MaxIterations,
    selection: Selection,
    elitism: bool,
    improve_sol: bool,
    init: InitialSolution,
    population: Vec<(CandidatePoint, f64)>,
}

impl GeneticAlgorithm {
    pub fn new() -> Self {
        Self {
            pop_dim: 3,
            crossover_prob: 0.7,
            mutation_prob: 0.1,
            max_gen: MaxIterations(20),
            selection: Selection::Tournament { size: 2 },
            elitism: true,
            improve_sol: false,
            init: InitialSolution::default(),
            population: Vec::new(),
        }
    }

    /// Options: `pop_dim`, `crossover_prob`, `mutation_prob`, `max_gen`,
    /// `stochastic_sel`, `tournament_size`, `elitism`, `improve_sol`,
    /// `init_solution`.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` for an empty population, probabilities outside
    /// `[0, 1]` or an empty tournament.
    pub fn from_options(options: &StrategyOptions) -> Result<Self> {
        let selection = if options.bool_or("stochastic_sel", false)? {
            Selection::Stochastic
        } else {
            Selection::Tournament {
                size: options.usize_or("tournament_size", 2)?,
            }
        };
        Self {
            pop_dim: options.usize_or("pop_dim", 3)?,
            crossover_prob: options.f64_or("crossover_prob", 0.7)?,
            mutation_prob: options.f64_or("mutation_prob", 0.1)?,
            max_gen: MaxIterations(options.usize_or("max_gen", 20)?),
            selection,
            elitism: options.bool_or("elitism", true)?,
            improve_sol: options.bool_or("improve_sol", false)?,
            init: InitialSolution::from_options(options),
            population: Vec::new(),
        }
        .validated()
    }

    pub fn pop_dim(mut self, pop_dim: usize) -> Self {
        self.pop_dim = pop_dim;
        self
    }

    pub fn max_gen(mut self, max_gen: usize) -> Self {
        self.max_gen = MaxIterations(max_gen);
        self
    }

    pub fn probabilities(mut self, crossover_prob: f64, mutation_prob: f64) -> Self {
        self.crossover_prob = crossover_prob;
        self.mutation_prob = mutation_prob;
        self
    }

    pub fn selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    pub fn improve_sol(mut self, improve_sol: bool) -> Self {
        self.improve_sol = improve_sol;
        self
    }

    fn validated(self) -> Result<Self> {
        if self.pop_dim == 0 {
            return Err(ExploreError::configuration("pop_dim must be positive"));
        }
        for (name, p) in [
            ("crossover_prob", self.crossover_prob),
            ("mutation_prob", self.mutation_prob),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(ExploreError::configuration(format!(
                    "{name} must lie in [0, 1], got {p}"
                )));
            }
        }
        if let Selection::Tournament { size: 0 } = self.selection {
            return Err(ExploreError::configuration("tournament_size must be positive"));
        }
        Ok(self)
    }

    fn select<'p, R: Rng + ?Sized>(
        &self,
        population: &'p [(CandidatePoint, f64)],
        objective: Objective,
        rng: &mut R,
    ) -> Option<&'p CandidatePoint> {
        match self.selection {
            Selection::Tournament { size } => (0..size)
                .filter_map(|_| population.choose(rng))
                .reduce(|best, other| {
                    if objective.is_better(other.1, best.1) {
                        other
                    } else {
                        best
                    }
                })
                .map(|(candidate, _)| candidate),
            Selection::Stochastic => {
                // Weight is the gain over the worst individual.
                let worst = population
                    .iter()
                    .map(|(_, f)| *f)
                    .reduce(|a, b| if objective.is_better(a, b) { b } else { a })?;
                let weights: Vec<f64> = population
                    .iter()
                    .map(|(_, f)| objective.gain(*f, worst) + f64::EPSILON)
                    .collect();
                let total: f64 = weights.iter().sum();
                let mut ticket = rng.gen::<f64>() * total;
                for ((candidate, _), weight) in population.iter().zip(&weights) {
                    if ticket < *weight {
                        return Some(candidate);
                    }
                    ticket -= weight;
                }
                population.last().map(|(candidate, _)| candidate)
            }
        }
    }

    fn crossover<R: Rng + ?Sized>(
        &self,
        space: &ParameterSpace,
        first: &CandidatePoint,
        second: &CandidatePoint,
        rng: &mut R,
    ) -> CandidatePoint {
        if rng.gen::<f64>() >= self.crossover_prob {
            return first.clone();
        }
        let mut child = first.clone();
        for variable in space.variables() {
            if rng.gen_bool(0.5) {
                if let Some(value) = second.get(variable.name()) {
                    child = child.with(variable.name(), value.clone());
                }
            }
        }
        child
    }

    fn mutate(&self, ctx: &mut ExplorationContext<'_>, mut child: CandidatePoint) -> Result<CandidatePoint> {
        let space = ctx.space;
        for variable in space.variables() {
            if variable.is_samplable() && ctx.rng.gen::<f64>() < self.mutation_prob {
                child = child.with(variable.name(), variable.sample(&mut ctx.rng)?);
            }
        }
        Ok(child)
    }

    /// Bounded hill climbing from `start`.
    fn improve(
        &self,
        ctx: &mut ExplorationContext<'_>,
        start: (CandidatePoint, f64),
        objective: Objective,
    ) -> Result<(CandidatePoint, f64)> {
        let mut current = start;
        for _ in 0..IMPROVE_STEPS {
            let neighbors = Neighborhood1Var.neighbors(ctx.space, &current.0, &mut ctx.rng);
            let fitness = ctx.evaluate_fitness(&neighbors)?;
            let scored: Vec<Scored> = neighbors.into_iter().zip(fitness).collect();
            match best_scored(&scored, objective) {
                Some((candidate, f)) if improves(f, Some(current.1), objective) => {
                    current = (candidate.clone(), f);
                }
                _ => break,
            }
        }
        Ok(current)
    }
}

impl Default for GeneticAlgorithm {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchPolicy for GeneticAlgorithm {
    fn name(&self) -> &'static str {
        "genetic"
    }

    fn own_criterion(&self) -> Option<&dyn StoppingCriterion> {
        Some(&self.max_gen)
    }

    fn seed(&mut self, ctx: &mut ExplorationContext<'_>) -> Result<Vec<CandidatePoint>> {
        self.population.clear();
        let mut seed = Vec::with_capacity(self.pop_dim);
        seed.push(self.init.resolve(ctx)?);
        while seed.len() < self.pop_dim {
            seed.push(ctx.space.sample_default(&mut ctx.rng)?);
        }
        Ok(seed)
    }

    fn absorb_seed(&mut self, ctx: &mut ExplorationContext<'_>, scored: Vec<Scored>) -> Result<()> {
        self.population = scored
            .into_iter()
            .filter_map(|(candidate, fitness)| fitness.map(|f| (candidate, f)))
            .collect();
        if self.improve_sol {
            let objective = ctx.require_fitness()?.objective();
            let population = std::mem::take(&mut self.population);
            for individual in population {
                let improved = self.improve(ctx, individual, objective)?;
                self.population.push(improved);
            }
        }
        Ok(())
    }

    fn generate(
        &mut self,
        ctx: &mut ExplorationContext<'_>,
        _state: &mut SearchState,
    ) -> Result<Vec<CandidatePoint>> {
        let objective = ctx.require_fitness()?.objective();
        let elites = usize::from(self.elitism && !self.population.is_empty());
        let mut children = Vec::with_capacity(self.pop_dim);
        while children.len() + elites < self.pop_dim.max(elites + 1) {
            let child = if self.population.is_empty() {
                // Nothing survived evaluation; restart from random individuals.
                ctx.space.sample_default(&mut ctx.rng)?
            } else {
                let first = self.select(&self.population, objective, &mut ctx.rng);
                let second = self.select(&self.population, objective, &mut ctx.rng);
                match (first, second) {
                    (Some(first), Some(second)) => {
                        let child = self.crossover(ctx.space, first, second, &mut ctx.rng);
                        self.mutate(ctx, child)?
                    }
                    _ => ctx.space.sample_default(&mut ctx.rng)?,
                }
            };
            children.push(child);
        }
        Ok(children)
    }

    fn absorb(
        &mut self,
        ctx: &mut ExplorationContext<'_>,
        _state: &mut SearchState,
        scored: Vec<Scored>,
    ) -> Result<()> {
        let objective = ctx.require_fitness()?.objective();
        let mut next: Vec<(CandidatePoint, f64)> = Vec::with_capacity(self.pop_dim);
        if self.elitism {
            if let Some((elite, fitness)) = best_scored(
                &self
                    .population
                    .iter()
                    .map(|(c, f)| (c.clone(), Some(*f)))
                    .collect::<Vec<_>>(),
                objective,
            ) {
                next.push((elite.clone(), fitness));
            }
        }
        for (candidate, fitness) in scored {
            let Some(fitness) = fitness else { continue };
            let individual = if self.improve_sol {
                self.improve(ctx, (candidate, fitness), objective)?
            } else {
                (candidate, fitness)
            };
            next.push(individual);
        }
        next.truncate(self.pop_dim);
        self.population = next;
        Ok(())
    }
}

impl ExplorationStrategy for GeneticAlgorithm {
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
    use crate::strategies::test_support::run_peak;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_runs_max_gen_generations() {
        let mut ga = GeneticAlgorithm::new().pop_dim(6).max_gen(15);
        let report = run_peak(&mut ga);

        assert_eq!(report.iterations, 15);
        assert!(!report.converged);
        assert!(report.best_fitness.is_some());
        assert!(report.trace.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn test_elitism_keeps_the_best_individual() {
        let mut ga = GeneticAlgorithm::new().pop_dim(4).max_gen(10);
        let report = run_peak(&mut ga);
        let best_in_population = ga
            .population
            .iter()
            .map(|(_, f)| *f)
            .fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(Some(best_in_population), report.best_fitness);
    }

    #[test]
    fn test_improvement_reaches_the_peak() {
        let mut ga = GeneticAlgorithm::new().pop_dim(3).max_gen(10).improve_sol(true);
        let report = run_peak(&mut ga);
        assert_eq!(report.best_fitness, Some(0.0));
    }

    #[test]
    fn test_tournament_prefers_fitter_individuals() {
        let ga = GeneticAlgorithm::new().selection(Selection::Tournament { size: 8 });
        let population = vec![
            (CandidatePoint::new().set("x", 0i64), -10.0),
            (CandidatePoint::new().set("x", 1i64), 5.0),
        ];
        let mut rng = StdRng::seed_from_u64(3);
        let wins = (0..100)
            .filter(|_| {
                ga.select(&population, Objective::Maximize, &mut rng)
                    == Some(&population[1].0)
            })
            .count();
        assert!(wins > 90);
    }

    #[test]
    fn test_invalid_probabilities_are_rejected() {
        let options = StrategyOptions::new().with("mutation_prob", 1.5);
        assert!(GeneticAlgorithm::from_options(&options).is_err());
        let options = StrategyOptions::new().with("pop_dim", 0);
        assert!(GeneticAlgorithm::from_options(&options).is_err());
    }
}
