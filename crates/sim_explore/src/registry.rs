//! Named strategy factories.

use std::collections::BTreeMap;

use crate::config::StrategyOptions;
use crate::error::{ExploreError, Result};
use crate::strategies::{
    BetaExploration, ExhaustiveExploration, ExplorationStrategy, GeneticAlgorithm, HillClimbing,
    MorrisExploration, ParticleSwarm, ReactiveTabuSearch, SimulatedAnnealing, SobolExploration,
    StochasticAnalysis, TabuSearch,
};

/// Builds a strategy from its declared options.
pub type StrategyFactory = fn(&StrategyOptions) -> Result<Box<dyn ExplorationStrategy>>;

/// Maps strategy identifiers to factories.
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    factories: BTreeMap<String, StrategyFactory>,
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}

fn boxed<S, F>(build: F, options: &StrategyOptions) -> Result<Box<dyn ExplorationStrategy>>
where
    S: ExplorationStrategy + 'static,
    F: Fn(&StrategyOptions) -> Result<S>,
{
    Ok(Box::new(build(options)?))
}

impl StrategyRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in strategy.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("hill_climbing", |o| boxed(HillClimbing::from_options, o));
        registry.register("annealing", |o| boxed(SimulatedAnnealing::from_options, o));
        registry.register("tabu", |o| boxed(TabuSearch::from_options, o));
        registry.register("reactive_tabu", |o| boxed(ReactiveTabuSearch::from_options, o));
        registry.register("genetic", |o| boxed(GeneticAlgorithm::from_options, o));
        registry.register("pso", |o| boxed(ParticleSwarm::from_options, o));
        registry.register("exhaustive", |o| boxed(ExhaustiveExploration::from_options, o));
        registry.register("sobol", |o| boxed(SobolExploration::from_options, o));
        registry.register("morris", |o| boxed(MorrisExploration::from_options, o));
        registry.register("beta", |o| boxed(BetaExploration::from_options, o));
        registry.register("stochanalysis", |o| boxed(StochasticAnalysis::from_options, o));
        registry
    }

    /// Register `factory` under `name`, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, factory: StrategyFactory) {
        self.factories.insert(name.into(), factory);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Build the strategy registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownStrategy` for an unregistered name, or the factory's
    /// error for invalid options.
    pub fn create(&self, name: &str, options: &StrategyOptions) -> Result<Box<dyn ExplorationStrategy>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ExploreError::UnknownStrategy(name.to_string()))?;
        factory(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_default_name_builds_a_matching_strategy() {
        let registry = StrategyRegistry::with_defaults();
        let names: Vec<String> = registry.names().map(str::to_string).collect();
        assert_eq!(names.len(), 11);
        for name in names {
            let strategy = registry.create(&name, &StrategyOptions::new()).unwrap();
            assert_eq!(strategy.name(), name);
        }
    }

    #[test]
    fn test_fitness_based_split() {
        let registry = StrategyRegistry::with_defaults();
        let options = StrategyOptions::new();
        for name in ["hill_climbing", "annealing", "tabu", "reactive_tabu", "genetic", "pso"] {
            assert!(registry.create(name, &options).unwrap().is_fitness_based());
        }
        for name in ["exhaustive", "sobol", "morris", "beta", "stochanalysis"] {
            assert!(!registry.create(name, &options).unwrap().is_fitness_based());
        }
    }

    #[test]
    fn test_unknown_name_is_rejected() {
        let registry = StrategyRegistry::with_defaults();
        let err = registry
            .create("simplex", &StrategyOptions::new())
            .err()
            .unwrap();
        assert!(matches!(err, ExploreError::UnknownStrategy(ref name) if name == "simplex"));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_bad_options_surface_from_factory() {
        let registry = StrategyRegistry::with_defaults();
        let options = StrategyOptions::new().with("iter_max", "many");
        assert!(registry.create("hill_climbing", &options).is_err());
    }
}
