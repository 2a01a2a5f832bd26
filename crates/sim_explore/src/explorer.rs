//! Entry point tying a parameter space, a configuration and an evaluator to
//! the strategies.

use std::sync::Arc;

use tracing::info;

use crate::config::{ExplorationConfig, StrategyOptions};
use crate::dispatcher::{Dispatcher, Evaluator};
use crate::error::{ExploreError, Result};
use crate::export::{CsvSampleStore, SampleStore};
use crate::fitness::Fitness;
use crate::parameters::ParameterSpace;
use crate::registry::StrategyRegistry;
use crate::stopping::StoppingCriterion;
use crate::strategies::{ExplorationContext, ExplorationOutcome, ExplorationStrategy};

/// What one exploration run produced.
#[derive(Debug)]
pub struct ExplorationRun {
    pub outcome: ExplorationOutcome,
    /// Candidates dispatched to the evaluator.
    pub evaluations: usize,
    /// Report, sample and result-file failures collected during the run.
    pub io_errors: Vec<ExploreError>,
}

/// Owns everything a strategy needs and runs strategies against it.
///
/// # Example
///
/// ```no_run
/// use sim_explore::{Explorer, ExplorationConfig, Fitness, HillClimbing, Outputs};
/// use sim_explore::{CandidatePoint, ParameterSpace, Value, VariableDescriptor};
///
/// let space = ParameterSpace::new()
///     .with_variable(VariableDescriptor::int("x", 0, 10))?;
/// let config = ExplorationConfig::new().outputs(["y"]).seed(1);
/// let model = |c: &CandidatePoint, _seed: u64| -> Result<Outputs, String> {
///     let x = c.get("x").and_then(Value::as_f64).unwrap_or(0.0);
///     Ok(Outputs::from([("y".to_string(), -(x - 4.0).powi(2))]))
/// };
/// let explorer = Explorer::new(space, config, model)?.with_fitness(Fitness::maximize("y"));
/// let run = explorer.run(&mut HillClimbing::new())?;
/// println!("{}", run.outcome.report_text());
/// # Ok::<(), sim_explore::ExploreError>(())
/// ```
pub struct Explorer {
    space: ParameterSpace,
    config: ExplorationConfig,
    dispatcher: Dispatcher,
    fitness: Option<Fitness>,
    stopping: Option<Box<dyn StoppingCriterion>>,
    store: Box<dyn SampleStore>,
}

impl std::fmt::Debug for Explorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Explorer")
            .field("variables", &self.space.names())
            .field("config", &self.config)
            .field("dispatcher", &self.dispatcher)
            .field("fitness", &self.fitness)
            .field("stopping", &self.stopping)
            .finish_non_exhaustive()
    }
}

impl Explorer {
    /// # Errors
    ///
    /// Returns `Configuration` for an invalid configuration and `ThreadPool`
    /// if the parallel worker pool cannot be built.
    pub fn new<E>(space: ParameterSpace, config: ExplorationConfig, evaluator: E) -> Result<Self>
    where
        E: Evaluator + 'static,
    {
        let dispatcher = Dispatcher::from_config(Arc::new(evaluator), &config)?;
        Ok(Self {
            space,
            config,
            dispatcher,
            fitness: None,
            stopping: None,
            store: Box::new(CsvSampleStore),
        })
    }

    pub fn with_fitness(mut self, fitness: Fitness) -> Self {
        self.fitness = Some(fitness);
        self
    }

    /// Criterion checked in addition to each strategy's own.
    pub fn with_stopping(mut self, stopping: impl StoppingCriterion + 'static) -> Self {
        self.stopping = Some(Box::new(stopping));
        self
    }

    pub fn with_store(mut self, store: impl SampleStore + 'static) -> Self {
        self.store = Box::new(store);
        self
    }

    pub fn space(&self) -> &ParameterSpace {
        &self.space
    }

    pub fn config(&self) -> &ExplorationConfig {
        &self.config
    }

    /// Run `strategy` to completion.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` for an empty space or a fitness-based strategy
    /// without a fitness, and any setup error raised by the strategy. Failed
    /// evaluations and file-output failures are not errors.
    pub fn run(&self, strategy: &mut dyn ExplorationStrategy) -> Result<ExplorationRun> {
        if self.space.is_empty() {
            return Err(ExploreError::configuration(
                "the parameter space declares no variable",
            ));
        }
        if strategy.is_fitness_based() && self.fitness.is_none() {
            return Err(ExploreError::configuration(format!(
                "strategy '{}' needs a fitness",
                strategy.name()
            )));
        }

        let mut ctx =
            ExplorationContext::new(&self.space, &self.config, &self.dispatcher, self.store.as_ref());
        if let Some(fitness) = &self.fitness {
            ctx = ctx.with_fitness(fitness);
        }
        if let Some(stopping) = &self.stopping {
            ctx = ctx.with_stopping(stopping.as_ref());
        }

        info!(
            strategy = strategy.name(),
            variables = self.space.dimension(),
            mode = ?self.dispatcher.mode(),
            "Starting exploration"
        );
        let outcome = strategy.explore(&mut ctx)?;
        info!(
            strategy = strategy.name(),
            evaluations = ctx.evaluations,
            io_errors = ctx.io_errors.len(),
            "Exploration finished"
        );

        Ok(ExplorationRun {
            outcome,
            evaluations: ctx.evaluations,
            io_errors: ctx.io_errors,
        })
    }

    /// Build `name` from `registry` and run it.
    pub fn run_named(
        &self,
        registry: &StrategyRegistry,
        name: &str,
        options: &StrategyOptions,
    ) -> Result<ExplorationRun> {
        let mut strategy = registry.create(name, options)?;
        self.run(strategy.as_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::Outputs;
    use crate::parameters::{CandidatePoint, VariableDescriptor};
    use crate::strategies::HillClimbing;

    fn explorer() -> Explorer {
        let space = ParameterSpace::new()
            .with_variable(VariableDescriptor::int("x", 0, 5))
            .unwrap();
        let model = |_: &CandidatePoint, _: u64| -> std::result::Result<Outputs, String> {
            Ok(Outputs::from([("y".to_string(), 1.0)]))
        };
        Explorer::new(space, ExplorationConfig::new().sequential(), model).unwrap()
    }

    #[test]
    fn test_fitness_based_strategy_needs_fitness() {
        let err = explorer().run(&mut HillClimbing::new()).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_empty_space_is_rejected() {
        let model = |_: &CandidatePoint, _: u64| -> std::result::Result<Outputs, String> {
            Ok(Outputs::new())
        };
        let explorer = Explorer::new(ParameterSpace::new(), ExplorationConfig::new(), model)
            .unwrap()
            .with_fitness(Fitness::maximize("y"));
        assert!(explorer.run(&mut HillClimbing::new()).is_err());
    }

    #[test]
    fn test_flat_landscape_converges_immediately() {
        let explorer = explorer().with_fitness(Fitness::maximize("y"));
        let run = explorer.run(&mut HillClimbing::new()).unwrap();
        let report = run.outcome.as_optimization().unwrap();
        assert!(report.converged);
        assert_eq!(report.iterations, 1);
        assert!(run.io_errors.is_empty());
    }

    #[test]
    fn test_invalid_config_is_rejected_up_front() {
        let model = |_: &CandidatePoint, _: u64| -> std::result::Result<Outputs, String> {
            Ok(Outputs::new())
        };
        let config = ExplorationConfig::new().replications(0);
        assert!(Explorer::new(ParameterSpace::new(), config, model).is_err());
    }
}
