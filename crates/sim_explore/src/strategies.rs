//! Exploration strategies.
//!
//! Every strategy implements [`ExplorationStrategy`] and receives an explicit
//! [`ExplorationContext`] holding the parameter space, configuration,
//! dispatcher, random generator and fitness cache of one exploration run.
//! Fitness-based searches share one generic phase loop; sampling
//! strategies build a one-shot plan, evaluate it and post-process the results.

use std::fmt;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::warn;

use crate::analysis::{BetaReport, MorrisReport, SobolReport, StochasticityReport};
use crate::config::{ExplorationConfig, StrategyOptions};
use crate::dispatcher::{Dispatcher, EvaluationResult, ResultMap};
use crate::error::{ExploreError, Result};
use crate::export::{export_raw_results, SampleMatrix, SampleStore};
use crate::fitness::{Fitness, FitnessCache};
use crate::neighborhood::{GaussianNeighborhood, Neighborhood1Var, NeighborhoodGenerator};
use crate::parameters::{CandidatePoint, ParameterSpace};
use crate::stopping::StoppingCriterion;

#[path = "strategies/annealing.rs"]
mod annealing;
#[path = "strategies/beta.rs"]
mod beta;
#[path = "strategies/driver.rs"]
mod driver;
#[path = "strategies/exhaustive.rs"]
mod exhaustive;
#[path = "strategies/genetic.rs"]
mod genetic;
#[path = "strategies/hill_climbing.rs"]
mod hill_climbing;
#[path = "strategies/morris.rs"]
mod morris;
#[path = "strategies/sobol.rs"]
mod sobol;
#[path = "strategies/stochastic.rs"]
mod stochastic;
#[path = "strategies/swarm.rs"]
mod swarm;
#[path = "strategies/tabu.rs"]
mod tabu;
#[cfg(test)]
#[path = "strategies/test_support.rs"]
mod test_support;

pub use annealing::SimulatedAnnealing;
pub use beta::BetaExploration;
pub use exhaustive::{ExhaustiveExploration, SamplingMethod};
pub use genetic::{GeneticAlgorithm, Selection};
pub use hill_climbing::HillClimbing;
pub use morris::MorrisExploration;
pub use sobol::SobolExploration;
pub use stochastic::StochasticAnalysis;
pub use swarm::ParticleSwarm;
pub use tabu::{ReactiveTabuSearch, TabuSearch};

/// A pluggable exploration algorithm.
pub trait ExplorationStrategy: Send {
    /// Registry identifier, e.g. `"hill_climbing"`.
    fn name(&self) -> &'static str;

    /// Whether the strategy needs a [`Fitness`].
    fn is_fitness_based(&self) -> bool;

    fn explore(&mut self, ctx: &mut ExplorationContext<'_>) -> Result<ExplorationOutcome>;
}

/// Explicit state of one exploration run.
pub struct ExplorationContext<'a> {
    pub space: &'a ParameterSpace,
    pub config: &'a ExplorationConfig,
    pub dispatcher: &'a Dispatcher,
    pub store: &'a dyn SampleStore,
    pub fitness: Option<&'a Fitness>,
    /// User criterion, combined with the strategy's own by logical OR.
    pub stopping: Option<&'a dyn StoppingCriterion>,
    pub rng: StdRng,
    /// Fitness of every candidate tested in this run.
    pub cache: FitnessCache,
    /// Results in evaluation order.
    pub history: Vec<EvaluationResult>,
    /// Candidates dispatched so far.
    pub evaluations: usize,
    /// Report and result-file failures; they never abort the run.
    pub io_errors: Vec<ExploreError>,
    best: Option<(CandidatePoint, f64)>,
}

impl<'a> ExplorationContext<'a> {
    pub fn new(
        space: &'a ParameterSpace,
        config: &'a ExplorationConfig,
        dispatcher: &'a Dispatcher,
        store: &'a dyn SampleStore,
    ) -> Self {
        Self {
            space,
            config,
            dispatcher,
            store,
            fitness: None,
            stopping: None,
            rng: StdRng::seed_from_u64(config.effective_seed()),
            cache: FitnessCache::new(),
            history: Vec::new(),
            evaluations: 0,
            io_errors: Vec::new(),
            best: None,
        }
    }

    pub fn with_fitness(mut self, fitness: &'a Fitness) -> Self {
        self.fitness = Some(fitness);
        self
    }

    pub fn with_stopping(mut self, stopping: &'a dyn StoppingCriterion) -> Self {
        self.stopping = Some(stopping);
        self
    }

    pub fn require_fitness(&self) -> Result<&'a Fitness> {
        self.fitness.ok_or_else(|| {
            ExploreError::configuration("this strategy needs a fitness declaration")
        })
    }

    /// Best candidate evaluated so far with its fitness; the earliest one on ties.
    pub fn best(&self) -> Option<(&CandidatePoint, f64)> {
        self.best.as_ref().map(|(candidate, fitness)| (candidate, *fitness))
    }

    /// Fitness of each candidate, in input order.
    ///
    /// Candidates already in the cache are not dispatched again. `None` marks
    /// a failed evaluation.
    pub fn evaluate_fitness(&mut self, candidates: &[CandidatePoint]) -> Result<Vec<Option<f64>>> {
        let fitness = self.require_fitness()?;
        let pending: Vec<CandidatePoint> = candidates
            .iter()
            .filter(|candidate| !self.cache.contains(candidate))
            .cloned()
            .collect();
        if !pending.is_empty() {
            let mut results = self.dispatch(&pending);
            for candidate in pending {
                if self.cache.contains(&candidate) {
                    continue;
                }
                let Some(result) = results.remove(&candidate) else {
                    continue;
                };
                let value = fitness.evaluate(&result);
                if let Some(value) = value {
                    let improves = self.best.as_ref().map_or(true, |(_, best)| {
                        fitness.objective().is_better(value, *best)
                    });
                    if improves {
                        self.best = Some((candidate.clone(), value));
                    }
                }
                self.cache.insert(candidate, value);
                self.history.push(result);
            }
        }
        Ok(candidates
            .iter()
            .map(|candidate| self.cache.get(candidate).flatten())
            .collect())
    }

    /// Evaluate a sample plan through the dispatcher.
    pub fn dispatch(&mut self, candidates: &[CandidatePoint]) -> ResultMap {
        let results = self.dispatcher.evaluate(candidates);
        self.evaluations += results.len();
        results
    }

    /// Evaluate a sample plan with an explicit replicate count.
    pub fn dispatch_replicated(&mut self, candidates: &[CandidatePoint], replications: usize) -> ResultMap {
        let results = self.dispatcher.evaluate_replicated(candidates, replications);
        self.evaluations += results.len();
        results
    }

    /// Rows of the configured sample file if it exists, otherwise rows from
    /// `generate`, written to the sample file when one is configured.
    ///
    /// # Errors
    ///
    /// An existing file that cannot be read fails the run before any
    /// evaluation and is left untouched; a file whose cells do not fit the
    /// space is a configuration error.
    pub fn load_or_generate_sample<F>(&mut self, generate: F) -> Result<Vec<CandidatePoint>>
    where
        F: FnOnce(&mut StdRng) -> Result<Vec<CandidatePoint>>,
    {
        if let Some(path) = self.config.data_path.as_deref() {
            if self.store.exists(path) {
                let matrix = self.store.read_sample(path).map_err(|error| {
                    warn!(path = %path.display(), error = %error, "Unreadable sample file");
                    error
                })?;
                return matrix.to_candidates(self.space);
            }
        }

        let rows = generate(&mut self.rng)?;
        if let Some(path) = self.config.data_path.as_deref() {
            let matrix = SampleMatrix::from_candidates(self.space, &rows);
            if let Err(error) = self.store.write_sample(path, &matrix) {
                warn!(path = %path.display(), error = %error, "Failed to write sample file");
                self.io_errors.push(error);
            }
        }
        Ok(rows)
    }

    /// Write `text` to the configured report path, if any.
    pub fn write_report(&mut self, text: &str) {
        if let Some(path) = self.config.report_path.as_deref() {
            if let Err(error) = self.store.write_report(path, text) {
                warn!(path = %path.display(), error = %error, "Failed to write report");
                self.io_errors.push(error);
            }
        }
    }

    /// Write raw per-replicate results to the configured results path, if any.
    pub fn export_results<'r, I>(&mut self, results: I)
    where
        I: IntoIterator<Item = &'r EvaluationResult>,
    {
        if let Some(path) = self.config.results_path.as_deref() {
            if let Err(error) = export_raw_results(self.space, &self.config.outputs, results, path)
            {
                warn!(path = %path.display(), error = %error, "Failed to export raw results");
                self.io_errors.push(error);
            }
        }
    }

    /// Results of `rows` in plan order, skipping candidates without a result.
    pub fn ordered_results<'r>(
        rows: &[CandidatePoint],
        results: &'r ResultMap,
    ) -> Vec<&'r EvaluationResult> {
        let mut seen = std::collections::HashSet::new();
        rows.iter()
            .filter(|row| seen.insert(*row))
            .filter_map(|row| results.get(row))
            .collect()
    }
}

/// Neighbourhood named by the `neighborhood` option: `one_var` (default) or
/// `gaussian`, the latter tuned by `sigma` and `neighbors`.
pub(crate) fn neighborhood_from_options(
    options: &StrategyOptions,
) -> Result<Box<dyn NeighborhoodGenerator>> {
    match options.str_or("neighborhood", "one_var")? {
        "one_var" => Ok(Box::new(Neighborhood1Var)),
        "gaussian" => {
            let defaults = GaussianNeighborhood::default();
            let sigma = options.f64_or("sigma", defaults.sigma)?;
            if sigma.is_nan() || sigma <= 0.0 {
                return Err(ExploreError::configuration("sigma must be positive"));
            }
            Ok(Box::new(GaussianNeighborhood {
                sigma,
                count: options.usize_or("neighbors", defaults.count)?,
            }))
        }
        other => Err(ExploreError::configuration(format!(
            "unknown neighborhood '{other}'"
        ))),
    }
}

/// Write the run's raw results and the report of a finished search.
pub(crate) fn finish_search(
    ctx: &mut ExplorationContext<'_>,
    report: OptimizationReport,
) -> ExplorationOutcome {
    let history = std::mem::take(&mut ctx.history);
    ctx.export_results(&history);
    ctx.history = history;
    let outcome = ExplorationOutcome::Optimization(report);
    ctx.write_report(&outcome.report_text());
    outcome
}

/// Declared starting point of a local search.
///
/// Holds either an explicit (possibly partial) point or the `init_solution`
/// option, resolved against the parameter space at run time. Missing
/// variables are sampled.
#[derive(Debug, Clone, Default)]
pub struct InitialSolution {
    point: Option<CandidatePoint>,
    declared: Option<StrategyOptions>,
}

impl InitialSolution {
    pub fn from_options(options: &StrategyOptions) -> Self {
        Self {
            point: None,
            declared: options
                .contains("init_solution")
                .then(|| options.clone()),
        }
    }

    pub fn point(point: CandidatePoint) -> Self {
        Self {
            point: Some(point),
            declared: None,
        }
    }

    pub fn resolve(&self, ctx: &mut ExplorationContext<'_>) -> Result<CandidatePoint> {
        let partial = match (&self.point, &self.declared) {
            (Some(point), _) => Some(point.clone()),
            (None, Some(options)) => options.init_solution(ctx.space)?,
            (None, None) => None,
        };
        match partial {
            Some(partial) => ctx.space.complete(&partial, &mut ctx.rng),
            None => ctx.space.sample_default(&mut ctx.rng),
        }
    }
}

/// Result of a fitness-based search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationReport {
    pub strategy: String,
    pub best: Option<CandidatePoint>,
    pub best_fitness: Option<f64>,
    pub iterations: usize,
    pub evaluations: usize,
    /// True when the strategy stopped on its own (local optimum, cooled
    /// temperature) rather than on a stopping criterion.
    pub converged: bool,
    /// Best fitness after each iteration.
    pub trace: Vec<f64>,
}

impl fmt::Display for OptimizationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "OPTIMIZATION ({})", self.strategy)?;
        writeln!(f, "  iterations: {}", self.iterations)?;
        writeln!(f, "  evaluations: {}", self.evaluations)?;
        writeln!(f, "  converged: {}", self.converged)?;
        match (&self.best, self.best_fitness) {
            (Some(best), Some(fitness)) => {
                writeln!(f, "  best fitness: {fitness}")?;
                writeln!(f, "  best solution: {best}")
            }
            _ => writeln!(f, "  no successful evaluation"),
        }
    }
}

/// Result of an exhaustive or plan-based sweep.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepReport {
    pub points: usize,
    pub failed: usize,
    pub best: Option<CandidatePoint>,
    pub best_fitness: Option<f64>,
    pub results: Vec<EvaluationResult>,
}

impl fmt::Display for SweepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "EXHAUSTIVE EXPLORATION")?;
        writeln!(f, "  points: {} ({} failed)", self.points, self.failed)?;
        if let (Some(best), Some(fitness)) = (&self.best, self.best_fitness) {
            writeln!(f, "  best fitness: {fitness}")?;
            writeln!(f, "  best solution: {best}")?;
        }
        Ok(())
    }
}

/// What an exploration produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExplorationOutcome {
    Optimization(OptimizationReport),
    Sweep(SweepReport),
    Sobol(SobolReport),
    Morris(MorrisReport),
    Beta(BetaReport),
    Stochasticity(StochasticityReport),
}

impl ExplorationOutcome {
    /// Human-readable summary, as written to the report file.
    pub fn report_text(&self) -> String {
        match self {
            ExplorationOutcome::Optimization(report) => report.to_string(),
            ExplorationOutcome::Sweep(report) => report.to_string(),
            ExplorationOutcome::Sobol(report) => report.to_string(),
            ExplorationOutcome::Morris(report) => report.to_string(),
            ExplorationOutcome::Beta(report) => report.to_string(),
            ExplorationOutcome::Stochasticity(report) => report.to_string(),
        }
    }

    pub fn as_optimization(&self) -> Option<&OptimizationReport> {
        match self {
            ExplorationOutcome::Optimization(report) => Some(report),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExecutionMode;
    use crate::dispatcher::Outputs;
    use crate::export::CsvSampleStore;
    use crate::parameters::{Value, VariableDescriptor};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn space() -> ParameterSpace {
        let mut space = ParameterSpace::new();
        space.declare(VariableDescriptor::int("x", 0, 9)).unwrap();
        space
    }

    #[test]
    fn test_cached_candidates_are_not_redispatched() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let evaluator = move |c: &CandidatePoint, _: u64| -> std::result::Result<Outputs, String> {
            counter.fetch_add(1, Ordering::SeqCst);
            let x = c.get("x").and_then(Value::as_f64).unwrap_or(0.0);
            Ok(Outputs::from([("y".to_string(), x)]))
        };
        let space = space();
        let config = ExplorationConfig::new();
        let dispatcher = Dispatcher::new(Arc::new(evaluator), ExecutionMode::Sequential).unwrap();
        let fitness = Fitness::maximize("y");
        let mut ctx =
            ExplorationContext::new(&space, &config, &dispatcher, &CsvSampleStore).with_fitness(&fitness);

        let batch: Vec<CandidatePoint> = (0..4).map(|x| CandidatePoint::new().set("x", x as i64)).collect();
        let first = ctx.evaluate_fitness(&batch).unwrap();
        let second = ctx.evaluate_fitness(&batch).unwrap();

        assert_eq!(first, vec![Some(0.0), Some(1.0), Some(2.0), Some(3.0)]);
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(ctx.best().map(|(_, f)| f), Some(3.0));
        assert_eq!(ctx.history.len(), 4);
    }

    #[test]
    fn test_missing_fitness_is_configuration_error() {
        let space = space();
        let config = ExplorationConfig::new();
        let evaluator = |_: &CandidatePoint, _: u64| -> std::result::Result<Outputs, String> {
            Ok(Outputs::new())
        };
        let dispatcher = Dispatcher::new(Arc::new(evaluator), ExecutionMode::Sequential).unwrap();
        let mut ctx = ExplorationContext::new(&space, &config, &dispatcher, &CsvSampleStore);
        let err = ctx.evaluate_fitness(&[space.default_candidate()]).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_sample_is_written_then_read_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sample.csv");
        let space = space();
        let config = ExplorationConfig::new().data_path(&path);
        let evaluator = |_: &CandidatePoint, _: u64| -> std::result::Result<Outputs, String> {
            Ok(Outputs::new())
        };
        let dispatcher = Dispatcher::new(Arc::new(evaluator), ExecutionMode::Sequential).unwrap();

        let mut ctx = ExplorationContext::new(&space, &config, &dispatcher, &CsvSampleStore);
        let generated = ctx
            .load_or_generate_sample(|rng| space.sample_uniform(6, rng))
            .unwrap();
        assert!(path.exists());

        let mut ctx = ExplorationContext::new(&space, &config, &dispatcher, &CsvSampleStore);
        let read = ctx
            .load_or_generate_sample(|_| panic!("sample should be read from file"))
            .unwrap();
        assert_eq!(read, generated);
        assert!(ctx.io_errors.is_empty());
    }

    #[test]
    fn test_unreadable_sample_file_fails_and_is_kept() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sample.csv");
        let ragged = "x\n1,2\n3\n";
        std::fs::write(&path, ragged).unwrap();
        let space = space();
        let config = ExplorationConfig::new().data_path(&path);
        let evaluator = |_: &CandidatePoint, _: u64| -> std::result::Result<Outputs, String> {
            Ok(Outputs::new())
        };
        let dispatcher = Dispatcher::new(Arc::new(evaluator), ExecutionMode::Sequential).unwrap();
        let mut ctx = ExplorationContext::new(&space, &config, &dispatcher, &CsvSampleStore);

        let err = ctx
            .load_or_generate_sample(|_| panic!("an existing file must not be regenerated"))
            .unwrap_err();

        assert!(matches!(err, ExploreError::Csv(_)));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), ragged);
    }

    #[test]
    fn test_report_failure_is_collected() {
        let dir = tempdir().unwrap();
        // A directory cannot be written as a file.
        let config = ExplorationConfig::new().report_path(dir.path());
        let space = space();
        let evaluator = |_: &CandidatePoint, _: u64| -> std::result::Result<Outputs, String> {
            Ok(Outputs::new())
        };
        let dispatcher = Dispatcher::new(Arc::new(evaluator), ExecutionMode::Sequential).unwrap();
        let mut ctx = ExplorationContext::new(&space, &config, &dispatcher, &CsvSampleStore);

        ctx.write_report("text");

        assert_eq!(ctx.io_errors.len(), 1);
    }
}
