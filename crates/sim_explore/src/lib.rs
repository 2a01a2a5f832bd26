//! Parameter-space exploration for stochastic simulation models.
//!
//! This crate drives a black-box model (anything implementing [`Evaluator`])
//! over a declared parameter space, either to optimise a fitness with a local
//! or population-based search, or to run a structured sensitivity analysis
//! (Sobol, Morris, β^d) or a replicate-count analysis on a sample plan.
//!
//! # Quick Start
//!
//! ```no_run
//! use sim_explore::{
//!     CandidatePoint, ExplorationConfig, Explorer, Outputs, ParameterSpace, StrategyOptions,
//!     StrategyRegistry, Value, VariableDescriptor,
//! };
//!
//! let space = ParameterSpace::new()
//!     .with_variable(VariableDescriptor::float("rate", 0.0, 1.0))?
//!     .with_variable(VariableDescriptor::int("agents", 10, 100))?;
//!
//! let config = ExplorationConfig::new()
//!     .sample_size(64)
//!     .outputs(["throughput"])
//!     .report_path("sobol_report.txt")
//!     .data_path("sobol_sample.csv");
//!
//! let model = |c: &CandidatePoint, _seed: u64| -> Result<Outputs, String> {
//!     let rate = c.get("rate").and_then(Value::as_f64).ok_or("missing rate")?;
//!     let agents = c.get("agents").and_then(Value::as_f64).ok_or("missing agents")?;
//!     Ok(Outputs::from([("throughput".to_string(), rate * agents)]))
//! };
//!
//! let explorer = Explorer::new(space, config, model)?;
//! let registry = StrategyRegistry::with_defaults();
//! let run = explorer.run_named(&registry, "sobol", &StrategyOptions::new())?;
//! println!("{}", run.outcome.report_text());
//! # Ok::<(), sim_explore::ExploreError>(())
//! ```
//!
//! # Architecture
//!
//! - [`parameters`]: Variables, domains, candidate points, grids and samplers
//! - [`neighborhood`]: Neighbour generation for local searches
//! - [`stopping`]: Search state and stopping criteria
//! - [`dispatcher`]: Batch evaluation (sequential, rayon pool or delegated)
//! - [`fitness`]: Objectives, aggregation over replicates and the fitness cache
//! - [`sampling`]: Saltelli and Morris sample plans
//! - [`analysis`]: Sobol, Morris, β^d and stochasticity estimators; Electre
//! - [`strategies`]: The exploration algorithms
//! - [`registry`]: Strategy lookup by name
//! - [`export`]: Sample files, reports, raw results and JSON export

pub mod analysis;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod explorer;
pub mod export;
pub mod fitness;
pub mod neighborhood;
pub mod parameters;
pub mod registry;
pub mod sampling;
pub mod stopping;
pub mod strategies;

pub use analysis::{Alternative, Criterion, Electre, Relation};
pub use config::{ExecutionMode, ExplorationConfig, StrategyOptions};
pub use dispatcher::{Dispatcher, EvaluationOutcome, EvaluationResult, Evaluator, Outputs};
pub use error::{ExploreError, Result};
pub use explorer::{ExplorationRun, Explorer};
pub use export::{export_raw_results, export_to_json, CsvSampleStore, SampleMatrix, SampleStore};
pub use fitness::{Aggregation, Fitness, Objective};
pub use neighborhood::{GaussianNeighborhood, Neighborhood1Var, NeighborhoodGenerator};
pub use parameters::{CandidatePoint, Domain, ParameterSpace, Value, VariableDescriptor, VariableKind};
pub use registry::StrategyRegistry;
pub use stopping::{AnyOf, MaxIterations, NoImprovement, StoppingCriterion, TargetFitness, TimeBudget};
pub use strategies::{
    BetaExploration, ExhaustiveExploration, ExplorationContext, ExplorationOutcome,
    ExplorationStrategy, GeneticAlgorithm, HillClimbing, MorrisExploration, ParticleSwarm,
    ReactiveTabuSearch, SimulatedAnnealing, SobolExploration, StochasticAnalysis, TabuSearch,
};
