//! Example: Exploring a toy service-queue model.
//!
//! This example demonstrates how to:
//! 1. Declare a parameter space over model inputs
//! 2. Rank the inputs with Sobol and Morris sensitivity analyses
//! 3. Tune the inputs with a genetic algorithm and simulated annealing
//! 4. Check how many replicates the model needs
//!
//! Run with `RUST_LOG=sim_explore=debug` to see per-iteration progress.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sim_explore::{
    CandidatePoint, ExplorationConfig, Explorer, ExploreError, Fitness, Outputs, ParameterSpace,
    StrategyOptions, StrategyRegistry, Value, VariableDescriptor,
};
use tracing_subscriber::EnvFilter;

/// Queue served by `servers` desks, simulated minute by minute over one shift.
fn service_queue(candidate: &CandidatePoint, seed: u64) -> Result<Outputs, String> {
    let get = |name: &str| {
        candidate
            .get(name)
            .and_then(Value::as_f64)
            .ok_or_else(|| format!("missing variable {name}"))
    };
    let arrival_rate = get("arrival_rate")?;
    let service_rate = get("service_rate")?;
    let servers = get("servers")?;

    let mut rng = StdRng::seed_from_u64(seed);
    let capacity = service_rate * servers;
    let mut backlog = 0.0_f64;
    let mut waited = 0.0;
    let mut served = 0.0;
    for _ in 0..480 {
        let arrivals = arrival_rate * rng.gen_range(0.5..1.5);
        backlog += arrivals;
        let done = backlog.min(capacity);
        backlog -= done;
        served += done;
        waited += backlog;
    }
    let staffing_cost = servers * 25.0;
    Ok(Outputs::from([
        ("throughput".to_string(), served / 480.0),
        ("mean_backlog".to_string(), waited / 480.0),
        ("profit".to_string(), served * 0.4 - staffing_cost - waited * 0.01),
    ]))
}

fn space() -> Result<ParameterSpace, ExploreError> {
    ParameterSpace::new()
        .with_variable(VariableDescriptor::float("arrival_rate", 1.0, 10.0))?
        .with_variable(VariableDescriptor::float("service_rate", 0.5, 3.0))?
        .with_variable(VariableDescriptor::int("servers", 1, 12))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sim_explore=info")),
        )
        .init();

    let registry = StrategyRegistry::with_defaults();
    let outputs = ["throughput", "mean_backlog", "profit"];

    println!("=== Sensitivity ===");
    let config = ExplorationConfig::new().sample_size(256).outputs(outputs).seed(1);
    let explorer = Explorer::new(space()?, config, service_queue)?;
    for name in ["sobol", "morris"] {
        let run = explorer.run_named(&registry, name, &StrategyOptions::new())?;
        println!("{}", run.outcome.report_text());
    }

    println!("=== Optimisation ===");
    let config = ExplorationConfig::new().outputs(["profit"]).replications(3).seed(2);
    let explorer =
        Explorer::new(space()?, config, service_queue)?.with_fitness(Fitness::maximize("profit"));
    let options = StrategyOptions::new()
        .with("pop_dim", 12)
        .with("max_gen", 25)
        .with("iter_max", 200);
    for name in ["genetic", "annealing"] {
        let run = explorer.run_named(&registry, name, &options)?;
        println!("{}", run.outcome.report_text());
        println!("Dispatched {} candidates", run.evaluations);
    }

    println!("=== Replicates ===");
    let config = ExplorationConfig::new().sample_size(20).outputs(["profit"]).seed(3);
    let explorer = Explorer::new(space()?, config, service_queue)?;
    let run = explorer.run_named(
        &registry,
        "stochanalysis",
        &StrategyOptions::new().with("replicates", 30),
    )?;
    println!("{}", run.outcome.report_text());

    Ok(())
}
