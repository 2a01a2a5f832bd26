mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sim_explore::{
    CandidatePoint, ExplorationConfig, Explorer, Fitness, HillClimbing, Objective, Outputs,
    StrategyOptions, StrategyRegistry, TargetFitness, TimeBudget, Value,
};
use support::models::{discrete_bowl, discrete_space, flaky_bowl};

fn bowl_explorer() -> Explorer {
    let config = ExplorationConfig::new().outputs(["score"]).seed(11);
    Explorer::new(discrete_space(), config, discrete_bowl)
        .unwrap()
        .with_fitness(Fitness::maximize("score"))
}

#[test]
fn hill_climbing_terminates_at_the_discrete_optimum() {
    let explorer = bowl_explorer();
    let start = CandidatePoint::new().set("a", 0i64).set("boost", false);
    let run = explorer
        .run(&mut HillClimbing::new().iter_max(100).init_solution(start))
        .unwrap();

    let report = run.outcome.as_optimization().unwrap();
    assert!(report.converged);
    assert_eq!(report.best_fitness, Some(5.0));
    let best = report.best.as_ref().unwrap();
    assert_eq!(best.get("a"), Some(&Value::Int(12)));
    assert_eq!(best.get("boost"), Some(&Value::Bool(true)));
}

#[test]
fn every_optimizer_in_the_registry_returns_a_valid_best() {
    let explorer = bowl_explorer();
    let registry = StrategyRegistry::with_defaults();
    let options = StrategyOptions::new().with("iter_max", 60).with("max_gen", 30);

    for name in ["hill_climbing", "annealing", "tabu", "reactive_tabu", "genetic", "pso"] {
        let run = explorer.run_named(&registry, name, &options).unwrap();
        let report = run.outcome.as_optimization().unwrap();
        assert_eq!(report.strategy, name);
        assert!(report.best_fitness.unwrap() <= 5.0);
        assert!(explorer.space().validate(report.best.as_ref().unwrap()));
        assert!(report.evaluations > 0);
    }
}

#[test]
fn failed_candidates_are_never_selected() {
    let config = ExplorationConfig::new().outputs(["score"]).seed(5);
    let explorer = Explorer::new(discrete_space(), config, flaky_bowl)
        .unwrap()
        .with_fitness(Fitness::maximize("score"));
    let registry = StrategyRegistry::with_defaults();

    for name in ["genetic", "tabu", "exhaustive"] {
        let run = explorer
            .run_named(&registry, name, &StrategyOptions::new())
            .unwrap();
        let best = match &run.outcome {
            sim_explore::ExplorationOutcome::Optimization(report) => report.best.clone(),
            sim_explore::ExplorationOutcome::Sweep(report) => report.best.clone(),
            other => panic!("unexpected outcome {other:?}"),
        };
        if let Some(best) = best {
            let a = best.get("a").and_then(Value::as_f64).unwrap();
            assert_eq!(a as i64 % 2, 0, "{name} selected a failed candidate");
        }
    }
}

#[test]
fn target_fitness_stops_the_search_early() {
    let explorer = bowl_explorer().with_stopping(TargetFitness {
        target: -100.0,
        objective: Objective::Maximize,
    });
    let start = CandidatePoint::new().set("a", 30i64).set("boost", false);
    let run = explorer
        .run(&mut HillClimbing::new().init_solution(start))
        .unwrap();

    let report = run.outcome.as_optimization().unwrap();
    assert!(!report.converged);
    assert!(report.best_fitness.unwrap() >= -100.0);
    assert!(report.best_fitness.unwrap() < 5.0);
}

#[test]
fn exhausted_time_budget_stops_after_the_seed() {
    let explorer = bowl_explorer().with_stopping(TimeBudget(Duration::ZERO));
    let run = explorer.run(&mut HillClimbing::new()).unwrap();
    let report = run.outcome.as_optimization().unwrap();
    assert_eq!(report.iterations, 0);
    assert_eq!(report.evaluations, 1);
}

#[test]
fn a_candidate_is_dispatched_at_most_once_per_run() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(std::sync::Mutex::new(std::collections::HashSet::new()));
    let (counter, visited) = (Arc::clone(&calls), Arc::clone(&seen));
    let model = move |c: &CandidatePoint, seed: u64| -> Result<Outputs, String> {
        counter.fetch_add(1, Ordering::SeqCst);
        visited.lock().unwrap().insert(c.clone());
        discrete_bowl(c, seed)
    };
    let config = ExplorationConfig::new().outputs(["score"]).sequential();
    let explorer = Explorer::new(discrete_space(), config, model)
        .unwrap()
        .with_fitness(Fitness::maximize("score"));

    let run = explorer
        .run_named(
            &StrategyRegistry::with_defaults(),
            "tabu",
            &StrategyOptions::new().with("iter_max", 40),
        )
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), seen.lock().unwrap().len());
    assert_eq!(run.evaluations, calls.load(Ordering::SeqCst));
}
