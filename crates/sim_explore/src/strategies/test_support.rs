use std::sync::Arc;

use super::{ExplorationContext, ExplorationOutcome, ExplorationStrategy, OptimizationReport};
use crate::config::{ExecutionMode, ExplorationConfig};
use crate::dispatcher::{Dispatcher, Outputs};
use crate::export::CsvSampleStore;
use crate::fitness::Fitness;
use crate::parameters::{CandidatePoint, ParameterSpace, Value, VariableDescriptor};

/// Two integer variables on 0..=20.
pub fn peak_space() -> ParameterSpace {
    let mut space = ParameterSpace::new();
    space.declare(VariableDescriptor::int("x", 0, 20)).unwrap();
    space.declare(VariableDescriptor::int("y", 0, 20)).unwrap();
    space
}

/// `height = -(x - 7)^2 - (y - 3)^2`, peaking at 0.
pub fn peak(candidate: &CandidatePoint, _seed: u64) -> Result<Outputs, String> {
    let coord = |name: &str| candidate.get(name).and_then(Value::as_f64).ok_or(format!("missing {name}"));
    let (x, y) = (coord("x")?, coord("y")?);
    Ok(Outputs::from([(
        "height".to_string(),
        -(x - 7.0).powi(2) - (y - 3.0).powi(2),
    )]))
}

pub fn dispatcher() -> Dispatcher {
    Dispatcher::new(Arc::new(peak), ExecutionMode::Sequential).unwrap()
}

pub fn run_peak(strategy: &mut dyn ExplorationStrategy) -> OptimizationReport {
    let space = peak_space();
    let config = ExplorationConfig::new().seed(7).outputs(["height"]);
    let dispatcher = dispatcher();
    let fitness = Fitness::maximize("height");
    let mut ctx =
        ExplorationContext::new(&space, &config, &dispatcher, &CsvSampleStore).with_fitness(&fitness);
    match strategy.explore(&mut ctx).unwrap() {
        ExplorationOutcome::Optimization(report) => report,
        other => panic!("expected an optimization outcome, got {other:?}"),
    }
}
