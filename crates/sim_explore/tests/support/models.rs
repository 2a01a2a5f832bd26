#![allow(dead_code)]

use std::f64::consts::PI;

use sim_explore::{CandidatePoint, Outputs, ParameterSpace, Value, VariableDescriptor};

fn coord(candidate: &CandidatePoint, name: &str) -> Result<f64, String> {
    candidate
        .get(name)
        .and_then(Value::as_f64)
        .ok_or_else(|| format!("missing variable {name}"))
}

/// Three float variables on [-π, π].
pub fn ishigami_space() -> ParameterSpace {
    ParameterSpace::new()
        .with_variable(VariableDescriptor::float("x1", -PI, PI))
        .and_then(|s| s.with_variable(VariableDescriptor::float("x2", -PI, PI)))
        .and_then(|s| s.with_variable(VariableDescriptor::float("x3", -PI, PI)))
        .expect("valid ishigami space")
}

/// Ishigami function with a = 7, b = 0.1; output `y`.
///
/// Analytic first-order indices are about 0.314, 0.442 and 0.
pub fn ishigami(candidate: &CandidatePoint, _seed: u64) -> Result<Outputs, String> {
    let (x1, x2, x3) = (
        coord(candidate, "x1")?,
        coord(candidate, "x2")?,
        coord(candidate, "x3")?,
    );
    let y = x1.sin() + 7.0 * x2.sin().powi(2) + 0.1 * x3.powi(4) * x1.sin();
    Ok(Outputs::from([("y".to_string(), y)]))
}

/// Integer `a` on 0..=30 and boolean `boost`.
pub fn discrete_space() -> ParameterSpace {
    ParameterSpace::new()
        .with_variable(VariableDescriptor::int("a", 0, 30))
        .and_then(|s| s.with_variable(VariableDescriptor::boolean("boost")))
        .expect("valid discrete space")
}

/// `score = -(a - 12)^2 + (boost ? 5 : 0)`, maximal at a = 12 with boost.
pub fn discrete_bowl(candidate: &CandidatePoint, _seed: u64) -> Result<Outputs, String> {
    let a = coord(candidate, "a")?;
    let boost = matches!(candidate.get("boost"), Some(Value::Bool(true)));
    let score = -(a - 12.0).powi(2) + if boost { 5.0 } else { 0.0 };
    Ok(Outputs::from([("score".to_string(), score)]))
}

/// Fails whenever `a` is odd.
pub fn flaky_bowl(candidate: &CandidatePoint, seed: u64) -> Result<Outputs, String> {
    let a = coord(candidate, "a")?;
    if (a as i64) % 2 == 1 {
        return Err(format!("model diverged at a = {a}"));
    }
    discrete_bowl(candidate, seed)
}

/// `y = a + noise`, where the noise depends on the replicate seed.
pub fn noisy_linear(candidate: &CandidatePoint, seed: u64) -> Result<Outputs, String> {
    let a = coord(candidate, "a")?;
    let noise = (seed % 1000) as f64 / 1000.0 - 0.5;
    Ok(Outputs::from([("y".to_string(), 10.0 + a + noise)]))
}
