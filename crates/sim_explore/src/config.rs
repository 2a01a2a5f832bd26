//! Exploration configuration.
//!
//! [`ExplorationConfig`] carries the options shared by every strategy;
//! [`StrategyOptions`] carries the strategy-specific facets of an experiment
//! declaration as loosely-typed JSON with typed accessors.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::{ExploreError, Result};
use crate::parameters::{CandidatePoint, ParameterSpace, Value, VariableKind};

/// How the dispatcher runs a batch of evaluations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ExecutionMode {
    /// One evaluation at a time on the calling thread. Required when the
    /// simulation cannot run two instances concurrently.
    Sequential,
    /// Bounded rayon pool; `None` uses one thread per available core.
    Parallel { threads: Option<usize> },
    /// Whole batch handed to the evaluator's `evaluate_batch`.
    Delegated,
}

impl Default for ExecutionMode {
    fn default() -> Self {
        ExecutionMode::Parallel { threads: None }
    }
}

/// Options shared by every exploration strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorationConfig {
    /// Number of base samples for structured sampling strategies.
    pub sample_size: Option<usize>,
    /// Output names to analyse or optimise, in report order.
    pub outputs: Vec<String>,
    pub report_path: Option<PathBuf>,
    /// Precomputed sample file; read if it exists, written otherwise.
    pub data_path: Option<PathBuf>,
    /// Raw per-replicate results CSV.
    pub results_path: Option<PathBuf>,
    pub seed: Option<u64>,
    pub execution: ExecutionMode,
    pub replications: usize,
    pub show_progress: bool,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self {
            sample_size: None,
            outputs: Vec::new(),
            report_path: None,
            data_path: None,
            results_path: None,
            seed: None,
            execution: ExecutionMode::default(),
            replications: 1,
            show_progress: false,
        }
    }
}

impl ExplorationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = Some(sample_size);
        self
    }

    pub fn outputs<I, S>(mut self, outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.outputs = outputs.into_iter().map(Into::into).collect();
        self
    }

    pub fn report_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.report_path = Some(path.into());
        self
    }

    pub fn data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = Some(path.into());
        self
    }

    pub fn results_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.results_path = Some(path.into());
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn execution(mut self, execution: ExecutionMode) -> Self {
        self.execution = execution;
        self
    }

    pub fn sequential(self) -> Self {
        self.execution(ExecutionMode::Sequential)
    }

    pub fn replications(mut self, replications: usize) -> Self {
        self.replications = replications;
        self
    }

    pub fn show_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Seed used for every random draw of the exploration.
    pub fn effective_seed(&self) -> u64 {
        self.seed.unwrap_or(42)
    }

    /// Checks that hold for every strategy.
    pub fn validate(&self) -> Result<()> {
        if self.replications == 0 {
            return Err(ExploreError::configuration(
                "replications must be at least 1",
            ));
        }
        if let ExecutionMode::Parallel { threads: Some(0) } = self.execution {
            return Err(ExploreError::configuration(
                "parallel execution needs at least one thread",
            ));
        }
        Ok(())
    }

    /// Checks required by the structured sampling strategies.
    ///
    /// Returns the sample size on success.
    pub fn validate_for_sampling(&self) -> Result<usize> {
        self.validate()?;
        if self.outputs.is_empty() {
            return Err(ExploreError::configuration(
                "at least one output must be declared",
            ));
        }
        match self.sample_size {
            Some(size) if size > 0 => Ok(size),
            Some(_) => Err(ExploreError::configuration("sample_size must be positive")),
            None => Err(ExploreError::configuration(
                "sample_size is required for sampling strategies",
            )),
        }
    }
}

/// Strategy-specific options, e.g. `{"iter_max": 50, "tabu_list_size": 5}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrategyOptions(Map<String, JsonValue>);

impl StrategyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    fn wrong_type(key: &str, expected: &str, found: &JsonValue) -> ExploreError {
        ExploreError::configuration(format!(
            "option '{key}' should be {expected}, found {found}"
        ))
    }

    pub fn f64_or(&self, key: &str, default: f64) -> Result<f64> {
        match self.0.get(key) {
            None => Ok(default),
            Some(value) => value
                .as_f64()
                .ok_or_else(|| Self::wrong_type(key, "a number", value)),
        }
    }

    pub fn usize_or(&self, key: &str, default: usize) -> Result<usize> {
        match self.0.get(key) {
            None => Ok(default),
            Some(value) => value
                .as_u64()
                .map(|v| v as usize)
                .ok_or_else(|| Self::wrong_type(key, "a non-negative integer", value)),
        }
    }

    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool> {
        match self.0.get(key) {
            None => Ok(default),
            Some(value) => value
                .as_bool()
                .ok_or_else(|| Self::wrong_type(key, "a boolean", value)),
        }
    }

    pub fn str_or<'a>(&'a self, key: &str, default: &'a str) -> Result<&'a str> {
        match self.0.get(key) {
            None => Ok(default),
            Some(value) => value
                .as_str()
                .ok_or_else(|| Self::wrong_type(key, "a string", value)),
        }
    }

    pub fn optional_f64(&self, key: &str) -> Result<Option<f64>> {
        match self.0.get(key) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(value) => value
                .as_f64()
                .map(Some)
                .ok_or_else(|| Self::wrong_type(key, "a number", value)),
        }
    }

    /// Partial initial solution declared under `init_solution`.
    ///
    /// JSON values are converted according to each variable's kind; unknown
    /// variable names are rejected.
    pub fn init_solution(&self, space: &ParameterSpace) -> Result<Option<CandidatePoint>> {
        let Some(raw) = self.0.get("init_solution") else {
            return Ok(None);
        };
        let object = raw
            .as_object()
            .ok_or_else(|| Self::wrong_type("init_solution", "an object", raw))?;
        let mut entries = Vec::with_capacity(object.len());
        for (name, json) in object {
            let variable = space.get(name).ok_or_else(|| {
                ExploreError::configuration(format!(
                    "init_solution names unknown variable '{name}'"
                ))
            })?;
            let value = json_to_value(variable.kind(), json).ok_or_else(|| {
                ExploreError::configuration(format!(
                    "init_solution value {json} does not fit variable '{name}' of kind {}",
                    variable.kind()
                ))
            })?;
            entries.push((name.clone(), value));
        }
        Ok(Some(CandidatePoint::from_entries(entries)))
    }
}

fn json_to_value(kind: VariableKind, json: &JsonValue) -> Option<Value> {
    match (kind, json) {
        (VariableKind::Integer, JsonValue::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64))
            .map(Value::Int),
        (VariableKind::Date, JsonValue::Number(n)) => n.as_i64().map(Value::Date),
        (VariableKind::Float, JsonValue::Number(n)) => n.as_f64().map(Value::float),
        (VariableKind::Boolean, JsonValue::Bool(b)) => Some(Value::Bool(*b)),
        (VariableKind::Point, JsonValue::Array(items)) => {
            let coords: Vec<f64> = items.iter().map(JsonValue::as_f64).collect::<Option<_>>()?;
            match coords.as_slice() {
                [x, y] => Some(Value::point(*x, *y, 0.0)),
                [x, y, z] => Some(Value::point(*x, *y, *z)),
                _ => None,
            }
        }
        (kind, JsonValue::String(raw)) => Value::parse_as(kind, raw),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::VariableDescriptor;

    #[test]
    fn test_config_from_json_uses_defaults() {
        let config = ExplorationConfig::from_json_str(
            r#"{"sample_size": 100, "outputs": ["y"], "execution": {"mode": "sequential"}}"#,
        )
        .unwrap();
        assert_eq!(config.sample_size, Some(100));
        assert_eq!(config.replications, 1);
        assert_eq!(config.execution, ExecutionMode::Sequential);
        assert!(config.data_path.is_none());
    }

    #[test]
    fn test_sampling_requires_size_and_outputs() {
        let missing_size = ExplorationConfig::new().outputs(["y"]);
        assert!(missing_size
            .validate_for_sampling()
            .unwrap_err()
            .is_configuration());

        let missing_outputs = ExplorationConfig::new().sample_size(10);
        assert!(missing_outputs.validate_for_sampling().is_err());

        let zero = ExplorationConfig::new().sample_size(0).outputs(["y"]);
        assert!(zero.validate_for_sampling().is_err());

        let ok = ExplorationConfig::new().sample_size(10).outputs(["y"]);
        assert_eq!(ok.validate_for_sampling().unwrap(), 10);
    }

    #[test]
    fn test_zero_replications_rejected() {
        let result = ExplorationConfig::from_json_str(r#"{"replications": 0}"#);
        assert!(result.unwrap_err().is_configuration());
    }

    #[test]
    fn test_options_typed_getters() {
        let options = StrategyOptions::new()
            .with("iter_max", 20)
            .with("temp_init", 50.5)
            .with("stochastic_sel", true)
            .with("mode", "fast");
        assert_eq!(options.usize_or("iter_max", 50).unwrap(), 20);
        assert_eq!(options.usize_or("missing", 50).unwrap(), 50);
        assert_eq!(options.f64_or("temp_init", 100.0).unwrap(), 50.5);
        assert!(options.bool_or("stochastic_sel", false).unwrap());
        assert_eq!(options.str_or("mode", "slow").unwrap(), "fast");
        assert!(options.usize_or("mode", 1).is_err());
    }

    #[test]
    fn test_init_solution_converts_by_kind() {
        let mut space = ParameterSpace::new();
        space.declare(VariableDescriptor::int("n", 0, 10)).unwrap();
        space.declare(VariableDescriptor::float("r", 0.0, 1.0)).unwrap();
        space.declare(VariableDescriptor::boolean("b")).unwrap();

        let options = StrategyOptions::from_json_str(
            r#"{"init_solution": {"n": 4, "r": 0.25, "b": "true"}}"#,
        )
        .unwrap();
        let init = options.init_solution(&space).unwrap().unwrap();
        assert_eq!(init.get("n"), Some(&Value::Int(4)));
        assert_eq!(init.get("r"), Some(&Value::float(0.25)));
        assert_eq!(init.get("b"), Some(&Value::Bool(true)));

        let unknown = StrategyOptions::from_json_str(r#"{"init_solution": {"zz": 1}}"#).unwrap();
        assert!(unknown.init_solution(&space).is_err());
    }
}
