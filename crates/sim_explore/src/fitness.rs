//! Fitness derivation for optimisation strategies.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::dispatcher::EvaluationResult;
use crate::parameters::CandidatePoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    #[default]
    Maximize,
    Minimize,
}

impl Objective {
    /// Whether `candidate` is strictly better than `incumbent`.
    pub fn is_better(self, candidate: f64, incumbent: f64) -> bool {
        match self {
            Objective::Maximize => candidate > incumbent,
            Objective::Minimize => candidate < incumbent,
        }
    }

    /// Fitness change expressed so that positive means improvement.
    pub fn gain(self, candidate: f64, incumbent: f64) -> f64 {
        match self {
            Objective::Maximize => candidate - incumbent,
            Objective::Minimize => incumbent - candidate,
        }
    }
}

/// Reduction of an output's replicate values to one scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    #[default]
    Mean,
    Min,
    Max,
}

impl Aggregation {
    pub fn apply(self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        let value = match self {
            Aggregation::Mean => values.iter().sum::<f64>() / values.len() as f64,
            Aggregation::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Aggregation::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        };
        Some(value)
    }
}

type CustomFitness = Arc<dyn Fn(&EvaluationResult) -> Option<f64> + Send + Sync>;

#[derive(Clone)]
enum FitnessSource {
    Output {
        name: String,
        aggregation: Aggregation,
    },
    Custom(CustomFitness),
}

/// Scalar score of an evaluation result, with its optimisation direction.
#[derive(Clone)]
pub struct Fitness {
    objective: Objective,
    source: FitnessSource,
}

impl fmt::Debug for Fitness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Fitness");
        debug.field("objective", &self.objective);
        match &self.source {
            FitnessSource::Output { name, aggregation } => debug
                .field("output", name)
                .field("aggregation", aggregation),
            FitnessSource::Custom(_) => debug.field("output", &"<custom>"),
        };
        debug.finish()
    }
}

impl Fitness {
    pub fn maximize(output: impl Into<String>) -> Self {
        Self::output(output, Objective::Maximize)
    }

    pub fn minimize(output: impl Into<String>) -> Self {
        Self::output(output, Objective::Minimize)
    }

    pub fn output(output: impl Into<String>, objective: Objective) -> Self {
        Self {
            objective,
            source: FitnessSource::Output {
                name: output.into(),
                aggregation: Aggregation::Mean,
            },
        }
    }

    /// Fitness computed by an arbitrary expression over the result.
    pub fn custom<F>(objective: Objective, f: F) -> Self
    where
        F: Fn(&EvaluationResult) -> Option<f64> + Send + Sync + 'static,
    {
        Self {
            objective,
            source: FitnessSource::Custom(Arc::new(f)),
        }
    }

    /// Replicate aggregation; ignored for custom fitness.
    pub fn aggregation(mut self, aggregation: Aggregation) -> Self {
        if let FitnessSource::Output { aggregation: a, .. } = &mut self.source {
            *a = aggregation;
        }
        self
    }

    pub fn objective(&self) -> Objective {
        self.objective
    }

    /// Fitness of `result`; `None` for failed evaluations and non-finite values.
    pub fn evaluate(&self, result: &EvaluationResult) -> Option<f64> {
        if result.is_failed() {
            return None;
        }
        let value = match &self.source {
            FitnessSource::Output { name, aggregation } => {
                aggregation.apply(result.values(name)?)?
            }
            FitnessSource::Custom(f) => f(result)?,
        };
        value.is_finite().then_some(value)
    }
}

/// Fitness of every candidate tested so far.
///
/// `None` records a candidate whose evaluation failed, so it is not
/// dispatched again.
#[derive(Debug, Clone, Default)]
pub struct FitnessCache {
    entries: HashMap<CandidatePoint, Option<f64>>,
}

impl FitnessCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, candidate: &CandidatePoint) -> Option<Option<f64>> {
        self.entries.get(candidate).copied()
    }

    pub fn contains(&self, candidate: &CandidatePoint) -> bool {
        self.entries.contains_key(candidate)
    }

    pub fn insert(&mut self, candidate: CandidatePoint, fitness: Option<f64>) {
        self.entries.insert(candidate, fitness);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Best cached candidate under `objective`.
    pub fn best(&self, objective: Objective) -> Option<(&CandidatePoint, f64)> {
        self.entries
            .iter()
            .filter_map(|(candidate, fitness)| fitness.map(|f| (candidate, f)))
            .fold(None, |best, (candidate, fitness)| match best {
                Some((_, incumbent)) if !objective.is_better(fitness, incumbent) => best,
                _ => Some((candidate, fitness)),
            })
    }
}
