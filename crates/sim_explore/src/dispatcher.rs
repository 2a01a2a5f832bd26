//! Evaluation dispatch.
//!
//! The dispatcher is the only component that calls the external evaluator.
//! It runs each candidate of a batch exactly once per replicate, sequentially,
//! on a bounded rayon pool, or by delegating the whole batch, and returns the
//! results keyed by candidate.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{mpsc, Arc};

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::{ExecutionMode, ExplorationConfig};
use crate::error::{ExploreError, Result};
use crate::parameters::CandidatePoint;

/// Outputs recorded by one simulation run.
pub type Outputs = BTreeMap<String, f64>;

/// Derive the seed of replicate `replicate` from the exploration seed.
///
/// Replicate seeds are shared by every candidate so that candidates are
/// compared under common random numbers.
pub fn replicate_seed(seed: u64, replicate: usize) -> u64 {
    seed.wrapping_add(replicate as u64).wrapping_mul(0x9e3779b9)
}

/// External simulation collaborator.
pub trait Evaluator: Send + Sync {
    /// Run one simulation of `candidate` with the given RNG seed.
    fn evaluate(&self, candidate: &CandidatePoint, seed: u64) -> std::result::Result<Outputs, String>;

    /// Run a whole batch. Results are returned in request order.
    fn evaluate_batch(
        &self,
        requests: &[(CandidatePoint, u64)],
    ) -> Vec<std::result::Result<Outputs, String>> {
        requests
            .iter()
            .map(|(candidate, seed)| self.evaluate(candidate, *seed))
            .collect()
    }
}

impl<F> Evaluator for F
where
    F: Fn(&CandidatePoint, u64) -> std::result::Result<Outputs, String> + Send + Sync,
{
    fn evaluate(&self, candidate: &CandidatePoint, seed: u64) -> std::result::Result<Outputs, String> {
        self(candidate, seed)
    }
}

/// Failure reported by the evaluator for one replicate of a candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationFailure {
    pub message: String,
    pub replicate: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationOutcome {
    /// Output name to the values recorded across replicates, in replicate order.
    Completed(BTreeMap<String, Vec<f64>>),
    Failed(EvaluationFailure),
}

/// Outcome of evaluating one candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationResult {
    pub candidate: CandidatePoint,
    pub outcome: EvaluationOutcome,
}

impl EvaluationResult {
    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, EvaluationOutcome::Failed(_))
    }

    pub fn failure(&self) -> Option<&EvaluationFailure> {
        match &self.outcome {
            EvaluationOutcome::Failed(failure) => Some(failure),
            EvaluationOutcome::Completed(_) => None,
        }
    }

    pub fn outputs(&self) -> Option<&BTreeMap<String, Vec<f64>>> {
        match &self.outcome {
            EvaluationOutcome::Completed(outputs) => Some(outputs),
            EvaluationOutcome::Failed(_) => None,
        }
    }

    /// Values of `output` across replicates.
    pub fn values(&self, output: &str) -> Option<&[f64]> {
        self.outputs()?.get(output).map(Vec::as_slice)
    }

    /// Mean of `output` across replicates; `None` when failed, missing or
    /// not finite.
    pub fn value(&self, output: &str) -> Option<f64> {
        let values = self.values(output)?;
        if values.is_empty() {
            return None;
        }
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        mean.is_finite().then_some(mean)
    }
}

/// Candidate to result map returned by [`Dispatcher::evaluate`].
pub type ResultMap = HashMap<CandidatePoint, EvaluationResult>;

/// Runs batches of candidates against an [`Evaluator`].
pub struct Dispatcher {
    evaluator: Arc<dyn Evaluator>,
    mode: ExecutionMode,
    replications: usize,
    seed: u64,
    show_progress: bool,
    pool: Option<rayon::ThreadPool>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("mode", &self.mode)
            .field("replications", &self.replications)
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Create a dispatcher, building its worker pool for parallel execution.
    ///
    /// # Arguments
    ///
    /// * `evaluator` - The simulation collaborator
    /// * `mode` - Sequential, parallel (optionally bounded) or delegated execution
    ///
    /// # Errors
    ///
    /// Returns `ThreadPool` if the rayon pool cannot be built.
    pub fn new(evaluator: Arc<dyn Evaluator>, mode: ExecutionMode) -> Result<Self> {
        let pool = match mode {
            ExecutionMode::Parallel { threads } => {
                let mut builder = rayon::ThreadPoolBuilder::new();
                if let Some(threads) = threads {
                    builder = builder.num_threads(threads);
                }
                Some(
                    builder
                        .build()
                        .map_err(|error| ExploreError::ThreadPool(error.to_string()))?,
                )
            }
            ExecutionMode::Sequential | ExecutionMode::Delegated => None,
        };
        Ok(Self {
            evaluator,
            mode,
            replications: 1,
            seed: 42,
            show_progress: false,
            pool,
        })
    }

    pub fn from_config(evaluator: Arc<dyn Evaluator>, config: &ExplorationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(evaluator, config.execution)?
            .with_replications(config.replications)
            .with_seed(config.effective_seed())
            .with_progress(config.show_progress))
    }

    pub fn with_replications(mut self, replications: usize) -> Self {
        self.replications = replications.max(1);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn replications(&self) -> usize {
        self.replications
    }

    /// Evaluate every distinct candidate of `candidates`.
    ///
    /// Blocks until the whole batch has completed or failed. The key set of the
    /// returned map equals the set of distinct input candidates; a failing
    /// evaluation yields an [`EvaluationOutcome::Failed`] entry.
    pub fn evaluate(&self, candidates: &[CandidatePoint]) -> ResultMap {
        self.evaluate_replicated(candidates, self.replications)
    }

    /// Like [`Dispatcher::evaluate`] with an explicit replicate count.
    pub fn evaluate_replicated(&self, candidates: &[CandidatePoint], replications: usize) -> ResultMap {
        let replications = replications.max(1);
        let mut seen = HashSet::with_capacity(candidates.len());
        let unique: Vec<&CandidatePoint> = candidates
            .iter()
            .filter(|candidate| seen.insert(*candidate))
            .collect();
        if unique.is_empty() {
            return HashMap::new();
        }

        let tasks: Vec<(usize, usize)> = (0..unique.len())
            .flat_map(|index| (0..replications).map(move |replicate| (index, replicate)))
            .collect();
        debug!(
            candidates = unique.len(),
            evaluations = tasks.len(),
            mode = ?self.mode,
            "Dispatching batch"
        );

        let progress = self.progress_bar(tasks.len());
        let raw = match (&self.mode, &self.pool) {
            (ExecutionMode::Delegated, _) => self.run_delegated(&unique, &tasks),
            (ExecutionMode::Parallel { .. }, Some(pool)) => {
                self.run_parallel(pool, &unique, &tasks, progress.as_ref())
            }
            _ => self.run_sequential(&unique, &tasks, progress.as_ref()),
        };
        if let Some(bar) = &progress {
            bar.finish_with_message("Completed");
        }

        self.assemble(&unique, replications, raw)
    }

    fn progress_bar(&self, total: usize) -> Option<ProgressBar> {
        if !self.show_progress || total == 0 {
            return None;
        }
        let bar = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        {
            bar.set_style(style.progress_chars("#>-"));
        }
        Some(bar)
    }

    fn run_one(&self, candidate: &CandidatePoint, replicate: usize) -> std::result::Result<Outputs, String> {
        let seed = replicate_seed(self.seed, replicate);
        catch_unwind(AssertUnwindSafe(|| self.evaluator.evaluate(candidate, seed)))
            .unwrap_or_else(|_| Err("evaluation panicked".to_string()))
    }

    fn run_sequential(
        &self,
        unique: &[&CandidatePoint],
        tasks: &[(usize, usize)],
        progress: Option<&ProgressBar>,
    ) -> Vec<(usize, usize, std::result::Result<Outputs, String>)> {
        tasks
            .iter()
            .map(|&(index, replicate)| {
                let result = self.run_one(unique[index], replicate);
                if let Some(bar) = progress {
                    bar.inc(1);
                }
                (index, replicate, result)
            })
            .collect()
    }

    fn run_parallel(
        &self,
        pool: &rayon::ThreadPool,
        unique: &[&CandidatePoint],
        tasks: &[(usize, usize)],
        progress: Option<&ProgressBar>,
    ) -> Vec<(usize, usize, std::result::Result<Outputs, String>)> {
        let (sender, receiver) = mpsc::channel();
        pool.scope(|scope| {
            for &(index, replicate) in tasks {
                let sender = sender.clone();
                let candidate = unique[index];
                scope.spawn(move |_| {
                    let result = self.run_one(candidate, replicate);
                    if let Some(bar) = progress {
                        bar.inc(1);
                    }
                    // The receiver outlives the scope.
                    let _ = sender.send((index, replicate, result));
                });
            }
        });
        drop(sender);
        receiver.into_iter().collect()
    }

    fn run_delegated(
        &self,
        unique: &[&CandidatePoint],
        tasks: &[(usize, usize)],
    ) -> Vec<(usize, usize, std::result::Result<Outputs, String>)> {
        let requests: Vec<(CandidatePoint, u64)> = tasks
            .iter()
            .map(|&(index, replicate)| {
                (unique[index].clone(), replicate_seed(self.seed, replicate))
            })
            .collect();
        let mut responses = self.evaluator.evaluate_batch(&requests).into_iter();
        tasks
            .iter()
            .map(|&(index, replicate)| {
                let result = responses
                    .next()
                    .unwrap_or_else(|| Err("batch evaluator returned too few results".to_string()));
                (index, replicate, result)
            })
            .collect()
    }

    fn assemble(
        &self,
        unique: &[&CandidatePoint],
        replications: usize,
        raw: Vec<(usize, usize, std::result::Result<Outputs, String>)>,
    ) -> ResultMap {
        let mut per_candidate: Vec<Vec<Option<std::result::Result<Outputs, String>>>> =
            vec![vec![None; replications]; unique.len()];
        for (index, replicate, result) in raw {
            per_candidate[index][replicate] = Some(result);
        }

        let mut results = HashMap::with_capacity(unique.len());
        for (candidate, replicates) in unique.iter().zip(per_candidate) {
            let outcome = merge_replicates(replicates);
            if let EvaluationOutcome::Failed(failure) = &outcome {
                warn!(
                    candidate = %candidate,
                    replicate = failure.replicate,
                    error = %failure.message,
                    "Evaluation failed"
                );
            }
            results.insert(
                (*candidate).clone(),
                EvaluationResult {
                    candidate: (*candidate).clone(),
                    outcome,
                },
            );
        }
        results
    }
}

fn merge_replicates(
    replicates: Vec<Option<std::result::Result<Outputs, String>>>,
) -> EvaluationOutcome {
    let mut merged: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for (replicate, result) in replicates.into_iter().enumerate() {
        match result {
            Some(Ok(outputs)) => {
                for (name, value) in outputs {
                    merged.entry(name).or_default().push(value);
                }
            }
            Some(Err(message)) => {
                return EvaluationOutcome::Failed(EvaluationFailure { message, replicate })
            }
            None => {
                return EvaluationOutcome::Failed(EvaluationFailure {
                    message: "no result recorded".to_string(),
                    replicate,
                })
            }
        }
    }
    EvaluationOutcome::Completed(merged)
}
