//! Search state and stopping criteria.
//!
//! Criteria are pure predicates over [`SearchState`]; only the owning
//! strategy mutates the state, between dispatch calls.

use std::fmt;
use std::time::{Duration, Instant};

use crate::fitness::Objective;

/// Phase of the generic search loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    Init,
    EvaluateSeed,
    CheckStop,
    Generate,
    Evaluate,
    Terminated,
}

/// Running counters of one exploration.
#[derive(Debug, Clone)]
pub struct SearchState {
    pub iteration: usize,
    pub best_fitness: Option<f64>,
    pub last_improvement_iteration: usize,
    pub evaluations: usize,
    pub phase: SearchPhase,
    /// Set by a strategy when it cannot make further progress (local optimum,
    /// empty neighbourhood, cooled temperature).
    pub converged: bool,
    started: Instant,
}

impl Default for SearchState {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchState {
    pub fn new() -> Self {
        Self {
            iteration: 0,
            best_fitness: None,
            last_improvement_iteration: 0,
            evaluations: 0,
            phase: SearchPhase::Init,
            converged: false,
            started: Instant::now(),
        }
    }

    /// State whose clock started at `started`.
    pub fn started_at(started: Instant) -> Self {
        Self {
            started,
            ..Self::new()
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Record a fitness value; returns true if it improved the best one.
    pub fn record(&mut self, fitness: f64, objective: Objective) -> bool {
        let improved = self
            .best_fitness
            .map_or(true, |best| objective.is_better(fitness, best));
        if improved {
            self.best_fitness = Some(fitness);
            self.last_improvement_iteration = self.iteration;
        }
        improved
    }
}

pub trait StoppingCriterion: Send + Sync + fmt::Debug {
    fn should_stop(&self, state: &SearchState) -> bool;
}

/// Stops once the iteration counter exceeds `n`.
#[derive(Debug, Clone, Copy)]
pub struct MaxIterations(pub usize);

impl StoppingCriterion for MaxIterations {
    fn should_stop(&self, state: &SearchState) -> bool {
        state.iteration > self.0
    }
}

/// Stops when the best fitness reaches `target`.
#[derive(Debug, Clone, Copy)]
pub struct TargetFitness {
    pub target: f64,
    pub objective: Objective,
}

impl StoppingCriterion for TargetFitness {
    fn should_stop(&self, state: &SearchState) -> bool {
        match (state.best_fitness, self.objective) {
            (Some(best), Objective::Maximize) => best >= self.target,
            (Some(best), Objective::Minimize) => best <= self.target,
            (None, _) => false,
        }
    }
}

/// Stops after `k` iterations without improvement of the best fitness.
#[derive(Debug, Clone, Copy)]
pub struct NoImprovement(pub usize);

impl StoppingCriterion for NoImprovement {
    fn should_stop(&self, state: &SearchState) -> bool {
        state.iteration.saturating_sub(state.last_improvement_iteration) >= self.0
    }
}

/// Stops once the wall-clock budget is spent. Checked between batches only.
#[derive(Debug, Clone, Copy)]
pub struct TimeBudget(pub Duration);

impl StoppingCriterion for TimeBudget {
    fn should_stop(&self, state: &SearchState) -> bool {
        state.elapsed() >= self.0
    }
}

/// Logical OR of several criteria.
#[derive(Debug, Default)]
pub struct AnyOf(pub Vec<Box<dyn StoppingCriterion>>);

impl AnyOf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn or(mut self, criterion: impl StoppingCriterion + 'static) -> Self {
        self.0.push(Box::new(criterion));
        self
    }
}

impl StoppingCriterion for AnyOf {
    fn should_stop(&self, state: &SearchState) -> bool {
        self.0.iter().any(|criterion| criterion.should_stop(state))
    }
}
