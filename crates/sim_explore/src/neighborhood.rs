//! Neighbour generation for local-search strategies.
//!
//! A generator maps a candidate point to a set of nearby points. Generated
//! sets are deduplicated and never contain the point they were generated from.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

use crate::parameters::{CandidatePoint, ParameterSpace};

pub trait NeighborhoodGenerator: Send + Sync {
    /// Neighbours of `point`, without duplicates and without `point` itself.
    fn neighbors(
        &self,
        space: &ParameterSpace,
        point: &CandidatePoint,
        rng: &mut StdRng,
    ) -> Vec<CandidatePoint>;
}

/// Changes one variable at a time.
///
/// Every other variable keeps the value it has in `point`; the changed one
/// takes each value of its descriptor's neighbour set in turn (±step for
/// numeric variables, every member for booleans and enumerations).
#[derive(Debug, Clone, Copy, Default)]
pub struct Neighborhood1Var;

impl NeighborhoodGenerator for Neighborhood1Var {
    fn neighbors(
        &self,
        space: &ParameterSpace,
        point: &CandidatePoint,
        _rng: &mut StdRng,
    ) -> Vec<CandidatePoint> {
        let mut neighbors = Vec::new();
        let mut seen = HashSet::new();
        for variable in space.variables() {
            let Some(current) = point.get(variable.name()) else {
                continue;
            };
            for value in variable.neighbor_values(current) {
                if &value == current {
                    continue;
                }
                let neighbor = point.with(variable.name(), value);
                if seen.insert(neighbor.clone()) {
                    neighbors.push(neighbor);
                }
            }
        }
        neighbors
    }
}

/// Perturbs every numeric variable at once with Gaussian noise.
///
/// The standard deviation is `sigma` times the width of each variable's range;
/// non-numeric variables keep their value.
#[derive(Debug, Clone, Copy)]
pub struct GaussianNeighborhood {
    pub sigma: f64,
    pub count: usize,
}

impl Default for GaussianNeighborhood {
    fn default() -> Self {
        Self {
            sigma: 0.1,
            count: 8,
        }
    }
}

impl NeighborhoodGenerator for GaussianNeighborhood {
    fn neighbors(
        &self,
        space: &ParameterSpace,
        point: &CandidatePoint,
        rng: &mut StdRng,
    ) -> Vec<CandidatePoint> {
        let mut neighbors = Vec::with_capacity(self.count);
        let mut seen = HashSet::with_capacity(self.count);
        for _ in 0..self.count {
            let mut neighbor = point.clone();
            for variable in space.variables() {
                let (Some((min, max)), Some(current)) = (
                    variable.numeric_bounds(),
                    point.get(variable.name()).and_then(|v| v.as_f64()),
                ) else {
                    continue;
                };
                let Ok(noise) = Normal::new(0.0, self.sigma * (max - min)) else {
                    continue;
                };
                if let Some(value) = variable.clamp_numeric(current + noise.sample(rng)) {
                    neighbor = neighbor.with(variable.name(), value);
                }
            }
            if &neighbor != point && seen.insert(neighbor.clone()) {
                neighbors.push(neighbor);
            }
        }
        neighbors
    }
}
