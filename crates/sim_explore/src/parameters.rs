//! Typed parameter space for exploration.
//!
//! This module provides the variable descriptors that an experiment declares
//! as explorable, the candidate points built over them, and the default
//! sampling used to seed searches.

use std::collections::HashSet;

use rand::Rng;

use crate::error::{ExploreError, Result};

#[path = "parameters/candidate.rs"]
mod candidate;
#[path = "parameters/combinations.rs"]
mod combinations;
#[path = "parameters/domain.rs"]
mod domain;
#[path = "parameters/sampling.rs"]
mod sampling;
#[path = "parameters/value.rs"]
mod value;

pub use candidate::CandidatePoint;
pub use domain::{Domain, VariableDescriptor};
pub use value::{Value, VariableKind};

/// Ordered set of explorable variables.
///
/// Declaration order is the column order of sample files and reports.
#[derive(Debug, Clone, Default)]
pub struct ParameterSpace {
    variables: Vec<VariableDescriptor>,
}

impl ParameterSpace {
    /// Create an empty parameter space.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an explorable variable.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDomain` for inverted bounds, non-positive steps, empty
    /// enumerations or enumeration members of the wrong kind, and
    /// `Configuration` when the name is already declared.
    pub fn declare(&mut self, variable: VariableDescriptor) -> Result<()> {
        variable.validate_domain()?;
        if self.get(variable.name()).is_some() {
            return Err(ExploreError::configuration(format!(
                "variable '{}' is declared twice",
                variable.name()
            )));
        }
        self.variables.push(variable);
        Ok(())
    }

    /// Builder form of [`declare`](Self::declare).
    pub fn with_variable(mut self, variable: VariableDescriptor) -> Result<Self> {
        self.declare(variable)?;
        Ok(self)
    }

    pub fn variables(&self) -> &[VariableDescriptor] {
        &self.variables
    }

    pub fn get(&self, name: &str) -> Option<&VariableDescriptor> {
        self.variables.iter().find(|v| v.name() == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.variables.iter().map(|v| v.name().to_string()).collect()
    }

    /// Number of declared variables (`k` in the sampling formulas).
    pub fn dimension(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// True when `candidate` assigns exactly one admissible value to every
    /// declared variable and nothing else.
    pub fn validate(&self, candidate: &CandidatePoint) -> bool {
        if candidate.len() != self.variables.len() {
            return false;
        }
        let mut seen = HashSet::new();
        candidate.iter().all(|(name, value)| {
            seen.insert(name)
                && self
                    .get(name)
                    .map(|variable| variable.contains(value))
                    .unwrap_or(false)
        })
    }

    /// Draw a candidate with every variable sampled from its domain.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedVariableKind` for free-text variables.
    pub fn sample_default<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<CandidatePoint> {
        let mut entries = Vec::with_capacity(self.variables.len());
        for variable in &self.variables {
            entries.push((variable.name().to_string(), variable.sample(rng)?));
        }
        Ok(CandidatePoint::from_entries(entries))
    }

    /// Candidate assembled from unit coordinates, one per variable in
    /// declaration order.
    pub fn from_unit_row(&self, row: &[f64]) -> CandidatePoint {
        CandidatePoint::from_entries(
            self.variables
                .iter()
                .zip(row.iter())
                .map(|(variable, u)| (variable.name().to_string(), variable.from_unit(*u))),
        )
    }

    /// Candidate holding every variable at its default value.
    pub fn default_candidate(&self) -> CandidatePoint {
        CandidatePoint::from_entries(
            self.variables
                .iter()
                .map(|v| (v.name().to_string(), v.default_value())),
        )
    }

    /// Complete a partial assignment (e.g. a declared initial solution) with
    /// sampled values, checking every provided value against its domain.
    pub fn complete<R: Rng + ?Sized>(
        &self,
        partial: &CandidatePoint,
        rng: &mut R,
    ) -> Result<CandidatePoint> {
        if let Some(unknown) = partial.names().find(|name| self.get(name).is_none()) {
            return Err(ExploreError::configuration(format!(
                "initial solution names unknown variable '{unknown}'"
            )));
        }
        let mut entries = Vec::with_capacity(self.variables.len());
        for variable in &self.variables {
            let value = match partial.get(variable.name()) {
                Some(value) if variable.contains(value) => value.clone(),
                Some(value) => {
                    return Err(ExploreError::configuration(format!(
                        "initial value {value} is outside the domain of '{}'",
                        variable.name()
                    )))
                }
                None => variable.sample(rng)?,
            };
            entries.push((variable.name().to_string(), value));
        }
        Ok(CandidatePoint::from_entries(entries))
    }

    /// Fail with `UnsupportedVariableKind` if a structured sampler cannot
    /// place every variable on the unit interval.
    pub fn ensure_samplable(&self) -> Result<()> {
        match self.variables.iter().find(|v| !v.is_samplable()) {
            Some(variable) => Err(variable.unsupported()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "parameters/tests.rs"]
mod tests;
