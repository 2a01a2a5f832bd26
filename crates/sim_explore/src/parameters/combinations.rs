use super::{CandidatePoint, ParameterSpace, Value};
use crate::error::Result;

impl ParameterSpace {
    /// Generate the full factorial design.
    ///
    /// Each variable contributes its sweep values (`grid_values`); the result
    /// is the cartesian product in declaration order, the last variable
    /// varying fastest.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedVariableKind` for free-text variables.
    pub fn grid(&self) -> Result<Vec<CandidatePoint>> {
        let mut axes = Vec::with_capacity(self.variables.len());
        for variable in &self.variables {
            axes.push((variable.name().to_string(), variable.grid_values()?));
        }
        Ok(cartesian_product(&axes))
    }

    /// Number of points [`grid`](Self::grid) would produce.
    pub fn grid_size(&self) -> Result<usize> {
        let mut size = 1usize;
        for variable in &self.variables {
            size = size.saturating_mul(variable.grid_values()?.len());
        }
        Ok(size)
    }
}

fn cartesian_product(axes: &[(String, Vec<Value>)]) -> Vec<CandidatePoint> {
    let mut combinations = vec![Vec::<(String, Value)>::new()];
    for (name, values) in axes {
        let mut next = Vec::with_capacity(combinations.len() * values.len());
        for partial in &combinations {
            for value in values {
                let mut extended = partial.clone();
                extended.push((name.clone(), value.clone()));
                next.push(extended);
            }
        }
        combinations = next;
    }
    combinations
        .into_iter()
        .map(CandidatePoint::from_entries)
        .collect()
}
