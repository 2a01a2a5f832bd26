use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Beta, Distribution};

use super::{CandidatePoint, ParameterSpace};
use crate::error::{ExploreError, Result};

impl ParameterSpace {
    /// Draw `count` independent candidates (Monte Carlo sampling).
    pub fn sample_uniform(&self, count: usize, rng: &mut StdRng) -> Result<Vec<CandidatePoint>> {
        (0..count).map(|_| self.sample_default(rng)).collect()
    }

    /// Latin hypercube design of `count` points.
    ///
    /// Each variable's unit interval is split into `count` strata and every
    /// stratum is used exactly once per variable.
    pub fn latin_hypercube(&self, count: usize, rng: &mut StdRng) -> Result<Vec<CandidatePoint>> {
        self.ensure_samplable()?;
        let columns: Vec<Vec<f64>> = (0..self.dimension())
            .map(|_| {
                let mut strata: Vec<usize> = (0..count).collect();
                strata.shuffle(rng);
                strata
                    .into_iter()
                    .map(|stratum| (stratum as f64 + rng.gen::<f64>()) / count as f64)
                    .collect()
            })
            .collect();
        Ok((0..count)
            .map(|row| {
                let units: Vec<f64> = columns.iter().map(|column| column[row]).collect();
                self.from_unit_row(&units)
            })
            .collect())
    }

    /// Unit-space matrix of `count` rows drawn from Beta(`alpha`, `beta`)
    /// marginals. `alpha = beta = 1` is the uniform distribution.
    pub fn beta_unit_matrix(
        &self,
        count: usize,
        alpha: f64,
        beta: f64,
        rng: &mut StdRng,
    ) -> Result<Vec<Vec<f64>>> {
        self.ensure_samplable()?;
        let distribution = Beta::new(alpha, beta).map_err(|error| {
            ExploreError::configuration(format!(
                "invalid beta parameters ({alpha}, {beta}): {error}"
            ))
        })?;
        Ok((0..count)
            .map(|_| {
                (0..self.dimension())
                    .map(|_| distribution.sample(rng))
                    .collect()
            })
            .collect())
    }

    /// Unit-space matrix of `count` uniform rows.
    pub fn uniform_unit_matrix(&self, count: usize, rng: &mut StdRng) -> Result<Vec<Vec<f64>>> {
        self.ensure_samplable()?;
        Ok((0..count)
            .map(|_| (0..self.dimension()).map(|_| rng.gen::<f64>()).collect())
            .collect())
    }
}
