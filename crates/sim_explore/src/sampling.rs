//! Structured sample plans for sensitivity analysis.
//!
//! Plans are built in unit space and mapped onto the parameter space row by
//! row; the row layout is what the matching estimator in
//! [`analysis`](crate::analysis) expects.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{ExploreError, Result};
use crate::parameters::{CandidatePoint, ParameterSpace};

/// Saltelli design: `A`, `B`, then `A_Bi` for every variable, then `B_Ai`.
///
/// `A_Bi` is `A` with column `i` taken from `B`; `B_Ai` is the symmetric
/// substitution. The plan has `sample_size * (2k + 2)` rows.
#[derive(Debug, Clone, PartialEq)]
pub struct SaltelliPlan {
    sample_size: usize,
    dimension: usize,
    rows: Vec<CandidatePoint>,
}

impl SaltelliPlan {
    /// Number of rows required for `sample_size` base samples over `dimension`
    /// variables.
    pub fn expected_rows(sample_size: usize, dimension: usize) -> usize {
        sample_size * (2 * dimension + 2)
    }

    /// Generate a plan with uniform unit-space base matrices.
    pub fn generate(space: &ParameterSpace, sample_size: usize, rng: &mut StdRng) -> Result<Self> {
        let a = space.uniform_unit_matrix(sample_size, rng)?;
        let b = space.uniform_unit_matrix(sample_size, rng)?;
        let k = space.dimension();

        let mut rows = Vec::with_capacity(Self::expected_rows(sample_size, k));
        rows.extend(a.iter().map(|row| space.from_unit_row(row)));
        rows.extend(b.iter().map(|row| space.from_unit_row(row)));
        for (base, other) in [(&a, &b), (&b, &a)] {
            for i in 0..k {
                for (base_row, other_row) in base.iter().zip(other.iter()) {
                    let mut hybrid = base_row.clone();
                    hybrid[i] = other_row[i];
                    rows.push(space.from_unit_row(&hybrid));
                }
            }
        }
        Ok(Self {
            sample_size,
            dimension: k,
            rows,
        })
    }

    /// Wrap rows read from a sample file.
    ///
    /// # Errors
    ///
    /// Returns `SampleMismatch` unless there are exactly
    /// `sample_size * (2k + 2)` rows.
    pub fn from_rows(
        rows: Vec<CandidatePoint>,
        sample_size: usize,
        dimension: usize,
    ) -> Result<Self> {
        let expected = Self::expected_rows(sample_size, dimension);
        if rows.len() != expected {
            return Err(ExploreError::SampleMismatch {
                expected,
                found: rows.len(),
            });
        }
        Ok(Self {
            sample_size,
            dimension,
            rows,
        })
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn rows(&self) -> &[CandidatePoint] {
        &self.rows
    }

    pub fn a(&self, j: usize) -> &CandidatePoint {
        &self.rows[j]
    }

    pub fn b(&self, j: usize) -> &CandidatePoint {
        &self.rows[self.sample_size + j]
    }

    pub fn a_b(&self, i: usize, j: usize) -> &CandidatePoint {
        &self.rows[(2 + i) * self.sample_size + j]
    }

    pub fn b_a(&self, i: usize, j: usize) -> &CandidatePoint {
        &self.rows[(2 + self.dimension + i) * self.sample_size + j]
    }
}

/// One move along a Morris trajectory: `variable` changed by `delta` in unit
/// space between consecutive rows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MorrisStep {
    pub variable: usize,
    pub delta: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    /// Index of the trajectory's first row in the plan.
    pub start: usize,
    pub steps: Vec<MorrisStep>,
}

/// Elementary-effects design: `trajectories` one-at-a-time walks of `k + 1`
/// rows each on a `levels`-point grid.
#[derive(Debug, Clone, PartialEq)]
pub struct MorrisPlan {
    levels: usize,
    rows: Vec<CandidatePoint>,
    trajectories: Vec<Trajectory>,
}

impl MorrisPlan {
    pub fn expected_rows(trajectories: usize, dimension: usize) -> usize {
        trajectories * (dimension + 1)
    }

    /// Grid jump `p / (2(p - 1))` for `p` levels.
    pub fn delta(levels: usize) -> f64 {
        levels as f64 / (2.0 * (levels as f64 - 1.0))
    }

    /// Generate `trajectories` random trajectories.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` unless `levels` is even and at least 2.
    pub fn generate(
        space: &ParameterSpace,
        levels: usize,
        trajectories: usize,
        rng: &mut StdRng,
    ) -> Result<Self> {
        validate_levels(levels)?;
        space.ensure_samplable()?;
        let k = space.dimension();
        let delta = Self::delta(levels);
        let base_levels = levels / 2;
        let mut rows = Vec::with_capacity(Self::expected_rows(trajectories, k));
        let mut walks = Vec::with_capacity(trajectories);

        for _ in 0..trajectories {
            let mut point: Vec<f64> = (0..k)
                .map(|_| rng.gen_range(0..base_levels) as f64 / (levels as f64 - 1.0))
                .collect();
            let mut order: Vec<usize> = (0..k).collect();
            order.shuffle(rng);

            let start = rows.len();
            rows.push(space.from_unit_row(&point));
            let mut steps = Vec::with_capacity(k);
            for variable in order {
                point[variable] += delta;
                rows.push(space.from_unit_row(&point));
                steps.push(MorrisStep { variable, delta });
            }
            walks.push(Trajectory { start, steps });
        }

        Ok(Self {
            levels,
            rows,
            trajectories: walks,
        })
    }

    /// Rebuild the trajectory structure of rows read from a sample file.
    ///
    /// Consecutive rows of a trajectory must differ in exactly one variable;
    /// other moves are ignored by the estimator.
    pub fn from_rows(
        space: &ParameterSpace,
        rows: Vec<CandidatePoint>,
        levels: usize,
        trajectories: usize,
    ) -> Result<Self> {
        validate_levels(levels)?;
        let k = space.dimension();
        let expected = Self::expected_rows(trajectories, k);
        if rows.len() != expected {
            return Err(ExploreError::SampleMismatch {
                expected,
                found: rows.len(),
            });
        }

        let mut walks = Vec::with_capacity(trajectories);
        for t in 0..trajectories {
            let start = t * (k + 1);
            let mut steps = Vec::with_capacity(k);
            for s in 0..k {
                let (before, after) = (&rows[start + s], &rows[start + s + 1]);
                let changed: Vec<usize> = space
                    .variables()
                    .iter()
                    .enumerate()
                    .filter(|(_, v)| before.get(v.name()) != after.get(v.name()))
                    .map(|(i, _)| i)
                    .collect();
                if let [variable] = changed.as_slice() {
                    let descriptor = &space.variables()[*variable];
                    let unit = |c: &CandidatePoint| {
                        c.get(descriptor.name()).and_then(|v| descriptor.to_unit(v))
                    };
                    if let (Some(u0), Some(u1)) = (unit(before), unit(after)) {
                        steps.push(MorrisStep {
                            variable: *variable,
                            delta: u1 - u0,
                        });
                    }
                }
            }
            walks.push(Trajectory { start, steps });
        }

        Ok(Self {
            levels,
            rows,
            trajectories: walks,
        })
    }

    pub fn levels(&self) -> usize {
        self.levels
    }

    pub fn rows(&self) -> &[CandidatePoint] {
        &self.rows
    }

    pub fn trajectories(&self) -> &[Trajectory] {
        &self.trajectories
    }
}

fn validate_levels(levels: usize) -> Result<()> {
    if levels < 2 || levels % 2 != 0 {
        return Err(ExploreError::configuration(format!(
            "Morris levels must be an even number of at least 2, got {levels}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::VariableDescriptor;
    use rand::SeedableRng;

    fn unit_space(k: usize) -> ParameterSpace {
        let mut space = ParameterSpace::new();
        for i in 0..k {
            space
                .declare(VariableDescriptor::float(format!("x{i}"), 0.0, 1.0))
                .unwrap();
        }
        space
    }

    #[test]
    fn test_saltelli_row_count() {
        let space = unit_space(3);
        let mut rng = StdRng::seed_from_u64(1);
        let plan = SaltelliPlan::generate(&space, 100, &mut rng).unwrap();
        assert_eq!(plan.rows().len(), 800);
        assert_eq!(SaltelliPlan::expected_rows(100, 3), 800);
    }

    #[test]
    fn test_saltelli_hybrids_take_one_column() {
        let space = unit_space(3);
        let mut rng = StdRng::seed_from_u64(2);
        let plan = SaltelliPlan::generate(&space, 5, &mut rng).unwrap();

        for i in 0..3 {
            let name = format!("x{i}");
            for j in 0..5 {
                let a_b = plan.a_b(i, j);
                let b_a = plan.b_a(i, j);
                for other in (0..3).map(|o| format!("x{o}")) {
                    if other == name {
                        assert_eq!(a_b.get(&other), plan.b(j).get(&other));
                        assert_eq!(b_a.get(&other), plan.a(j).get(&other));
                    } else {
                        assert_eq!(a_b.get(&other), plan.a(j).get(&other));
                        assert_eq!(b_a.get(&other), plan.b(j).get(&other));
                    }
                }
            }
        }
    }

    #[test]
    fn test_saltelli_from_rows_checks_count() {
        let rows = vec![CandidatePoint::new(); 799];
        let err = SaltelliPlan::from_rows(rows, 100, 3).unwrap_err();
        assert!(matches!(
            err,
            ExploreError::SampleMismatch {
                expected: 800,
                found: 799
            }
        ));
    }

    #[test]
    fn test_morris_trajectories_move_one_variable_per_step() {
        let space = unit_space(4);
        let mut rng = StdRng::seed_from_u64(3);
        let plan = MorrisPlan::generate(&space, 4, 6, &mut rng).unwrap();

        assert_eq!(plan.rows().len(), 30);
        let delta = MorrisPlan::delta(4);
        assert!((delta - 2.0 / 3.0).abs() < 1e-12);
        for trajectory in plan.trajectories() {
            let mut moved: Vec<usize> = trajectory.steps.iter().map(|s| s.variable).collect();
            moved.sort_unstable();
            assert_eq!(moved, vec![0, 1, 2, 3]);
        }

        let rebuilt =
            MorrisPlan::from_rows(&space, plan.rows().to_vec(), 4, 6).unwrap();
        for (original, read) in plan.trajectories().iter().zip(rebuilt.trajectories()) {
            assert_eq!(original.steps.len(), read.steps.len());
            for (a, b) in original.steps.iter().zip(read.steps.iter()) {
                assert_eq!(a.variable, b.variable);
                assert!((a.delta - b.delta).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_morris_rejects_odd_levels() {
        let space = unit_space(2);
        let mut rng = StdRng::seed_from_u64(3);
        assert!(MorrisPlan::generate(&space, 3, 2, &mut rng)
            .unwrap_err()
            .is_configuration());
    }
}
