use rand::Rng;

use super::driver::{improves, run_search, Scored, SearchPolicy};
use super::{finish_search, ExplorationContext, ExplorationOutcome, ExplorationStrategy};
use crate::config::StrategyOptions;
use crate::error::{ExploreError, Result};
use crate::parameters::{CandidatePoint, ParameterSpace};
use crate::stopping::{MaxIterations, SearchState, StoppingCriterion};

#[derive(Debug, Clone)]
struct Particle {
    /// Unclamped position, one entry per numeric variable.
    position: Vec<f64>,
    velocity: Vec<f64>,
    /// Non-numeric variables keep the values drawn at start.
    base: CandidatePoint,
    best: Option<(Vec<f64>, f64)>,
}

/// Particle swarm optimisation over the numeric variables.
///
/// Velocities follow `w·v + c1·r1·(pbest − x) + c2·r2·(gbest − x)`. Positions
/// are clamped to each variable's bounds; a clamped axis loses its velocity.
pub struct ParticleSwarm {
    particles: usize,
    iter_max: MaxIterations,
    inertia: f64,
    cognitive: f64,
    social: f64,
    swarm: Vec<Particle>,
    global_best: Option<(Vec<f64>, f64)>,
    axes: Vec<usize>,
}

impl ParticleSwarm {
    pub fn new() -> Self {
        Self {
            particles: 10,
            iter_max: MaxIterations(50),
            inertia: 0.729,
            cognitive: 1.49445,
            social: 1.49445,
            swarm: Vec::new(),
            global_best: None,
            axes: Vec::new(),
        }
    }

    /// Options: `particles`, `iter_max`, `inertia`, `cognitive`, `social`.
    pub fn from_options(options: &StrategyOptions) -> Result<Self> {
        let defaults = Self::new();
        let swarm = Self {
            particles: options.usize_or("particles", defaults.particles)?,
            iter_max: MaxIterations(options.usize_or("iter_max", 50)?),
            inertia: options.f64_or("inertia", defaults.inertia)?,
            cognitive: options.f64_or("cognitive", defaults.cognitive)?,
            social: options.f64_or("social", defaults.social)?,
            ..defaults
        };
        if swarm.particles == 0 {
            return Err(ExploreError::configuration("particles must be positive"));
        }
        Ok(swarm)
    }

    pub fn particles(mut self, particles: usize) -> Self {
        self.particles = particles.max(1);
        self
    }

    pub fn iter_max(mut self, iter_max: usize) -> Self {
        self.iter_max = MaxIterations(iter_max);
        self
    }

    pub fn coefficients(mut self, inertia: f64, cognitive: f64, social: f64) -> Self {
        self.inertia = inertia;
        self.cognitive = cognitive;
        self.social = social;
        self
    }

    fn bounds(&self, space: &ParameterSpace) -> Vec<(f64, f64)> {
        self.axes
            .iter()
            .filter_map(|&i| space.variables()[i].numeric_bounds())
            .collect()
    }

    /// Candidate at `particle`'s position, clamping the position and
    /// zeroing velocity on clamped axes.
    fn place(&self, space: &ParameterSpace, particle: &mut Particle) -> CandidatePoint {
        let mut candidate = particle.base.clone();
        for (axis, &index) in self.axes.iter().enumerate() {
            let variable = &space.variables()[index];
            let Some((min, max)) = variable.numeric_bounds() else {
                continue;
            };
            let raw = particle.position[axis];
            if raw < min || raw > max {
                particle.position[axis] = raw.clamp(min, max);
                particle.velocity[axis] = 0.0;
            }
            if let Some(value) = variable.clamp_numeric(particle.position[axis]) {
                candidate = candidate.with(variable.name(), value);
            }
        }
        candidate
    }
}

impl Default for ParticleSwarm {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchPolicy for ParticleSwarm {
    fn name(&self) -> &'static str {
        "pso"
    }

    fn own_criterion(&self) -> Option<&dyn StoppingCriterion> {
        Some(&self.iter_max)
    }

    fn seed(&mut self, ctx: &mut ExplorationContext<'_>) -> Result<Vec<CandidatePoint>> {
        self.axes = ctx
            .space
            .variables()
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_numeric())
            .map(|(i, _)| i)
            .collect();
        if self.axes.is_empty() {
            return Err(ExploreError::configuration(
                "particle swarm needs at least one numeric variable",
            ));
        }
        self.global_best = None;
        self.swarm.clear();

        let bounds = self.bounds(ctx.space);
        let mut candidates = Vec::with_capacity(self.particles);
        for _ in 0..self.particles {
            let base = ctx.space.sample_default(&mut ctx.rng)?;
            let position: Vec<f64> = self
                .axes
                .iter()
                .map(|&i| {
                    let name = ctx.space.variables()[i].name();
                    base.get(name).and_then(|v| v.as_f64()).unwrap_or_default()
                })
                .collect();
            let velocity: Vec<f64> = bounds
                .iter()
                .map(|(min, max)| {
                    let span = (max - min) * 0.1;
                    if span > 0.0 {
                        ctx.rng.gen_range(-span..=span)
                    } else {
                        0.0
                    }
                })
                .collect();
            let mut particle = Particle {
                position,
                velocity,
                base,
                best: None,
            };
            candidates.push(self.place(ctx.space, &mut particle));
            self.swarm.push(particle);
        }
        Ok(candidates)
    }

    fn absorb_seed(&mut self, ctx: &mut ExplorationContext<'_>, scored: Vec<Scored>) -> Result<()> {
        let mut state = SearchState::new();
        self.absorb(ctx, &mut state, scored)
    }

    fn generate(
        &mut self,
        ctx: &mut ExplorationContext<'_>,
        _state: &mut SearchState,
    ) -> Result<Vec<CandidatePoint>> {
        let space = ctx.space;
        let mut swarm = std::mem::take(&mut self.swarm);
        let mut candidates = Vec::with_capacity(swarm.len());
        for particle in &mut swarm {
            for axis in 0..particle.position.len() {
                let x = particle.position[axis];
                let personal = particle.best.as_ref().map_or(x, |(p, _)| p[axis]);
                let global = self.global_best.as_ref().map_or(x, |(g, _)| g[axis]);
                let (r1, r2): (f64, f64) = (ctx.rng.gen(), ctx.rng.gen());
                particle.velocity[axis] = self.inertia * particle.velocity[axis]
                    + self.cognitive * r1 * (personal - x)
                    + self.social * r2 * (global - x);
                particle.position[axis] = x + particle.velocity[axis];
            }
            candidates.push(self.place(space, particle));
        }
        self.swarm = swarm;
        Ok(candidates)
    }

    fn absorb(
        &mut self,
        ctx: &mut ExplorationContext<'_>,
        _state: &mut SearchState,
        scored: Vec<Scored>,
    ) -> Result<()> {
        let objective = ctx.require_fitness()?.objective();
        for (particle, (_, fitness)) in self.swarm.iter_mut().zip(scored) {
            let Some(fitness) = fitness else { continue };
            if improves(fitness, particle.best.as_ref().map(|(_, f)| *f), objective) {
                particle.best = Some((particle.position.clone(), fitness));
            }
            if improves(fitness, self.global_best.as_ref().map(|(_, f)| *f), objective) {
                self.global_best = Some((particle.position.clone(), fitness));
            }
        }
        Ok(())
    }
}

impl ExplorationStrategy for ParticleSwarm {
    fn name(&self) -> &'static str {
        SearchPolicy::name(self)
    }

    fn is_fitness_based(&self) -> bool {
        true
    }

    fn explore(&mut self, ctx: &mut ExplorationContext<'_>) -> Result<ExplorationOutcome> {
        let report = run_search(self, ctx)?;
        Ok(finish_search(ctx, report))
    }
}
