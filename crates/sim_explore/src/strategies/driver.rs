use tracing::{debug, info};

use super::{ExplorationContext, OptimizationReport};
use crate::error::Result;
use crate::fitness::Objective;
use crate::parameters::CandidatePoint;
use crate::stopping::{SearchPhase, SearchState, StoppingCriterion};

/// A candidate paired with its fitness; `None` marks a failed evaluation.
pub(crate) type Scored = (CandidatePoint, Option<f64>);

/// Policy plugged into [`run_search`].
///
/// The driver owns the phase loop and the stopping decision; a policy only
/// proposes candidates and updates its own state from their fitness.
pub(crate) trait SearchPolicy {
    fn name(&self) -> &'static str;

    /// Criterion the strategy applies on its own, e.g. its iteration limit.
    fn own_criterion(&self) -> Option<&dyn StoppingCriterion>;

    fn seed(&mut self, ctx: &mut ExplorationContext<'_>) -> Result<Vec<CandidatePoint>>;

    fn absorb_seed(&mut self, ctx: &mut ExplorationContext<'_>, scored: Vec<Scored>) -> Result<()>;

    /// Candidates to evaluate this iteration. An empty batch ends the search.
    fn generate(
        &mut self,
        ctx: &mut ExplorationContext<'_>,
        state: &mut SearchState,
    ) -> Result<Vec<CandidatePoint>>;

    /// Update policy state from the evaluated batch. Setting
    /// `state.converged` ends the search at the next stop check.
    fn absorb(
        &mut self,
        ctx: &mut ExplorationContext<'_>,
        state: &mut SearchState,
        scored: Vec<Scored>,
    ) -> Result<()>;
}

/// Run `policy` through init, seed evaluation, then check-stop, generate and
/// evaluate until a criterion fires or the policy converges.
pub(crate) fn run_search<P: SearchPolicy>(
    policy: &mut P,
    ctx: &mut ExplorationContext<'_>,
) -> Result<OptimizationReport> {
    let objective = ctx.require_fitness()?.objective();
    let mut state = SearchState::new();
    let mut trace = Vec::new();

    let seed = policy.seed(ctx)?;
    state.phase = SearchPhase::EvaluateSeed;
    let scored = score(ctx, seed)?;
    policy.absorb_seed(ctx, scored)?;
    sync_best(ctx, &mut state, objective);

    loop {
        state.iteration += 1;
        state.phase = SearchPhase::CheckStop;
        if should_stop(policy, ctx, &state) {
            break;
        }

        state.phase = SearchPhase::Generate;
        let candidates = policy.generate(ctx, &mut state)?;
        if candidates.is_empty() {
            state.converged = true;
            continue;
        }

        state.phase = SearchPhase::Evaluate;
        let scored = score(ctx, candidates)?;
        policy.absorb(ctx, &mut state, scored)?;
        sync_best(ctx, &mut state, objective);
        trace.extend(state.best_fitness);
        debug!(
            strategy = policy.name(),
            iteration = state.iteration,
            best = ?state.best_fitness,
            evaluations = state.evaluations,
            "Search iteration"
        );
    }
    state.phase = SearchPhase::Terminated;

    let iterations = state.iteration.saturating_sub(1);
    let best = ctx.best().map(|(candidate, fitness)| (candidate.clone(), fitness));
    info!(
        strategy = policy.name(),
        iterations,
        evaluations = ctx.evaluations,
        converged = state.converged,
        best = ?best.as_ref().map(|(_, f)| *f),
        "Search finished"
    );

    Ok(OptimizationReport {
        strategy: policy.name().to_string(),
        best_fitness: best.as_ref().map(|(_, f)| *f),
        best: best.map(|(candidate, _)| candidate),
        iterations,
        evaluations: ctx.evaluations,
        converged: state.converged,
        trace,
    })
}

fn should_stop<P: SearchPolicy>(policy: &P, ctx: &ExplorationContext<'_>, state: &SearchState) -> bool {
    state.converged
        || policy
            .own_criterion()
            .is_some_and(|criterion| criterion.should_stop(state))
        || ctx
            .stopping
            .is_some_and(|criterion| criterion.should_stop(state))
}

fn score(ctx: &mut ExplorationContext<'_>, candidates: Vec<CandidatePoint>) -> Result<Vec<Scored>> {
    let fitness = ctx.evaluate_fitness(&candidates)?;
    Ok(candidates.into_iter().zip(fitness).collect())
}

fn sync_best(ctx: &ExplorationContext<'_>, state: &mut SearchState, objective: Objective) {
    state.evaluations = ctx.evaluations;
    if let Some((_, fitness)) = ctx.best() {
        state.record(fitness, objective);
    }
}

/// Best scored candidate of a batch; the earliest one on ties.
pub(crate) fn best_scored(scored: &[Scored], objective: Objective) -> Option<(&CandidatePoint, f64)> {
    let mut best: Option<(&CandidatePoint, f64)> = None;
    for (candidate, fitness) in scored {
        let Some(fitness) = *fitness else { continue };
        if best.map_or(true, |(_, incumbent)| objective.is_better(fitness, incumbent)) {
            best = Some((candidate, fitness));
        }
    }
    best
}

/// True when `fitness` beats `incumbent`; anything beats a failed incumbent.
pub(crate) fn improves(fitness: f64, incumbent: Option<f64>, objective: Objective) -> bool {
    incumbent.map_or(true, |incumbent| objective.is_better(fitness, incumbent))
}
