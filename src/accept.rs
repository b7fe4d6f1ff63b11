use rand::rngs::StdRng;
use rand::Rng;

use crate::constraints::ScoreFn;
use crate::error::Result;
use crate::partition::Partition;

/// Decides whether the chain advances to a constraint-valid candidate.
/// `step` is the chain's current step index, for time-varying schedules.
pub trait Accept: Send + Sync {
    fn accept(&self, candidate: &Partition, step: usize, rng: &mut StdRng) -> Result<bool>;
}

/// Accept every valid candidate.
#[derive(Clone, Copy, Debug, Default)]
pub struct AlwaysAccept;

impl Accept for AlwaysAccept {
    fn accept(&self, _candidate: &Partition, _step: usize, _rng: &mut StdRng) -> Result<bool> {
        Ok(true)
    }
}

/// Inverse-temperature schedule for Metropolis-Hastings acceptance.
#[derive(Clone, Debug)]
pub enum BetaSchedule {
    /// A fixed inverse temperature.
    Constant(f64),
    /// Alternate `cold_steps` of beta 1 with `hot_steps` of beta 0,
    /// producing the warming/cooling trace of a jump cycle.
    JumpCycle { cold_steps: usize, hot_steps: usize },
    /// Linear ramp from `start` to `end` over `steps`, constant after.
    Linear { start: f64, end: f64, steps: usize },
}

impl BetaSchedule {
    /// Inverse temperature at a step.
    pub fn beta(&self, step: usize) -> f64 {
        match *self {
            BetaSchedule::Constant(beta) => beta,
            BetaSchedule::JumpCycle { cold_steps, hot_steps } => {
                let period = (cold_steps + hot_steps).max(1);
                if step % period < cold_steps { 1.0 } else { 0.0 }
            }
            BetaSchedule::Linear { start, end, steps } => {
                if steps == 0 || step >= steps { return end }
                start + (end - start) * step as f64 / steps as f64
            }
        }
    }
}

/// Metropolis-Hastings acceptance over an energy score (lower is
/// better): accept with probability `min(1, exp(-beta(t) * m * delta))`
/// where `delta` is the candidate's score minus its parent's.
#[derive(Clone)]
pub struct MetropolisHastings {
    score: ScoreFn,
    beta: BetaSchedule,
    magnitude: f64,
}

impl MetropolisHastings {
    pub fn new(score: ScoreFn, beta: BetaSchedule) -> Self {
        Self { score, beta, magnitude: 1.0 }
    }

    /// Scale the schedule by a constant factor.
    pub fn with_magnitude(mut self, magnitude: f64) -> Self {
        self.magnitude = magnitude;
        self
    }
}

impl Accept for MetropolisHastings {
    fn accept(&self, candidate: &Partition, step: usize, rng: &mut StdRng) -> Result<bool> {
        let Some(parent) = candidate.parent() else { return Ok(true) };
        let delta = (self.score)(candidate)? - (self.score)(parent)?;
        if delta <= 0.0 { return Ok(true) }
        let beta = self.beta.beta(step) * self.magnitude;
        Ok(rng.random::<f64>() < (-beta * delta).exp())
    }
}

/// Accept flips that do not grow the cut-edge set; otherwise accept with
/// probability `|parent cuts| / |candidate cuts|`.
#[derive(Clone, Copy, Debug, Default)]
pub struct CutEdgeAccept;

impl Accept for CutEdgeAccept {
    fn accept(&self, candidate: &Partition, _step: usize, rng: &mut StdRng) -> Result<bool> {
        let Some(parent) = candidate.parent() else { return Ok(true) };
        let before = parent.cut_edges()?.len() as f64;
        let after = candidate.cut_edges()?.len() as f64;
        let bound = if after > 0.0 { (before / after).min(1.0) } else { 1.0 };
        Ok(rng.random::<f64>() < bound)
    }
}

/// Tilted acceptance: improvements always pass, worsenings pass with
/// probability `p`.
#[derive(Clone)]
pub struct TiltedAccept {
    score: ScoreFn,
    maximize: bool,
    p: f64,
}

impl TiltedAccept {
    pub fn new(score: ScoreFn, maximize: bool, p: f64) -> Self {
        Self { score, maximize, p }
    }
}

impl Accept for TiltedAccept {
    fn accept(&self, candidate: &Partition, _step: usize, rng: &mut StdRng) -> Result<bool> {
        let Some(parent) = candidate.parent() else { return Ok(true) };
        let candidate_score = (self.score)(candidate)?;
        let parent_score = (self.score)(parent)?;
        let improved = if self.maximize {
            candidate_score >= parent_score
        } else {
            candidate_score <= parent_score
        };
        if improved { return Ok(true) }
        Ok(rng.random::<f64>() < self.p)
    }
}
