use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::accept::{Accept, AlwaysAccept, BetaSchedule, MetropolisHastings, TiltedAccept};
use crate::chain::MarkovChain;
use crate::constraints::{ScoreFn, Validator};
use crate::error::Result;
use crate::partition::Partition;
use crate::proposals::Proposal;

/// Optimizes a single metric over chain runs, tracking the best-scoring
/// partition observed so far. Each optimization method resets the best
/// state to the initial partition before running.
pub struct SingleMetricOptimizer<P: Proposal + Clone> {
    proposal: P,
    validator: Validator,
    initial: Partition,
    score: ScoreFn,
    maximize: bool,
    best_score: f64,
    best_partition: Partition,
}

impl<P: Proposal + Clone> SingleMetricOptimizer<P> {
    pub fn new(
        proposal: P,
        validator: Validator,
        initial: Partition,
        score: ScoreFn,
        maximize: bool,
    ) -> Result<Self> {
        let best_score = score(&initial)?;
        Ok(Self {
            proposal,
            validator,
            best_partition: initial.clone(),
            initial,
            score,
            maximize,
            best_score,
        })
    }

    /// Best score seen in the most recent run.
    #[inline] pub fn best_score(&self) -> f64 { self.best_score }

    /// Best partition seen in the most recent run.
    #[inline] pub fn best_partition(&self) -> &Partition { &self.best_partition }

    fn is_improvement(&self, candidate: f64, best: f64) -> bool {
        if self.maximize { candidate >= best } else { candidate <= best }
    }

    fn reset_best(&mut self) -> Result<()> {
        self.best_partition = self.initial.clone();
        self.best_score = (self.score)(&self.initial)?;
        Ok(())
    }

    /// Run one chain from `seed_state`, folding every emitted state into
    /// the best tracker.
    fn run_chain(
        &mut self,
        accept: impl Accept,
        seed_state: Partition,
        steps: usize,
        rng: &mut StdRng,
    ) -> Result<()> {
        let chain = MarkovChain::new(
            self.proposal.clone(),
            self.validator.clone(),
            accept,
            seed_state,
            steps,
            StdRng::seed_from_u64(rng.random()),
        )?;
        for state in chain {
            let state = state?;
            let state_score = (self.score)(&state)?;
            if self.is_improvement(state_score, self.best_score) {
                self.best_score = state_score;
                self.best_partition = (*state).clone();
            }
        }
        Ok(())
    }

    /// Short bursts: run `n_bursts` chains of `burst_length` steps, each
    /// seeded from the best partition of the previous burst. Returns the
    /// best score recorded after each burst.
    pub fn short_bursts(
        &mut self,
        burst_length: usize,
        n_bursts: usize,
        rng: &mut StdRng,
    ) -> Result<Vec<f64>> {
        self.reset_best()?;
        let mut trace = Vec::with_capacity(n_bursts);
        for _ in 0..n_bursts {
            let seed_state = self.best_partition.clone();
            self.run_chain(AlwaysAccept, seed_state, burst_length, rng)?;
            trace.push(self.best_score);
        }
        Ok(trace)
    }

    /// Short bursts under a tilted acceptance function: improvements
    /// always accepted, worsenings with probability `p`.
    pub fn tilted_short_bursts(
        &mut self,
        burst_length: usize,
        n_bursts: usize,
        p: f64,
        rng: &mut StdRng,
    ) -> Result<Vec<f64>> {
        self.reset_best()?;
        let mut trace = Vec::with_capacity(n_bursts);
        for _ in 0..n_bursts {
            let seed_state = self.best_partition.clone();
            let accept = TiltedAccept::new(self.score.clone(), self.maximize, p);
            self.run_chain(accept, seed_state, burst_length, rng)?;
            trace.push(self.best_score);
        }
        Ok(trace)
    }

    /// Short bursts whose length doubles after `stuck_buffer` bursts in
    /// a row without improvement, until `n_steps` total steps are spent.
    pub fn variable_length_short_bursts(
        &mut self,
        n_steps: usize,
        stuck_buffer: usize,
        rng: &mut StdRng,
    ) -> Result<()> {
        self.reset_best()?;
        let mut burst_length = 2usize;
        let mut stuck_bursts = 0usize;
        let mut spent = 0usize;
        while spent < n_steps {
            let steps = burst_length.min(n_steps - spent);
            let before = self.best_score;
            let seed_state = self.best_partition.clone();
            self.run_chain(AlwaysAccept, seed_state, steps, rng)?;
            spent += steps;

            if self.best_score == before {
                stuck_bursts += 1;
                if stuck_bursts >= stuck_buffer {
                    burst_length *= 2;
                    stuck_bursts = 0;
                }
            } else {
                stuck_bursts = 0;
            }
        }
        Ok(())
    }

    /// Simulated annealing: one chain with Metropolis-Hastings acceptance
    /// under `schedule` scaled by `magnitude`. Returns the best score.
    pub fn simulated_annealing(
        &mut self,
        n_steps: usize,
        schedule: BetaSchedule,
        magnitude: f64,
        rng: &mut StdRng,
    ) -> Result<f64> {
        self.reset_best()?;
        // Metropolis minimizes energy, so negate when maximizing.
        let energy: ScoreFn = if self.maximize {
            let score = self.score.clone();
            Arc::new(move |p: &Partition| Ok(-score(p)?))
        } else {
            self.score.clone()
        };
        let accept = MetropolisHastings::new(energy, schedule).with_magnitude(magnitude);
        let seed_state = self.initial.clone();
        self.run_chain(accept, seed_state, n_steps, rng)?;
        Ok(self.best_score)
    }

    /// Tilted run: one chain accepting improvements always and
    /// worsenings with probability `p`. Returns the best score.
    pub fn tilted_run(&mut self, n_steps: usize, p: f64, rng: &mut StdRng) -> Result<f64> {
        self.reset_best()?;
        let accept = TiltedAccept::new(self.score.clone(), self.maximize, p);
        let seed_state = self.initial.clone();
        self.run_chain(accept, seed_state, n_steps, rng)?;
        Ok(self.best_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::SingleFlipContiguous;
    use crate::graph::{AttributeTable, Graph};
    use crate::partition::Assignment;
    use crate::proposals::RandomFlip;
    use crate::updaters::UpdaterRegistry;

    fn grid_partition(width: usize, height: usize) -> Partition {
        let n = width * height;
        let mut edges = Vec::new();
        for y in 0..height {
            for x in 0..width {
                let v = y * width + x;
                if x + 1 < width { edges.push((v, v + 1)) }
                if y + 1 < height { edges.push((v, v + width)) }
            }
        }
        let ids = (0..n).map(|i| i.to_string()).collect();
        let graph = Graph::from_adjacency(
            ids, &edges, AttributeTable::new(n), AttributeTable::new(edges.len()),
        ).unwrap();
        // Interleaved columns make a deliberately ragged starting plan.
        let assignment = Assignment::from_vec(
            (0..n).map(|v| if v % width < width / 2 { 0 } else { 1 }).collect(),
        ).unwrap();
        Partition::new(graph, assignment, UpdaterRegistry::with_defaults()).unwrap()
    }

    fn optimizer(initial: Partition) -> SingleMetricOptimizer<RandomFlip> {
        let mut validator = Validator::new();
        validator.push(SingleFlipContiguous);
        let score: ScoreFn = Arc::new(|p: &Partition| Ok(p.cut_edges()?.len() as f64));
        SingleMetricOptimizer::new(RandomFlip::new(), validator, initial, score, false).unwrap()
    }

    #[test]
    fn short_bursts_trace_is_monotone_when_minimizing() {
        let mut opt = optimizer(grid_partition(5, 4));
        let mut rng = StdRng::seed_from_u64(2024);
        let trace = opt.short_bursts(50, 5, &mut rng).unwrap();
        assert_eq!(trace.len(), 5);
        for pair in trace.windows(2) {
            assert!(pair[1] <= pair[0], "best score worsened: {pair:?}");
        }
        assert!(opt.best_score() <= trace[0]);
    }

    #[test]
    fn tilted_run_tracks_best() {
        let mut opt = optimizer(grid_partition(4, 4));
        let mut rng = StdRng::seed_from_u64(3);
        let initial_score = opt.best_score();
        let best = opt.tilted_run(100, 0.1, &mut rng).unwrap();
        assert!(best <= initial_score);
    }

    #[test]
    fn simulated_annealing_runs_to_completion() {
        let mut opt = optimizer(grid_partition(4, 4));
        let mut rng = StdRng::seed_from_u64(11);
        let schedule = BetaSchedule::Linear { start: 0.1, end: 2.0, steps: 80 };
        let best = opt.simulated_annealing(100, schedule, 1.0, &mut rng).unwrap();
        assert!(best.is_finite());
        assert!(opt.best_partition().parts().count() == 2);
    }

    #[test]
    fn variable_length_bursts_spend_the_budget() {
        let mut opt = optimizer(grid_partition(4, 4));
        let mut rng = StdRng::seed_from_u64(5);
        opt.variable_length_short_bursts(60, 2, &mut rng).unwrap();
        assert!(opt.best_score().is_finite());
    }
}
