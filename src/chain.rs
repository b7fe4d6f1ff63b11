use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::accept::Accept;
use crate::constraints::{ConstraintResult, Validator};
use crate::error::{ChainError, Result};
use crate::partition::Partition;
use crate::proposals::Proposal;

/// Cooperative cancellation flag, checked between chain steps.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self { Self::default() }

    /// Ask the chain to stop before its next step.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Lifecycle of a chain run. Transitions are monotone; once `Done` or
/// `Failed` the iterator is exhausted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChainState {
    Ready,
    Running,
    Done,
    Failed,
}

/// The chain driver: a lazy sequence of accepted partitions.
///
/// Emits exactly `total_steps` states including the initial one (step 0).
/// Per step, constraint-invalid candidates are retried without consuming
/// a step (bounded by the rejection budget); a valid candidate that the
/// acceptance function declines re-emits the current state and does
/// consume a step. Accepted states are sealed (every updater
/// materialized through its diff path) and their parent link dropped, so
/// a long chain keeps only the current state alive.
pub struct MarkovChain<P: Proposal, A: Accept> {
    proposal: P,
    validator: Validator,
    accept: A,
    current: Arc<Partition>,
    total_steps: usize,
    step: usize,
    rng: StdRng,
    state: ChainState,
    max_rejections: usize,
    trim_parents: bool,
    cancel: Option<CancelToken>,
    progress: Option<Box<dyn FnMut(usize, usize) + Send>>,
    error: Option<ChainError>,
}

impl<P: Proposal, A: Accept> MarkovChain<P, A> {
    /// Build a chain. Fails with `InvalidInitialState` if the starting
    /// partition does not satisfy the constraint stack.
    pub fn new(
        proposal: P,
        validator: Validator,
        accept: A,
        initial: Partition,
        total_steps: usize,
        rng: StdRng,
    ) -> Result<Self> {
        match validator.validate(&initial)? {
            ConstraintResult::Pass => {}
            ConstraintResult::Fail(reason) => {
                return Err(ChainError::InvalidInitialState(reason));
            }
            ConstraintResult::Indeterminate => {
                return Err(ChainError::InvalidInitialState(
                    "constraints could not decide the initial state".to_string(),
                ));
            }
        }
        Ok(Self {
            proposal,
            validator,
            accept,
            current: Arc::new(initial),
            total_steps,
            step: 0,
            rng,
            state: ChainState::Ready,
            max_rejections: 1_000_000,
            trim_parents: true,
            cancel: None,
            progress: None,
            error: None,
        })
    }

    /// Build a chain with an explicitly seeded RNG stream.
    pub fn with_seed(
        proposal: P,
        validator: Validator,
        accept: A,
        initial: Partition,
        total_steps: usize,
        seed: u64,
    ) -> Result<Self> {
        Self::new(proposal, validator, accept, initial, total_steps, StdRng::seed_from_u64(seed))
    }

    /// Override the per-step rejection budget (default one million).
    pub fn with_max_rejections(mut self, max_rejections: usize) -> Self {
        self.max_rejections = max_rejections;
        self
    }

    /// Keep parent links on accepted states instead of trimming them.
    pub fn retain_parents(mut self) -> Self {
        self.trim_parents = false;
        self
    }

    /// Attach a cooperative cancellation token.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Attach a per-step progress hook `(emitted_step, total_steps)`.
    pub fn with_progress(mut self, hook: impl FnMut(usize, usize) + Send + 'static) -> Self {
        self.progress = Some(Box::new(hook));
        self
    }

    /// Lifecycle state of the run.
    #[inline] pub fn state(&self) -> ChainState { self.state }

    /// The current (most recently accepted) partition.
    #[inline] pub fn current(&self) -> &Arc<Partition> { &self.current }

    /// Total states this chain emits, including the initial one.
    #[inline] pub fn total_steps(&self) -> usize { self.total_steps }

    /// The fatal error that ended the run, if any.
    #[inline] pub fn error(&self) -> Option<&ChainError> { self.error.as_ref() }

    fn emit_progress(&mut self, step: usize) {
        let total = self.total_steps;
        if let Some(hook) = &mut self.progress {
            hook(step, total);
        }
    }

    fn fail(&mut self, error: ChainError) -> Result<Arc<Partition>> {
        self.state = ChainState::Failed;
        self.error = Some(error.clone());
        Err(error)
    }

    /// Run one full accept/reject round. `None` when the chain is over.
    fn advance(&mut self) -> Option<Result<Arc<Partition>>> {
        let mut rejections = 0usize;
        loop {
            let candidate = match self.proposal.propose(&self.current, &mut self.rng) {
                Ok(candidate) => candidate,
                Err(e) => return Some(self.fail(e)),
            };

            let verdict = match self.validator.validate(&candidate) {
                Ok(verdict) => verdict,
                Err(ChainError::UpdaterFailure { .. }) => ConstraintResult::Fail(String::new()),
                Err(e) => return Some(self.fail(e)),
            };
            let passed = match verdict {
                ConstraintResult::Pass => match candidate.seal() {
                    Ok(()) => true,
                    Err(ChainError::UpdaterFailure { .. }) => false,
                    Err(e) => return Some(self.fail(e)),
                },
                _ => false,
            };

            if !passed {
                rejections += 1;
                if rejections >= self.max_rejections {
                    return Some(self.fail(ChainError::RejectionExhausted { attempts: rejections }));
                }
                continue;
            }

            match self.accept.accept(&candidate, self.step, &mut self.rng) {
                Ok(true) => {
                    let mut accepted = candidate;
                    if self.trim_parents {
                        accepted.detach_parent();
                    }
                    self.current = Arc::new(accepted);
                }
                Ok(false) => {}
                Err(e) => return Some(self.fail(e)),
            }

            let emitted = self.step;
            self.step += 1;
            self.emit_progress(emitted);
            return Some(Ok(self.current.clone()));
        }
    }
}

impl<P: Proposal, A: Accept> Iterator for MarkovChain<P, A> {
    type Item = Result<Arc<Partition>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.state {
            ChainState::Done | ChainState::Failed => return None,
            ChainState::Ready => {
                if self.total_steps == 0 {
                    self.state = ChainState::Done;
                    return None;
                }
                self.state = ChainState::Running;
                self.step = 1;
                self.emit_progress(0);
                return Some(Ok(self.current.clone()));
            }
            ChainState::Running => {}
        }

        if self.step >= self.total_steps {
            self.state = ChainState::Done;
            return None;
        }
        if self.cancel.as_ref().is_some_and(|token| token.is_cancelled()) {
            self.state = ChainState::Done;
            return None;
        }

        let item = self.advance();
        if item.is_none() {
            self.state = ChainState::Done;
        }
        item
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = match self.state {
            ChainState::Ready => self.total_steps,
            ChainState::Running => self.total_steps - self.step,
            ChainState::Done | ChainState::Failed => 0,
        };
        (0, Some(remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accept::AlwaysAccept;
    use crate::constraints::SingleFlipContiguous;
    use crate::graph::{AttributeTable, Graph};
    use crate::partition::{Assignment, PartId};
    use crate::proposals::RandomFlip;
    use crate::updaters::UpdaterRegistry;

    fn grid_partition() -> Partition {
        let mut edges = Vec::new();
        for y in 0..4 {
            for x in 0..4 {
                let v = y * 4 + x;
                if x + 1 < 4 { edges.push((v, v + 1)) }
                if y + 1 < 4 { edges.push((v, v + 4)) }
            }
        }
        let ids = (0..16).map(|i| i.to_string()).collect();
        let graph = Graph::from_adjacency(
            ids, &edges, AttributeTable::new(16), AttributeTable::new(edges.len()),
        ).unwrap();
        let assignment = Assignment::from_vec(
            (0..16).map(|v| if v % 4 < 2 { 0 } else { 1 }).collect(),
        ).unwrap();
        Partition::new(graph, assignment, UpdaterRegistry::with_defaults()).unwrap()
    }

    fn contiguous_validator() -> Validator {
        let mut validator = Validator::new();
        validator.push(SingleFlipContiguous);
        validator
    }

    #[test]
    fn emits_exactly_total_steps_states() {
        let chain = MarkovChain::with_seed(
            RandomFlip::new(), contiguous_validator(), AlwaysAccept, grid_partition(), 10, 2024,
        ).unwrap();
        let states = chain.collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(states.len(), 10);
    }

    #[test]
    fn first_emitted_state_is_the_initial_one() {
        let mut chain = MarkovChain::with_seed(
            RandomFlip::new(), contiguous_validator(), AlwaysAccept, grid_partition(), 3, 7,
        ).unwrap();
        let first = chain.next().unwrap().unwrap();
        assert!(first.flips().is_empty());
        assert_eq!(chain.state(), ChainState::Running);
    }

    #[test]
    fn emitted_states_stay_contiguous() {
        let chain = MarkovChain::with_seed(
            RandomFlip::new(), contiguous_validator(), AlwaysAccept, grid_partition(), 25, 99,
        ).unwrap();
        for state in chain {
            let state = state.unwrap();
            for part in state.parts().collect::<Vec<PartId>>() {
                assert!(state.part_subgraph(part).is_connected());
            }
        }
    }

    #[test]
    fn fixed_seed_reproduces_the_run() {
        let run = |seed| {
            MarkovChain::with_seed(
                RandomFlip::new(), contiguous_validator(), AlwaysAccept, grid_partition(), 15, seed,
            )
            .unwrap()
            .map(|s| {
                let s = s.unwrap();
                (0..16).map(|v| s.part_of(v)).collect::<Vec<_>>()
            })
            .collect::<Vec<_>>()
        };
        assert_eq!(run(42), run(42));
    }

    #[test]
    fn invalid_initial_state_is_rejected() {
        // Disconnected part: {0, 3} in a path graph.
        let ids = (0..4).map(|i| i.to_string()).collect();
        let graph = Graph::from_adjacency(
            ids, &[(0, 1), (1, 2), (2, 3)], AttributeTable::new(4), AttributeTable::new(3),
        ).unwrap();
        let assignment = Assignment::from_vec(vec![0, 1, 1, 0]).unwrap();
        let initial = Partition::new(graph, assignment, UpdaterRegistry::with_defaults()).unwrap();
        let mut validator = Validator::new();
        validator.push(crate::constraints::Contiguous);
        let result = MarkovChain::with_seed(
            RandomFlip::new(), validator, AlwaysAccept, initial, 5, 1,
        );
        assert!(matches!(result, Err(ChainError::InvalidInitialState(_))));
    }

    #[test]
    fn cancellation_stops_between_steps() {
        let token = CancelToken::new();
        let mut chain = MarkovChain::with_seed(
            RandomFlip::new(), contiguous_validator(), AlwaysAccept, grid_partition(), 100, 5,
        )
        .unwrap()
        .with_cancel_token(token.clone());

        assert!(chain.next().is_some());
        token.cancel();
        assert!(chain.next().is_none());
        assert_eq!(chain.state(), ChainState::Done);
    }

    #[test]
    fn one_part_trivial_case_fails_with_no_boundary() {
        let ids = (0..2).map(|i| i.to_string()).collect();
        let graph = Graph::from_adjacency(
            ids, &[(0, 1)], AttributeTable::new(2), AttributeTable::new(1),
        ).unwrap();
        let assignment = Assignment::from_vec(vec![0, 0]).unwrap();
        let initial = Partition::new(graph, assignment, UpdaterRegistry::with_defaults()).unwrap();
        let mut chain = MarkovChain::with_seed(
            RandomFlip::new(), Validator::new(), AlwaysAccept, initial, 5, 1,
        ).unwrap();
        assert!(chain.next().unwrap().is_ok());
        assert!(matches!(chain.next(), Some(Err(ChainError::NoBoundary))));
        assert_eq!(chain.state(), ChainState::Failed);
        assert!(chain.next().is_none());
        assert!(matches!(chain.error(), Some(ChainError::NoBoundary)));
    }

    #[test]
    fn progress_hook_sees_every_step() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let chain = MarkovChain::with_seed(
            RandomFlip::new(), contiguous_validator(), AlwaysAccept, grid_partition(), 8, 13,
        )
        .unwrap()
        .with_progress(move |_, _| { seen.fetch_add(1, Ordering::Relaxed); });
        assert_eq!(chain.count(), 8);
        assert_eq!(count.load(Ordering::Relaxed), 8);
    }
}
