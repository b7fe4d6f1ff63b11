use std::sync::Arc;

use crate::error::Result;
use crate::partition::{Flip, Partition};

/// Records the per-step flips of a chain run so the exact sequence of
/// partitions can be reconstructed later without re-running proposals.
///
/// Feed every emitted state (including the initial one) to `record`;
/// steps where the chain declined a candidate and re-emitted its current
/// state are stored as empty flips.
#[derive(Debug, Default)]
pub struct FlipRecorder {
    last: Option<Arc<Partition>>,
    records: Vec<Flip>,
}

impl FlipRecorder {
    pub fn new() -> Self { Self::default() }

    /// Record one emitted state.
    pub fn record(&mut self, state: &Arc<Partition>) {
        match &self.last {
            None => {}
            Some(previous) if Arc::ptr_eq(previous, state) => self.records.push(Flip::new()),
            Some(_) => self.records.push(state.flips().clone()),
        }
        self.last = Some(state.clone());
    }

    /// The recorded per-step flips, one per emitted state after the
    /// initial one.
    #[inline] pub fn records(&self) -> &[Flip] { &self.records }

    #[inline] pub fn into_records(self) -> Vec<Flip> { self.records }
}

/// Re-expand recorded flips against the same initial partition,
/// reproducing every partition of the original run bit for bit. The
/// returned sequence includes the initial state at index 0.
pub fn replay(initial: &Arc<Partition>, records: &[Flip]) -> Result<Vec<Arc<Partition>>> {
    let mut states = Vec::with_capacity(records.len() + 1);
    states.push(initial.clone());
    let mut current = initial.clone();
    for flips in records {
        let mut next = current.flip(flips.clone())?;
        next.seal()?;
        next.detach_parent();
        current = Arc::new(next);
        states.push(current.clone());
    }
    Ok(states)
}
