use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::Rng;

use crate::error::{ChainError, Result};
use crate::partition::{Flip, Partition};
use crate::proposals::Proposal;

/// Single-boundary-flip proposal: pick a cut edge uniformly, pick a side
/// uniformly, and reassign that endpoint to the other side's part.
///
/// A draw that would empty the losing part is discarded and redrawn;
/// `NoBoundary` surfaces when the partition has no cut edges at all.
#[derive(Clone, Debug)]
pub struct RandomFlip {
    max_retries: usize,
}

impl RandomFlip {
    pub fn new() -> Self { Self { max_retries: 100 } }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }
}

impl Default for RandomFlip {
    fn default() -> Self { Self::new() }
}

impl Proposal for RandomFlip {
    fn propose(&self, current: &Arc<Partition>, rng: &mut StdRng) -> Result<Partition> {
        let cut_edges = current.cut_edges()?.iter().copied().collect::<Vec<_>>();
        if cut_edges.is_empty() {
            return Err(ChainError::NoBoundary);
        }

        for _ in 0..self.max_retries {
            let &edge = cut_edges.choose(rng).unwrap();
            let (flipped, other) = if rng.random_range(0..2) == 0 {
                (edge.0, edge.1)
            } else {
                (edge.1, edge.0)
            };
            if current.members(current.part_of(flipped)).len() == 1 {
                continue;
            }
            return current.flip(Flip::from([(flipped, current.part_of(other))]));
        }
        Err(ChainError::DegenerateFlip(current.part_of(cut_edges[0].0)))
    }
}

/// Chunk-flip proposal: choose a cut edge endpoint and flip all of its
/// cross-part neighbors into its part.
#[derive(Clone, Debug, Default)]
pub struct ChunkFlip;

impl Proposal for ChunkFlip {
    fn propose(&self, current: &Arc<Partition>, rng: &mut StdRng) -> Result<Partition> {
        let cut_edges = current.cut_edges()?.iter().copied().collect::<Vec<_>>();
        if cut_edges.is_empty() {
            return Err(ChainError::NoBoundary);
        }

        let &edge = cut_edges.choose(rng).unwrap();
        let anchor = if rng.random_range(0..2) == 0 { edge.0 } else { edge.1 };
        let part = current.part_of(anchor);

        let flips = current.graph().neighbors(anchor)
            .filter(|&u| current.part_of(u) != part)
            .map(|u| (u, part))
            .collect::<Flip>();
        current.flip(flips)
    }
}

/// Flip a uniformly random node (not necessarily on a boundary) to a
/// uniformly random part. Useful for mixing experiments; most flips
/// this produces are contiguity-invalid.
#[derive(Clone, Debug, Default)]
pub struct AnyNodeFlip;

impl Proposal for AnyNodeFlip {
    fn propose(&self, current: &Arc<Partition>, rng: &mut StdRng) -> Result<Partition> {
        let node = rng.random_range(0..current.graph().node_count());
        let parts = current.parts().collect::<Vec<_>>();
        let &part = parts.choose(rng).unwrap();
        current.flip(Flip::from([(node, part)]))
    }
}
