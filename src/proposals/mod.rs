mod flip;
mod recom;

pub use flip::{AnyNodeFlip, ChunkFlip, RandomFlip};
pub use recom::ReCom;

use std::sync::Arc;

use rand::rngs::StdRng;

use crate::error::Result;
use crate::partition::Partition;

/// Produces a candidate next partition as a child of the current one.
/// Structural failures (`NoBoundary`, `DegenerateFlip`,
/// `BipartitionFailure`, `ReselectionExhausted`) are handled inside the
/// proposal's own retry budget and surface only when that budget is
/// exhausted.
pub trait Proposal: Send + Sync {
    fn propose(&self, current: &Arc<Partition>, rng: &mut StdRng) -> Result<Partition>;
}
