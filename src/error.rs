use thiserror::Error;

use crate::graph::NodeId;
use crate::partition::PartId;

/// Unified error type for the chain engine.
///
/// Input errors (`InvalidGraph`, `UnknownNode`, `MissingAttribute`,
/// `InvalidInitialState`) are fatal and surface to the caller immediately.
/// Structural failures during a proposal (`BipartitionFailure`,
/// `DegenerateFlip`, `NoBoundary`, `ReselectPair`) are recovered locally by
/// bounded retry and only surface once the retry budget is exhausted.
#[derive(Debug, Clone, Error)]
pub enum ChainError {
    /// The graph constructor rejected the input topology.
    #[error("invalid graph: {0}")]
    InvalidGraph(String),

    /// A node id outside `0..node_count` was passed to an accessor.
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    /// A node or edge attribute lookup named a column that does not exist
    /// or has the wrong type.
    #[error("missing attribute '{0}'")]
    MissingAttribute(String),

    /// The starting partition failed the chain's constraint stack.
    #[error("initial state is not valid: {0}")]
    InvalidInitialState(String),

    /// A flip would leave the named part with no members.
    #[error("flip would empty part {0}")]
    DegenerateFlip(PartId),

    /// The partition has no cut edges, so no boundary flip exists.
    #[error("partition has no cut edges to flip across")]
    NoBoundary,

    /// No balanced cut was found within the spanning-tree retry budget.
    #[error("no balanced cut found after {attempts} spanning tree draws")]
    BipartitionFailure { attempts: usize },

    /// A bipartition gave up on the current district pair and asks the
    /// caller to merge a different pair instead.
    #[error("bipartition requests reselection of the district pair")]
    ReselectPair,

    /// Pair reselection itself ran out of adjacent pairs to try.
    #[error("pair reselection exhausted after {attempts} pairs")]
    ReselectionExhausted { attempts: usize },

    /// Too many constraint-invalid proposals in a row within one chain step.
    #[error("chain step rejected {attempts} proposals in a row")]
    RejectionExhausted { attempts: usize },

    /// Random seeding could not produce a balanced initial assignment.
    #[error("failed to seed a balanced assignment after {attempts} attempts")]
    SeedFailure { attempts: usize },

    /// An updater failed to compute; the chain treats the candidate
    /// partition as invalid rather than aborting the run.
    #[error("updater '{name}' failed: {cause}")]
    UpdaterFailure { name: String, cause: String },
}

pub type Result<T, E = ChainError> = std::result::Result<T, E>;
