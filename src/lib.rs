#![doc = "Manderchain public API: a Markov chain sampler over districting plans"]

mod accept;
mod chain;
mod constraints;
mod error;
mod graph;
mod optimize;
mod partition;
mod proposals;
mod replay;
mod tree;
mod updaters;

#[doc(inline)]
pub use error::{ChainError, Result};

#[doc(inline)]
pub use graph::{edge, AttrColumn, AttrValue, AttributeTable, Edge, Graph, NodeId, Subgraph};

#[doc(inline)]
pub use partition::{geographic_updaters, Assignment, Flip, PartId, Partition};

#[doc(inline)]
pub use updaters::{
    edge_flows, flows_from_flips, neighbor_flips, polsby_popper, BoundaryNodes, CountyInfo,
    CountySplitStatus, CountySplits, CutEdges, CutEdgesByPart, EdgeFlow, Election,
    ElectionResults, ExteriorBoundaries, Flow, Flows, InteriorBoundaries, Perimeter,
    SpanningTrees, Tally, Updater, UpdaterRegistry, UpdaterValue,
};

#[doc(inline)]
pub use tree::{
    bipartition_tree, random_spanning_tree, recursive_seed_part, uniform_spanning_tree,
    BipartitionSpec, BipartitionWarning, SpanningTree, SpanningTreeMethod, WarningSink,
};

#[doc(inline)]
pub use proposals::{AnyNodeFlip, ChunkFlip, Proposal, RandomFlip, ReCom};

#[doc(inline)]
pub use constraints::{
    cut_edge_count, l1_polsby_popper, l1_reciprocal_polsby_popper, l_minus_1_polsby_popper,
    no_vanishing_parts, no_worse_l1_reciprocal_polsby_popper, no_worse_l_minus_1_polsby_popper,
    refuse_new_county_splits, within_percent_of_ideal_population, Bounds, Constraint,
    ConstraintResult, Contiguous, LowerBound, NoVanishingParts, RefuseNewCountySplits, ScoreFn,
    SelfConfiguringLowerBound, SelfConfiguringUpperBound, SingleFlipContiguous, UpperBound,
    Validator, ValuesFn, WithinPercentRangeOfBounds,
};

#[doc(inline)]
pub use accept::{
    Accept, AlwaysAccept, BetaSchedule, CutEdgeAccept, MetropolisHastings, TiltedAccept,
};

#[doc(inline)]
pub use chain::{CancelToken, ChainState, MarkovChain};

#[doc(inline)]
pub use optimize::{Gingleator, GingleatorScore, SingleMetricOptimizer};

#[doc(inline)]
pub use replay::{replay, FlipRecorder};
