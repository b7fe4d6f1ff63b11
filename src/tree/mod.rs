mod bipartition;
mod seed;
mod spanning;

pub use bipartition::{
    bipartition_tree, BipartitionSpec, BipartitionWarning, SpanningTreeMethod, WarningSink,
};
pub use seed::recursive_seed_part;
pub use spanning::{random_spanning_tree, uniform_spanning_tree, SpanningTree};
