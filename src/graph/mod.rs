mod attributes;
mod graph;
mod json;
mod subgraph;

pub use attributes::{AttrColumn, AttrValue, AttributeTable};
pub use graph::{edge, Edge, Graph, NodeId};
pub use subgraph::Subgraph;
