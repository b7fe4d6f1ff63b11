use std::sync::Arc;

use crate::error::Result;
use crate::graph::Graph;
use crate::partition::{Assignment, Partition};
use crate::updaters::{
    BoundaryNodes, CutEdges, CutEdgesByPart, ExteriorBoundaries, InteriorBoundaries, Perimeter,
    Tally, UpdaterRegistry,
};

/// The updaters a geographic partition carries by default: areas,
/// perimeters, and boundary bookkeeping, enough to compute compactness
/// scores such as Polsby-Popper.
pub fn geographic_updaters() -> UpdaterRegistry {
    let mut registry = UpdaterRegistry::new();
    registry
        .register(CutEdges)
        .register(CutEdgesByPart)
        .register(BoundaryNodes)
        .register(ExteriorBoundaries)
        .register(InteriorBoundaries)
        .register(Perimeter)
        .register(Tally::new("area", "area"));
    registry
}

impl Partition {
    /// A partition pre-registered with the geographic updaters, plus any
    /// extra updaters the caller supplies. Requires the `boundary_node`
    /// and `boundary_perim` node attributes and the `shared_perim` and
    /// `area` columns of a geographically-sourced graph.
    pub fn new_geographic(
        graph: impl Into<Arc<Graph>>,
        assignment: Assignment,
        extra: UpdaterRegistry,
    ) -> Result<Self> {
        let mut registry = geographic_updaters();
        for name in extra.names().map(String::from).collect::<Vec<_>>() {
            let id = extra.id(&name).unwrap();
            registry.register_shared(extra.get(id).clone());
        }
        Partition::new(graph, assignment, registry)
    }
}
