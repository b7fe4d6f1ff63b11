mod boundary;
mod county_splits;
mod cut_edges;
mod election;
mod flows;
mod spanning_trees;
mod tally;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

pub use boundary::{polsby_popper, BoundaryNodes, ExteriorBoundaries, InteriorBoundaries, Perimeter};
pub use county_splits::{CountyInfo, CountySplitStatus, CountySplits};
pub use cut_edges::{CutEdges, CutEdgesByPart};
pub use election::{Election, ElectionResults};
pub use flows::{edge_flows, flows_from_flips, neighbor_flips, EdgeFlow, Flow, Flows};
pub use spanning_trees::SpanningTrees;
pub use tally::Tally;

use crate::error::Result;
use crate::graph::{Edge, NodeId};
use crate::partition::{Flip, PartId, Partition};

/// The value an updater caches on a partition.
///
/// A closed enum rather than a trait object: every consumer knows which
/// shape it expects and the chain can clone cached values cheaply.
#[derive(Clone, Debug, PartialEq)]
pub enum UpdaterValue {
    /// A numeric aggregate per part (tallies, perimeters, areas).
    ByPart(BTreeMap<PartId, f64>),
    /// A set of edges (cut edges).
    Edges(BTreeSet<Edge>),
    /// A set of nodes (boundary nodes).
    Nodes(BTreeSet<NodeId>),
    /// Edge sets per part (cut edges by part).
    EdgesByPart(BTreeMap<PartId, BTreeSet<Edge>>),
    /// County split bookkeeping keyed by county value.
    Counties(BTreeMap<String, CountyInfo>),
    /// Node in/out flows per part relative to the parent partition.
    Flows(BTreeMap<PartId, Flow>),
    /// Per-part vote totals and shares for one election.
    Election(ElectionResults),
    /// A spanning tree per part, as edge lists.
    TreesByPart(BTreeMap<PartId, Vec<Edge>>),
}

impl UpdaterValue {
    #[inline]
    pub fn by_part(&self) -> Option<&BTreeMap<PartId, f64>> {
        match self { UpdaterValue::ByPart(v) => Some(v), _ => None }
    }

    #[inline]
    pub fn edges(&self) -> Option<&BTreeSet<Edge>> {
        match self { UpdaterValue::Edges(v) => Some(v), _ => None }
    }

    #[inline]
    pub fn nodes(&self) -> Option<&BTreeSet<NodeId>> {
        match self { UpdaterValue::Nodes(v) => Some(v), _ => None }
    }

    #[inline]
    pub fn edges_by_part(&self) -> Option<&BTreeMap<PartId, BTreeSet<Edge>>> {
        match self { UpdaterValue::EdgesByPart(v) => Some(v), _ => None }
    }

    #[inline]
    pub fn counties(&self) -> Option<&BTreeMap<String, CountyInfo>> {
        match self { UpdaterValue::Counties(v) => Some(v), _ => None }
    }

    #[inline]
    pub fn flows(&self) -> Option<&BTreeMap<PartId, Flow>> {
        match self { UpdaterValue::Flows(v) => Some(v), _ => None }
    }

    #[inline]
    pub fn election(&self) -> Option<&ElectionResults> {
        match self { UpdaterValue::Election(v) => Some(v), _ => None }
    }

    #[inline]
    pub fn trees_by_part(&self) -> Option<&BTreeMap<PartId, Vec<Edge>>> {
        match self { UpdaterValue::TreesByPart(v) => Some(v), _ => None }
    }
}

/// A named pure function of a partition whose value is cached on the
/// partition. Implementations may provide a diff path that derives the new
/// value from the parent's cached value and the flip in O(|flip|) work;
/// the default falls back to a full recomputation.
pub trait Updater: Send + Sync {
    /// Unique name within a registry.
    fn name(&self) -> &str;

    /// Compute the value from scratch.
    fn recompute(&self, partition: &Partition) -> Result<UpdaterValue>;

    /// Derive the value from the parent's cached value plus the flip.
    fn update_from_parent(
        &self,
        parent_value: &UpdaterValue,
        partition: &Partition,
        flips: &Flip,
    ) -> Result<UpdaterValue> {
        let _ = (parent_value, flips);
        self.recompute(partition)
    }
}

/// A frozen, string-keyed registry of updaters, identical across every
/// partition of one chain. Built once; partitions index it by updater id.
#[derive(Clone, Default)]
pub struct UpdaterRegistry {
    updaters: Vec<Arc<dyn Updater>>,
    index: BTreeMap<String, usize>,
}

impl UpdaterRegistry {
    /// An empty registry.
    pub fn new() -> Self { Self::default() }

    /// A registry pre-seeded with the `cut_edges` updater every chain needs.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(CutEdges);
        registry
    }

    /// Register an updater. Panics on a duplicate name.
    pub fn register(&mut self, updater: impl Updater + 'static) -> &mut Self {
        let name = updater.name().to_string();
        assert!(!self.index.contains_key(&name), "duplicate updater '{}'", name);
        self.index.insert(name, self.updaters.len());
        self.updaters.push(Arc::new(updater));
        self
    }

    /// Register an updater already behind a shared handle (used when
    /// merging registries). Panics on a duplicate name.
    pub fn register_shared(&mut self, updater: Arc<dyn Updater>) -> &mut Self {
        let name = updater.name().to_string();
        assert!(!self.index.contains_key(&name), "duplicate updater '{}'", name);
        self.index.insert(name, self.updaters.len());
        self.updaters.push(updater);
        self
    }

    /// Number of registered updaters.
    #[inline] pub fn len(&self) -> usize { self.updaters.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.updaters.is_empty() }

    /// Id of the named updater.
    #[inline]
    pub fn id(&self, name: &str) -> Option<usize> { self.index.get(name).copied() }

    /// Whether an updater with the given name is registered.
    #[inline]
    pub fn contains(&self, name: &str) -> bool { self.index.contains_key(name) }

    /// Updater by id.
    #[inline]
    pub fn get(&self, id: usize) -> &Arc<dyn Updater> { &self.updaters[id] }

    /// Sorted iterator over registered names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(|s| s.as_str())
    }
}

impl std::fmt::Debug for UpdaterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdaterRegistry")
            .field("names", &self.index.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_assigns_dense_ids() {
        let mut r = UpdaterRegistry::with_defaults();
        r.register(Tally::new("pop", "population"));
        assert_eq!(r.len(), 2);
        assert_eq!(r.id("cut_edges"), Some(0));
        assert_eq!(r.id("population"), Some(1));
        assert!(r.contains("population"));
        assert_eq!(r.id("nope"), None);
    }

    #[test]
    #[should_panic(expected = "duplicate updater")]
    fn duplicate_name_panics() {
        let mut r = UpdaterRegistry::new();
        r.register(Tally::new("pop", "population"));
        r.register(Tally::new("pop2", "population"));
    }
}
