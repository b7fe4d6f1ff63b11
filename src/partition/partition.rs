use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, OnceLock};

use crate::error::{ChainError, Result};
use crate::graph::{Edge, Graph, NodeId, Subgraph};
use crate::partition::{Assignment, Flip, PartId};
use crate::updaters::{UpdaterRegistry, UpdaterValue};

/// A partition of a graph's nodes into districts.
///
/// Logically immutable: `flip` returns a child partition that shares the
/// graph and updater registry, keeps a back reference to its parent, and
/// records the flip that produced it. Updater values materialize lazily on
/// first access into a per-instance cache indexed by updater id; diff-aware
/// updaters read the parent's cache plus the flip instead of recomputing.
#[derive(Debug)]
pub struct Partition {
    graph: Arc<Graph>,
    assignment: Assignment,
    registry: Arc<UpdaterRegistry>,
    cache: Vec<OnceLock<Result<UpdaterValue>>>,
    parent: Option<Arc<Partition>>,
    flips: Flip,
}

impl Partition {
    /// Build the initial partition of a chain. The `cut_edges` updater is
    /// registered automatically if the caller did not include it.
    pub fn new(
        graph: impl Into<Arc<Graph>>,
        assignment: Assignment,
        mut updaters: UpdaterRegistry,
    ) -> Result<Self> {
        let graph: Arc<Graph> = graph.into();
        if assignment.node_count() != graph.node_count() {
            return Err(ChainError::InvalidInitialState(format!(
                "assignment covers {} nodes, graph has {}",
                assignment.node_count(),
                graph.node_count()
            )));
        }
        if !updaters.contains("cut_edges") {
            updaters.register(crate::updaters::CutEdges);
        }

        let cache = (0..updaters.len()).map(|_| OnceLock::new()).collect();
        Ok(Self {
            graph,
            assignment,
            registry: Arc::new(updaters),
            cache,
            parent: None,
            flips: Flip::new(),
        })
    }

    /// Build a child partition by applying a flip.
    pub fn flip(self: &Arc<Self>, flips: Flip) -> Result<Partition> {
        let assignment = self.assignment.clone_with_flip(&flips)?;
        let cache = (0..self.registry.len()).map(|_| OnceLock::new()).collect();
        Ok(Partition {
            graph: self.graph.clone(),
            assignment,
            registry: self.registry.clone(),
            cache,
            parent: Some(self.clone()),
            flips,
        })
    }

    /// The underlying graph.
    #[inline] pub fn graph(&self) -> &Graph { &self.graph }

    /// Shared handle to the underlying graph.
    #[inline] pub fn graph_arc(&self) -> &Arc<Graph> { &self.graph }

    /// The node/part assignment.
    #[inline] pub fn assignment(&self) -> &Assignment { &self.assignment }

    /// The updater registry shared by every partition of the chain.
    #[inline] pub fn registry(&self) -> &UpdaterRegistry { &self.registry }

    /// The parent partition, if this one arose through a flip.
    #[inline] pub fn parent(&self) -> Option<&Arc<Partition>> { self.parent.as_ref() }

    /// The flip that produced this partition (empty for the initial state).
    #[inline] pub fn flips(&self) -> &Flip { &self.flips }

    /// The part a node belongs to.
    #[inline] pub fn part_of(&self, v: NodeId) -> PartId { self.assignment.part_of(v) }

    /// Sorted members of a part.
    #[inline] pub fn members(&self, p: PartId) -> &BTreeSet<NodeId> { self.assignment.members(p) }

    /// Sorted iterator over part ids.
    #[inline]
    pub fn parts(&self) -> impl Iterator<Item = PartId> + '_ { self.assignment.parts() }

    /// Number of parts.
    #[inline] pub fn part_count(&self) -> usize { self.assignment.part_count() }

    /// Whether an edge's endpoints sit in different parts.
    #[inline]
    pub fn crosses_parts(&self, e: Edge) -> bool {
        self.part_of(e.0) != self.part_of(e.1)
    }

    /// Induced-subgraph view over one part.
    pub fn part_subgraph(&self, p: PartId) -> Subgraph<'_> {
        self.graph.subgraph(self.members(p).iter().copied())
    }

    /// Induced-subgraph view over the union of two parts.
    pub fn merged_subgraph(&self, p: PartId, q: PartId) -> Subgraph<'_> {
        self.graph.subgraph(
            self.members(p).iter().chain(self.members(q).iter()).copied(),
        )
    }

    /// The cached value of a registered updater, computing it on first
    /// access. Updater failures surface as `UpdaterFailure`.
    pub fn value(&self, name: &str) -> Result<&UpdaterValue> {
        let id = self.registry.id(name).ok_or_else(|| ChainError::UpdaterFailure {
            name: name.to_string(),
            cause: "updater is not registered".to_string(),
        })?;
        self.value_by_id(id)
    }

    /// The cached value of an updater by registry id.
    pub fn value_by_id(&self, id: usize) -> Result<&UpdaterValue> {
        let slot = self.cache[id].get_or_init(|| self.compute(id));
        match slot {
            Ok(value) => Ok(value),
            Err(e) => Err(e.clone()),
        }
    }

    fn compute(&self, id: usize) -> Result<UpdaterValue> {
        let updater = self.registry.get(id).clone();
        let result = match &self.parent {
            Some(parent) => {
                let parent_value = parent.value_by_id(id)?;
                updater.update_from_parent(parent_value, self, &self.flips)
            }
            None => updater.recompute(self),
        };
        result.map_err(|e| match e {
            ChainError::UpdaterFailure { .. } => e,
            other => ChainError::UpdaterFailure {
                name: updater.name().to_string(),
                cause: other.to_string(),
            },
        })
    }

    /// The cut-edge set, via the `cut_edges` updater.
    pub fn cut_edges(&self) -> Result<&BTreeSet<Edge>> {
        self.value("cut_edges")?.edges().ok_or_else(|| ChainError::UpdaterFailure {
            name: "cut_edges".to_string(),
            cause: "unexpected value shape".to_string(),
        })
    }

    /// A numeric per-part updater value (tallies, perimeters).
    pub fn by_part(&self, name: &str) -> Result<&BTreeMap<PartId, f64>> {
        self.value(name)?.by_part().ok_or_else(|| ChainError::UpdaterFailure {
            name: name.to_string(),
            cause: "updater is not a per-part number".to_string(),
        })
    }

    /// Materialize every registered updater, so the partition no longer
    /// needs its parent's caches.
    pub fn seal(&self) -> Result<()> {
        for id in 0..self.registry.len() {
            self.value_by_id(id)?;
        }
        Ok(())
    }

    /// Drop the parent back reference. The chain seals an accepted state
    /// and then detaches it, which is what lets a long run reclaim its
    /// tail instead of keeping every ancestor alive.
    pub fn detach_parent(&mut self) {
        self.parent = None;
    }
}

impl Clone for Partition {
    fn clone(&self) -> Self {
        let cache = self.cache.iter()
            .map(|slot| {
                let fresh = OnceLock::new();
                if let Some(value) = slot.get() {
                    let _ = fresh.set(value.clone());
                }
                fresh
            })
            .collect();
        Self {
            graph: self.graph.clone(),
            assignment: self.assignment.clone(),
            registry: self.registry.clone(),
            cache,
            parent: self.parent.clone(),
            flips: self.flips.clone(),
        }
    }
}
