use std::collections::{BTreeMap, BTreeSet};

use crate::error::Result;
use crate::graph::{edge, Edge, NodeId};
use crate::partition::{Flip, PartId, Partition};
use crate::updaters::{Updater, UpdaterValue};

/// Nodes that entered and left one part between a partition and its parent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Flow {
    pub inflow: BTreeSet<NodeId>,
    pub outflow: BTreeSet<NodeId>,
}

impl Flow {
    /// Net change in member count.
    #[inline]
    pub fn net(&self) -> i64 {
        self.inflow.len() as i64 - self.outflow.len() as i64
    }
}

/// Cut edges that entered and left one part's incident set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EdgeFlow {
    pub inflow: BTreeSet<Edge>,
    pub outflow: BTreeSet<Edge>,
}

/// Per-part node flows implied by a flip against the parent assignment.
pub fn flows_from_flips(parent: &Partition, flips: &Flip) -> BTreeMap<PartId, Flow> {
    let mut flows: BTreeMap<PartId, Flow> = BTreeMap::new();
    for (&v, &target) in flips {
        let source = parent.part_of(v);
        if source == target { continue }
        flows.entry(target).or_default().inflow.insert(v);
        flows.entry(source).or_default().outflow.insert(v);
    }
    flows
}

/// Every edge incident to a flipped node, normalized.
pub fn neighbor_flips(partition: &Partition) -> BTreeSet<Edge> {
    let graph = partition.graph();
    partition.flips().keys()
        .flat_map(|&v| graph.neighbors(v).map(move |u| edge(v, u)))
        .collect()
}

/// Per-part cut-edge flows between a partition and its parent: which
/// edges joined or left each part's incident cut set.
pub fn edge_flows(partition: &Partition, parent: &Partition) -> BTreeMap<PartId, EdgeFlow> {
    let mut flows: BTreeMap<PartId, EdgeFlow> = BTreeMap::new();

    for e in neighbor_flips(partition) {
        let old_parts = [parent.part_of(e.0), parent.part_of(e.1)];
        let new_parts = [partition.part_of(e.0), partition.part_of(e.1)];
        let was_cut = old_parts[0] != old_parts[1];
        let cut = new_parts[0] != new_parts[1];

        if was_cut && !cut {
            for p in BTreeSet::from(old_parts) {
                flows.entry(p).or_default().outflow.insert(e);
            }
        } else if !was_cut && cut {
            for p in BTreeSet::from(new_parts) {
                flows.entry(p).or_default().inflow.insert(e);
            }
        } else if was_cut && cut {
            let old = BTreeSet::from(old_parts);
            let new = BTreeSet::from(new_parts);
            for &p in old.difference(&new) {
                flows.entry(p).or_default().outflow.insert(e);
            }
            for &p in new.difference(&old) {
                flows.entry(p).or_default().inflow.insert(e);
            }
        }
    }
    flows
}

/// Updater exposing the per-part node flows of the last flip. The
/// initial partition has an empty flow for every part.
#[derive(Clone, Debug)]
pub struct Flows {
    alias: String,
}

impl Flows {
    pub fn new(alias: impl Into<String>) -> Self {
        Self { alias: alias.into() }
    }
}

impl Default for Flows {
    fn default() -> Self { Self::new("flows") }
}

impl Updater for Flows {
    fn name(&self) -> &str { &self.alias }

    fn recompute(&self, partition: &Partition) -> Result<UpdaterValue> {
        let mut flows = partition.parts()
            .map(|p| (p, Flow::default()))
            .collect::<BTreeMap<_, _>>();
        if let Some(parent) = partition.parent() {
            for (p, flow) in flows_from_flips(parent, partition.flips()) {
                flows.insert(p, flow);
            }
        }
        Ok(UpdaterValue::Flows(flows))
    }
}
