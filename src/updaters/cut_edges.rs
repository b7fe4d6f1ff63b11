use std::collections::{BTreeMap, BTreeSet};

use crate::error::Result;
use crate::graph::Edge;
use crate::partition::{Flip, PartId, Partition};
use crate::updaters::{edge_flows, neighbor_flips, Updater, UpdaterValue};

/// The set of edges whose endpoints sit in different parts.
///
/// Diff path: only edges incident to a flipped node can change status, so
/// the parent's set is patched edge by edge.
#[derive(Clone, Copy, Debug, Default)]
pub struct CutEdges;

impl Updater for CutEdges {
    fn name(&self) -> &str { "cut_edges" }

    fn recompute(&self, partition: &Partition) -> Result<UpdaterValue> {
        let cut = partition.graph().edges()
            .filter(|&e| partition.crosses_parts(e))
            .collect::<BTreeSet<_>>();
        Ok(UpdaterValue::Edges(cut))
    }

    fn update_from_parent(
        &self,
        parent_value: &UpdaterValue,
        partition: &Partition,
        _flips: &Flip,
    ) -> Result<UpdaterValue> {
        let Some(old) = parent_value.edges() else { return self.recompute(partition) };

        let mut cut = old.clone();
        for e in neighbor_flips(partition) {
            if partition.crosses_parts(e) {
                cut.insert(e);
            } else {
                cut.remove(&e);
            }
        }
        Ok(UpdaterValue::Edges(cut))
    }
}

/// Cut edges grouped by the parts they touch; each cut edge appears under
/// both endpoint parts.
///
/// Diff path: apply the per-part edge flows to the parent's sets.
#[derive(Clone, Copy, Debug, Default)]
pub struct CutEdgesByPart;

impl Updater for CutEdgesByPart {
    fn name(&self) -> &str { "cut_edges_by_part" }

    fn recompute(&self, partition: &Partition) -> Result<UpdaterValue> {
        let mut by_part: BTreeMap<PartId, BTreeSet<Edge>> = partition.parts()
            .map(|p| (p, BTreeSet::new()))
            .collect();
        for &e in partition.cut_edges()? {
            by_part.get_mut(&partition.part_of(e.0)).unwrap().insert(e);
            by_part.get_mut(&partition.part_of(e.1)).unwrap().insert(e);
        }
        Ok(UpdaterValue::EdgesByPart(by_part))
    }

    fn update_from_parent(
        &self,
        parent_value: &UpdaterValue,
        partition: &Partition,
        _flips: &Flip,
    ) -> Result<UpdaterValue> {
        let (Some(parent), Some(old)) = (partition.parent(), parent_value.edges_by_part()) else {
            return self.recompute(partition);
        };

        let mut by_part = old.clone();
        for (p, flow) in edge_flows(partition, parent) {
            let set = by_part.entry(p).or_default();
            for e in &flow.outflow {
                set.remove(e);
            }
            for &e in &flow.inflow {
                set.insert(e);
            }
        }
        Ok(UpdaterValue::EdgesByPart(by_part))
    }
}
