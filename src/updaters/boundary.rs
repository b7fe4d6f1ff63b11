use std::collections::{BTreeMap, BTreeSet};

use crate::error::{ChainError, Result};
use crate::partition::{Flip, PartId, Partition};
use crate::updaters::{flows_from_flips, Updater, UpdaterValue};

/// Nodes flagged with the `boundary_node` attribute: the exterior border
/// of the mapped region. Constant across every partition of a chain.
#[derive(Clone, Copy, Debug, Default)]
pub struct BoundaryNodes;

impl Updater for BoundaryNodes {
    fn name(&self) -> &str { "boundary_nodes" }

    fn recompute(&self, partition: &Partition) -> Result<UpdaterValue> {
        let graph = partition.graph();
        let mut nodes = BTreeSet::new();
        for v in 0..graph.node_count() {
            if graph.node_attrs().bool("boundary_node", v)? {
                nodes.insert(v);
            }
        }
        Ok(UpdaterValue::Nodes(nodes))
    }

    fn update_from_parent(
        &self,
        parent_value: &UpdaterValue,
        _partition: &Partition,
        _flips: &Flip,
    ) -> Result<UpdaterValue> {
        Ok(parent_value.clone())
    }
}

/// Per-part sums of `boundary_perim` over each part's exterior-border
/// nodes. Diff path adds and removes the perimeter of flowed nodes that
/// sit on the exterior border.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExteriorBoundaries;

impl Updater for ExteriorBoundaries {
    fn name(&self) -> &str { "exterior_boundaries" }

    fn recompute(&self, partition: &Partition) -> Result<UpdaterValue> {
        let graph = partition.graph();
        let boundary = boundary_nodes(partition)?;
        let mut sums = BTreeMap::new();
        for p in partition.parts() {
            let mut sum = 0.0;
            for &v in partition.members(p) {
                if boundary.contains(&v) {
                    sum += graph.node_attrs().float("boundary_perim", v)?;
                }
            }
            sums.insert(p, sum);
        }
        Ok(UpdaterValue::ByPart(sums))
    }

    fn update_from_parent(
        &self,
        parent_value: &UpdaterValue,
        partition: &Partition,
        flips: &Flip,
    ) -> Result<UpdaterValue> {
        let (Some(parent), Some(old)) = (partition.parent(), parent_value.by_part()) else {
            return self.recompute(partition);
        };

        let graph = partition.graph();
        let boundary = boundary_nodes(partition)?;
        let mut sums = old.clone();
        for (p, flow) in flows_from_flips(parent, flips) {
            let mut sum = *sums.get(&p).unwrap_or(&0.0);
            for &v in flow.inflow.iter().filter(|&&v| boundary.contains(&v)) {
                sum += graph.node_attrs().float("boundary_perim", v)?;
            }
            for &v in flow.outflow.iter().filter(|&&v| boundary.contains(&v)) {
                sum -= graph.node_attrs().float("boundary_perim", v)?;
            }
            sums.insert(p, sum);
        }
        Ok(UpdaterValue::ByPart(sums))
    }
}

/// Per-part sums of `shared_perim` over each part's cut edges: the border
/// each part shares with other parts. Derived from `cut_edges_by_part`,
/// which carries the diff.
#[derive(Clone, Copy, Debug, Default)]
pub struct InteriorBoundaries;

impl Updater for InteriorBoundaries {
    fn name(&self) -> &str { "interior_boundaries" }

    fn recompute(&self, partition: &Partition) -> Result<UpdaterValue> {
        let graph = partition.graph();
        let by_part = partition.value("cut_edges_by_part")?.edges_by_part()
            .ok_or_else(|| ChainError::MissingAttribute("cut_edges_by_part".into()))?;
        let mut sums = BTreeMap::new();
        for (&p, edges) in by_part {
            let mut sum = 0.0;
            for &e in edges {
                sum += graph.edge_float(e, "shared_perim")?;
            }
            sums.insert(p, sum);
        }
        Ok(UpdaterValue::ByPart(sums))
    }
}

/// Per-part total perimeter: exterior plus interior boundary lengths.
#[derive(Clone, Copy, Debug, Default)]
pub struct Perimeter;

impl Updater for Perimeter {
    fn name(&self) -> &str { "perimeter" }

    fn recompute(&self, partition: &Partition) -> Result<UpdaterValue> {
        let exterior = partition.by_part("exterior_boundaries")?.clone();
        let interior = partition.by_part("interior_boundaries")?;
        let mut sums = BTreeMap::new();
        for p in partition.parts() {
            let e = exterior.get(&p).copied().unwrap_or(0.0);
            let i = interior.get(&p).copied().unwrap_or(0.0);
            sums.insert(p, e + i);
        }
        Ok(UpdaterValue::ByPart(sums))
    }
}

fn boundary_nodes(partition: &Partition) -> Result<BTreeSet<usize>> {
    Ok(partition.value("boundary_nodes")?.nodes()
        .ok_or_else(|| ChainError::MissingAttribute("boundary_nodes".into()))?
        .clone())
}

/// Per-part Polsby-Popper compactness, `4π·area / perimeter²`. Needs the
/// geographic updaters registered.
pub fn polsby_popper(partition: &Partition) -> Result<BTreeMap<PartId, f64>> {
    let area = partition.by_part("area")?.clone();
    let perimeter = partition.by_part("perimeter")?;
    let mut scores = BTreeMap::new();
    for p in partition.parts() {
        let a = area.get(&p).copied().unwrap_or(0.0);
        let l = perimeter.get(&p).copied().unwrap_or(0.0);
        let score = if l > 0.0 { 4.0 * std::f64::consts::PI * a / (l * l) } else { 0.0 };
        scores.insert(p, score);
    }
    Ok(scores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{AttrColumn, AttributeTable, Graph};
    use crate::partition::Assignment;
    use std::sync::Arc;

    /// 2x2 grid of unit squares, every node on the map border with
    /// exterior perimeter 2, every edge sharing a border of length 1.
    fn geographic_partition() -> Arc<Partition> {
        let ids = (0..4).map(|i| i.to_string()).collect();
        let mut node_attrs = AttributeTable::new(4);
        node_attrs.insert("boundary_node", AttrColumn::Bool(vec![true; 4])).unwrap();
        node_attrs.insert("boundary_perim", AttrColumn::Float(vec![2.0; 4])).unwrap();
        node_attrs.insert("area", AttrColumn::Float(vec![1.0; 4])).unwrap();
        let mut edge_attrs = AttributeTable::new(4);
        edge_attrs.insert("shared_perim", AttrColumn::Float(vec![1.0; 4])).unwrap();
        let graph = Graph::from_adjacency(
            ids, &[(0, 1), (2, 3), (0, 2), (1, 3)], node_attrs, edge_attrs,
        ).unwrap();
        let assignment = Assignment::from_vec(vec![0, 1, 0, 1]).unwrap();
        Arc::new(Partition::new_geographic(graph, assignment, Default::default()).unwrap())
    }

    #[test]
    fn initial_boundary_values() {
        let p = geographic_partition();
        assert_eq!(p.value("boundary_nodes").unwrap().nodes().unwrap().len(), 4);
        let exterior = p.by_part("exterior_boundaries").unwrap();
        assert_eq!(exterior[&0], 4.0);
        assert_eq!(exterior[&1], 4.0);
        let interior = p.by_part("interior_boundaries").unwrap();
        assert_eq!(interior[&0], 2.0);
        let perimeter = p.by_part("perimeter").unwrap();
        assert_eq!(perimeter[&0], 6.0);
        assert_eq!(p.by_part("area").unwrap()[&0], 2.0);
    }

    #[test]
    fn diff_matches_recompute_after_flip() {
        let p = geographic_partition();
        let child = p.flip(crate::partition::Flip::from([(1, 0)])).unwrap();

        let exterior = child.by_part("exterior_boundaries").unwrap().clone();
        assert_eq!(UpdaterValue::ByPart(exterior), ExteriorBoundaries.recompute(&child).unwrap());

        let interior = child.by_part("interior_boundaries").unwrap().clone();
        assert_eq!(UpdaterValue::ByPart(interior.clone()), InteriorBoundaries.recompute(&child).unwrap());
        // Parts {0,1,2} vs {3}: cut edges (1,3) and (2,3).
        assert_eq!(interior[&0], 2.0);
        assert_eq!(interior[&1], 2.0);
    }

    #[test]
    fn polsby_popper_scores() {
        let p = geographic_partition();
        let scores = polsby_popper(&p).unwrap();
        let expected = 4.0 * std::f64::consts::PI * 2.0 / 36.0;
        assert!((scores[&0] - expected).abs() < 1e-12);
    }
}
