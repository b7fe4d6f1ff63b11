use std::collections::BTreeMap;

use crate::error::Result;
use crate::partition::{Flip, Partition};
use crate::updaters::{flows_from_flips, Updater, UpdaterValue};

/// Sums a numeric node attribute per part, under an alias of the
/// caller's choosing (`Tally::new("TOTPOP", "population")`).
///
/// Diff path: add the values of nodes that flipped in, subtract the
/// values of nodes that flipped out.
#[derive(Clone, Debug)]
pub struct Tally {
    column: String,
    alias: String,
}

impl Tally {
    pub fn new(column: impl Into<String>, alias: impl Into<String>) -> Self {
        Self { column: column.into(), alias: alias.into() }
    }

    /// The node attribute column being summed.
    #[inline] pub fn column(&self) -> &str { &self.column }
}

impl Updater for Tally {
    fn name(&self) -> &str { &self.alias }

    fn recompute(&self, partition: &Partition) -> Result<UpdaterValue> {
        let graph = partition.graph();
        let mut tally = BTreeMap::new();
        for p in partition.parts() {
            let mut sum = 0.0;
            for &v in partition.members(p) {
                sum += graph.node_float(v, &self.column)?;
            }
            tally.insert(p, sum);
        }
        Ok(UpdaterValue::ByPart(tally))
    }

    fn update_from_parent(
        &self,
        parent_value: &UpdaterValue,
        partition: &Partition,
        flips: &Flip,
    ) -> Result<UpdaterValue> {
        let Some(parent) = partition.parent() else { return self.recompute(partition) };
        let Some(old) = parent_value.by_part() else { return self.recompute(partition) };

        let graph = partition.graph();
        let mut tally = old.clone();
        for (p, flow) in flows_from_flips(parent, flips) {
            let mut sum = *tally.get(&p).unwrap_or(&0.0);
            for &v in &flow.inflow {
                sum += graph.node_float(v, &self.column)?;
            }
            for &v in &flow.outflow {
                sum -= graph.node_float(v, &self.column)?;
            }
            tally.insert(p, sum);
        }
        Ok(UpdaterValue::ByPart(tally))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{AttrColumn, AttributeTable, Graph};
    use crate::partition::Assignment;
    use crate::updaters::UpdaterRegistry;
    use std::sync::Arc;

    fn path_partition() -> Arc<Partition> {
        // a - b - c with populations 10, 20, 30; {a, b} vs {c}.
        let ids = vec!["a".into(), "b".into(), "c".into()];
        let mut node_attrs = AttributeTable::new(3);
        node_attrs.insert("pop", AttrColumn::Int(vec![10, 20, 30])).unwrap();
        let graph = Graph::from_adjacency(
            ids, &[(0, 1), (1, 2)], node_attrs, AttributeTable::new(2),
        ).unwrap();
        let assignment = Assignment::from_vec(vec![0, 0, 1]).unwrap();
        let mut registry = UpdaterRegistry::with_defaults();
        registry.register(Tally::new("pop", "population"));
        Arc::new(Partition::new(graph, assignment, registry).unwrap())
    }

    #[test]
    fn initial_tally_sums_members() {
        let p = path_partition();
        let tally = p.by_part("population").unwrap();
        assert_eq!(tally[&0], 30.0);
        assert_eq!(tally[&1], 30.0);
    }

    #[test]
    fn diff_path_matches_recompute_after_flip() {
        let p = path_partition();
        let child = p.flip(Flip::from([(1, 1)])).unwrap();
        let diffed = child.by_part("population").unwrap().clone();
        assert_eq!(diffed[&0], 10.0);
        assert_eq!(diffed[&1], 50.0);

        let tally = Tally::new("pop", "population");
        let recomputed = tally.recompute(&child).unwrap();
        assert_eq!(UpdaterValue::ByPart(diffed), recomputed);
    }

    #[test]
    fn missing_column_surfaces_as_updater_failure() {
        let ids = vec!["a".into(), "b".into()];
        let graph = Graph::from_adjacency(
            ids, &[(0, 1)], AttributeTable::new(2), AttributeTable::new(1),
        ).unwrap();
        let assignment = Assignment::from_vec(vec![0, 1]).unwrap();
        let mut registry = UpdaterRegistry::new();
        registry.register(Tally::new("pop", "population"));
        let p = Partition::new(graph, assignment, registry).unwrap();
        assert!(p.by_part("population").is_err());
    }
}
