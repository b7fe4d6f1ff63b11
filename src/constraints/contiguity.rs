use std::collections::{BTreeSet, VecDeque};

use crate::constraints::{Constraint, ConstraintResult};
use crate::error::Result;
use crate::partition::{PartId, Partition};

/// Requires every part's induced subgraph to be connected.
///
/// With a parent available, only the parts the flip touched are checked;
/// the others were connected before and did not change. Island nodes
/// (degree zero) fail automatically inside any part of size greater
/// than one.
#[derive(Clone, Copy, Debug, Default)]
pub struct Contiguous;

impl Contiguous {
    fn affected_parts(partition: &Partition) -> BTreeSet<PartId> {
        match partition.parent() {
            None => partition.parts().collect(),
            Some(parent) => {
                let mut affected = BTreeSet::new();
                for (&v, &target) in partition.flips() {
                    affected.insert(target);
                    affected.insert(parent.part_of(v));
                }
                affected
            }
        }
    }

    fn part_is_connected(partition: &Partition, part: PartId) -> bool {
        let Some(members) = partition.assignment().members_opt(part) else { return false };
        if members.len() <= 1 { return true }

        let graph = partition.graph();
        let &start = members.first().unwrap();
        let mut visited = BTreeSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some(u) = queue.pop_front() {
            for v in graph.neighbors(u) {
                if partition.part_of(v) == part && visited.insert(v) {
                    queue.push_back(v);
                }
            }
        }
        visited.len() == members.len()
    }
}

impl Constraint for Contiguous {
    fn name(&self) -> &str { "contiguous" }

    fn check(&self, partition: &Partition) -> Result<ConstraintResult> {
        for part in Self::affected_parts(partition) {
            if !Self::part_is_connected(partition, part) {
                return Ok(ConstraintResult::Fail(format!("part {part} is disconnected")));
            }
        }
        Ok(ConstraintResult::Pass)
    }
}

/// Contiguity specialized to a single-node flip of `v` from `p_old` to
/// `p_new`:
///
/// 1. `p_new` stays connected whenever `v` already had a neighbor there.
/// 2. `p_old` minus `v` stays connected iff all of `v`'s remaining
///    `p_old` neighbors reach each other without going through `v`,
///    checked by a BFS local to `p_old`.
///
/// Any other flip shape is `Indeterminate`, which sends the validator to
/// the full check.
#[derive(Clone, Copy, Debug, Default)]
pub struct SingleFlipContiguous;

impl Constraint for SingleFlipContiguous {
    fn name(&self) -> &str { "single_flip_contiguous" }

    fn check(&self, partition: &Partition) -> Result<ConstraintResult> {
        let Some(parent) = partition.parent() else { return Ok(ConstraintResult::Indeterminate) };
        if partition.flips().len() != 1 {
            return Ok(ConstraintResult::Indeterminate);
        }

        let (&v, &p_new) = partition.flips().iter().next().unwrap();
        let p_old = parent.part_of(v);
        if p_old == p_new { return Ok(ConstraintResult::Pass) }

        let graph = partition.graph();
        if !graph.neighbors(v).any(|u| partition.part_of(u) == p_new && u != v) {
            return Ok(ConstraintResult::Fail(format!(
                "node {v} has no neighbor in its new part {p_new}"
            )));
        }

        // Neighbors of v left behind in the old part; they must all sit
        // in one component of p_old without v.
        let targets = graph.neighbors(v)
            .filter(|&u| partition.part_of(u) == p_old)
            .collect::<Vec<_>>();
        if targets.is_empty() {
            return Ok(ConstraintResult::Fail(format!(
                "part {p_old} has no remaining neighbor of node {v}"
            )));
        }
        if targets.len() == 1 { return Ok(ConstraintResult::Pass) }

        let mut remaining = targets.len() - 1;
        let mut visited = BTreeSet::from([targets[0]]);
        let mut queue = VecDeque::from([targets[0]]);
        let in_targets = targets.iter().copied().collect::<BTreeSet<_>>();
        while let Some(u) = queue.pop_front() {
            for w in graph.neighbors(u) {
                if w != v && partition.part_of(w) == p_old && visited.insert(w) {
                    queue.push_back(w);
                    if in_targets.contains(&w) {
                        remaining -= 1;
                        if remaining == 0 { return Ok(ConstraintResult::Pass) }
                    }
                }
            }
        }

        Ok(ConstraintResult::Fail(format!(
            "removing node {v} disconnects part {p_old}"
        )))
    }

    fn check_full(&self, partition: &Partition) -> Result<ConstraintResult> {
        Contiguous.check(partition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{AttributeTable, Graph};
    use crate::partition::{Assignment, Flip};
    use crate::updaters::UpdaterRegistry;
    use std::sync::Arc;

    fn cycle_partition() -> Arc<Partition> {
        // 6-cycle with parts {0,1,2} and {3,4,5}.
        let ids = (0..6).map(|i| i.to_string()).collect();
        let edges = (0..6).map(|i| (i, (i + 1) % 6)).collect::<Vec<_>>();
        let graph = Graph::from_adjacency(
            ids, &edges, AttributeTable::new(6), AttributeTable::new(6),
        ).unwrap();
        let assignment = Assignment::from_vec(vec![0, 0, 0, 1, 1, 1]).unwrap();
        Arc::new(Partition::new(graph, assignment, UpdaterRegistry::with_defaults()).unwrap())
    }

    #[test]
    fn initial_cycle_partition_is_contiguous() {
        let p = cycle_partition();
        assert_eq!(Contiguous.check(&p).unwrap(), ConstraintResult::Pass);
    }

    #[test]
    fn middle_node_flip_disconnects_old_part() {
        // Flipping node 1 leaves {0, 2}, which the cycle cannot connect
        // without going through 1.
        let p = cycle_partition();
        let child = p.flip(Flip::from([(1, 1)])).unwrap();
        assert!(matches!(
            SingleFlipContiguous.check(&child).unwrap(),
            ConstraintResult::Fail(_)
        ));
        assert!(matches!(Contiguous.check(&child).unwrap(), ConstraintResult::Fail(_)));
    }

    #[test]
    fn articulation_node_flip_fails_the_local_bfs() {
        // 0 - 1 - 2 with 1 also adjacent to 3; removing 1 from part 0
        // strands 0 and 2 even though 1 borders its new part.
        let ids = (0..4).map(|i| i.to_string()).collect();
        let graph = Graph::from_adjacency(
            ids, &[(0, 1), (1, 2), (1, 3)], AttributeTable::new(4), AttributeTable::new(3),
        ).unwrap();
        let assignment = Assignment::from_vec(vec![0, 0, 0, 1]).unwrap();
        let p = Arc::new(Partition::new(graph, assignment, UpdaterRegistry::with_defaults()).unwrap());
        let child = p.flip(Flip::from([(1, 1)])).unwrap();
        match SingleFlipContiguous.check(&child).unwrap() {
            ConstraintResult::Fail(reason) => assert!(reason.contains("disconnects")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn boundary_node_flip_passes() {
        let p = cycle_partition();
        let child = p.flip(Flip::from([(2, 1)])).unwrap();
        assert_eq!(SingleFlipContiguous.check(&child).unwrap(), ConstraintResult::Pass);
        assert_eq!(Contiguous.check(&child).unwrap(), ConstraintResult::Pass);
    }

    #[test]
    fn flip_without_new_part_neighbor_fails() {
        let p = cycle_partition();
        // Node 0 borders part 1 via node 5; flipping node 1 into part 1
        // is the disconnection case, flipping node 0 is fine.
        let child = p.flip(Flip::from([(0, 1)])).unwrap();
        assert_eq!(SingleFlipContiguous.check(&child).unwrap(), ConstraintResult::Pass);
    }

    #[test]
    fn multi_node_flip_is_indeterminate() {
        let p = cycle_partition();
        let child = p.flip(Flip::from([(2, 1), (5, 0)])).unwrap();
        assert_eq!(
            SingleFlipContiguous.check(&child).unwrap(),
            ConstraintResult::Indeterminate
        );
        // The full fallback decides.
        assert_eq!(SingleFlipContiguous.check_full(&child).unwrap(), ConstraintResult::Pass);
    }

    #[test]
    fn initial_partition_is_indeterminate_for_fast_path() {
        let p = cycle_partition();
        assert_eq!(
            SingleFlipContiguous.check(&p).unwrap(),
            ConstraintResult::Indeterminate
        );
    }

    #[test]
    fn island_in_a_multi_node_part_fails() {
        let ids = (0..3).map(|i| i.to_string()).collect();
        let graph = Graph::from_adjacency(
            ids, &[(0, 1)], AttributeTable::new(3), AttributeTable::new(1),
        ).unwrap();
        // Node 2 is an island grouped with node 1.
        let assignment = Assignment::from_vec(vec![0, 1, 1]).unwrap();
        let p = Partition::new(graph, assignment, UpdaterRegistry::with_defaults()).unwrap();
        assert!(matches!(Contiguous.check(&p).unwrap(), ConstraintResult::Fail(_)));
    }

    #[test]
    fn singleton_island_part_passes() {
        let ids = (0..3).map(|i| i.to_string()).collect();
        let graph = Graph::from_adjacency(
            ids, &[(0, 1)], AttributeTable::new(3), AttributeTable::new(1),
        ).unwrap();
        let assignment = Assignment::from_vec(vec![0, 0, 1]).unwrap();
        let p = Partition::new(graph, assignment, UpdaterRegistry::with_defaults()).unwrap();
        assert_eq!(Contiguous.check(&p).unwrap(), ConstraintResult::Pass);
    }
}
