use std::sync::Arc;

use crate::constraints::{LowerBound, ScoreFn, SelfConfiguringLowerBound, SelfConfiguringUpperBound, UpperBound};
use crate::error::Result;
use crate::partition::Partition;
use crate::updaters::polsby_popper;

/// Sum of reciprocal Polsby-Popper scores; lower is more compact.
pub fn l1_reciprocal_polsby_popper(partition: &Partition) -> Result<f64> {
    Ok(polsby_popper(partition)?.values().map(|s| 1.0 / s).sum())
}

/// Sum of Polsby-Popper scores; higher is more compact.
pub fn l1_polsby_popper(partition: &Partition) -> Result<f64> {
    Ok(polsby_popper(partition)?.values().sum())
}

/// Harmonic-mean style Polsby-Popper reduction; higher is more compact.
pub fn l_minus_1_polsby_popper(partition: &Partition) -> Result<f64> {
    let scores = polsby_popper(partition)?;
    let reciprocal_sum = scores.values().map(|s| 1.0 / s).sum::<f64>();
    Ok(scores.len() as f64 / reciprocal_sum)
}

/// Number of cut edges, as a compactness proxy that needs no geometry.
pub fn cut_edge_count(partition: &Partition) -> Result<f64> {
    Ok(partition.cut_edges()?.len() as f64)
}

/// Never-degrade compactness bound: reciprocal Polsby-Popper may not rise
/// above its value on the starting partition.
pub fn no_worse_l1_reciprocal_polsby_popper(initial: &Partition) -> Result<UpperBound> {
    let score: ScoreFn = Arc::new(l1_reciprocal_polsby_popper);
    SelfConfiguringUpperBound::new("no_worse_l1_reciprocal_polsby_popper", score, initial)
}

/// Never-degrade compactness bound on the harmonic-mean reduction.
pub fn no_worse_l_minus_1_polsby_popper(initial: &Partition) -> Result<LowerBound> {
    let score: ScoreFn = Arc::new(l_minus_1_polsby_popper);
    SelfConfiguringLowerBound::new("no_worse_l_minus_1_polsby_popper", score, initial, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::Constraint;
    use crate::graph::{AttrColumn, AttributeTable, Graph};
    use crate::partition::Assignment;

    fn geo_partition() -> Partition {
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
        Partition::new_geographic(graph, assignment, Default::default()).unwrap()
    }

    #[test]
    fn reductions_are_consistent() {
        let p = geo_partition();
        let l1 = l1_polsby_popper(&p).unwrap();
        let rec = l1_reciprocal_polsby_popper(&p).unwrap();
        let lm1 = l_minus_1_polsby_popper(&p).unwrap();
        assert!(l1 > 0.0 && rec > 0.0);
        // Both parts have equal scores, so L1 and harmonic agree up to n.
        assert!((lm1 - l1 / 2.0).abs() < 1e-12);
        assert_eq!(cut_edge_count(&p).unwrap(), 2.0);
    }

    #[test]
    fn never_degrade_bounds_pass_initially() {
        let p = geo_partition();
        let upper = no_worse_l1_reciprocal_polsby_popper(&p).unwrap();
        let lower = no_worse_l_minus_1_polsby_popper(&p).unwrap();
        assert!(matches!(upper.check(&p).unwrap(), crate::constraints::ConstraintResult::Pass));
        assert!(matches!(lower.check(&p).unwrap(), crate::constraints::ConstraintResult::Pass));
    }
}
