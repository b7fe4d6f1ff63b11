use rand::Rng;

use crate::error::{ChainError, Result};
use crate::graph::{Graph, NodeId};
use crate::partition::PartId;
use crate::tree::{bipartition_tree, BipartitionSpec, WarningSink};

/// Produce a balanced initial assignment by repeated tree bipartition:
/// carve one ideal-population district off the remaining pool with a
/// one-sided cut, push the remainder back, and finish with a two-sided
/// bisection once two districts remain. Parts are labeled `0..n_parts`.
pub fn recursive_seed_part(
    graph: &Graph,
    n_parts: u32,
    pop_col: &str,
    epsilon: f64,
    rng: &mut impl Rng,
) -> Result<Vec<PartId>> {
    assert!(n_parts > 0, "n_parts must be at least 1");

    let n = graph.node_count();
    let total = (0..n).map(|v| graph.node_int(v, pop_col)).sum::<Result<i64>>()?;
    let ideal = total as f64 / n_parts as f64;

    let mut part_of = vec![0 as PartId; n];
    let mut pool = (0..n).collect::<Vec<NodeId>>();
    let sink = WarningSink::new();

    for part in 0..n_parts {
        let remaining = n_parts - part;
        if remaining == 1 {
            for &v in &pool {
                part_of[v] = part;
            }
            break;
        }

        let sub = graph.subgraph(pool.iter().copied());
        let mut spec = BipartitionSpec::new(pop_col, ideal, epsilon);
        spec.one_sided = remaining > 2;
        let district = bipartition_tree(&sub, &spec, &sink, rng)?;

        for &v in &district {
            part_of[v] = part;
        }
        pool.retain(|v| !district.contains(v));

        if remaining == 2 {
            for &v in &pool {
                part_of[v] = part + 1;
            }
            break;
        }
        if pool.is_empty() {
            return Err(ChainError::SeedFailure { attempts: 1 });
        }
    }

    Ok(part_of)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{AttrColumn, AttributeTable};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn grid_with_unit_pops(width: usize, height: usize) -> Graph {
        let n = width * height;
        let ids = (0..n).map(|i| i.to_string()).collect();
        let mut edges = Vec::new();
        for y in 0..height {
            for x in 0..width {
                let v = y * width + x;
                if x + 1 < width { edges.push((v, v + 1)) }
                if y + 1 < height { edges.push((v, v + width)) }
            }
        }
        let mut node_attrs = AttributeTable::new(n);
        node_attrs.insert("pop", AttrColumn::Int(vec![1; n])).unwrap();
        let m = edges.len();
        Graph::from_adjacency(ids, &edges, node_attrs, AttributeTable::new(m)).unwrap()
    }

    fn part_pops(graph: &Graph, part_of: &[PartId], n_parts: u32) -> Vec<i64> {
        (0..n_parts)
            .map(|p| {
                part_of.iter().enumerate()
                    .filter(|&(_, &q)| q == p)
                    .map(|(v, _)| graph.node_int(v, "pop").unwrap())
                    .sum()
            })
            .collect()
    }

    #[test]
    fn seeds_four_balanced_parts() {
        let g = grid_with_unit_pops(6, 6);
        let mut rng = StdRng::seed_from_u64(2024);
        let part_of = recursive_seed_part(&g, 4, "pop", 0.2, &mut rng).unwrap();
        let pops = part_pops(&g, &part_of, 4);
        for pop in pops {
            assert!((8..=10).contains(&pop), "part population {pop} outside window");
        }
        // Every part is connected.
        for p in 0..4 {
            let members = part_of.iter().enumerate()
                .filter(|&(_, &q)| q == p)
                .map(|(v, _)| v);
            assert!(g.subgraph(members).is_connected());
        }
    }

    #[test]
    fn single_part_takes_everything() {
        let g = grid_with_unit_pops(3, 3);
        let mut rng = StdRng::seed_from_u64(1);
        let part_of = recursive_seed_part(&g, 1, "pop", 0.1, &mut rng).unwrap();
        assert!(part_of.iter().all(|&p| p == 0));
    }

    #[test]
    fn disconnected_graph_cannot_seed() {
        let ids = (0..4).map(|i| i.to_string()).collect::<Vec<_>>();
        let mut node_attrs = AttributeTable::new(4);
        node_attrs.insert("pop", AttrColumn::Int(vec![1; 4])).unwrap();
        let g = Graph::from_adjacency(ids, &[(0, 1), (2, 3)], node_attrs, AttributeTable::new(2)).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        assert!(recursive_seed_part(&g, 2, "pop", 0.1, &mut rng).is_err());
    }
}
