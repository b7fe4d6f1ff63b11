use std::collections::VecDeque;

use crate::error::Result;
use crate::graph::{Graph, NodeId};

const ABSENT: u32 = u32::MAX;

/// An induced-subgraph view: a node subset of a parent graph with local,
/// contiguous ids. Attributes stay on the parent; every result that leaves
/// this view is translated back into parent node ids.
#[derive(Debug)]
pub struct Subgraph<'a> {
    graph: &'a Graph,
    nodes: Vec<NodeId>, // sorted; local id -> parent id
    local: Vec<u32>,    // parent id -> local id, ABSENT outside the view
}

impl<'a> Subgraph<'a> {
    pub(crate) fn new(graph: &'a Graph, members: impl IntoIterator<Item = NodeId>) -> Self {
        let mut nodes = members.into_iter().collect::<Vec<_>>();
        nodes.sort_unstable();
        nodes.dedup();
        assert!(nodes.last().is_none_or(|&v| v < graph.node_count()), "member out of range");

        let mut local = vec![ABSENT; graph.node_count()];
        for (i, &v) in nodes.iter().enumerate() {
            local[v] = i as u32;
        }
        Self { graph, nodes, local }
    }

    /// Number of nodes in the view.
    #[inline] pub fn len(&self) -> usize { self.nodes.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.nodes.is_empty() }

    /// The parent graph.
    #[inline] pub fn graph(&self) -> &'a Graph { self.graph }

    /// Parent id of a local node.
    #[inline] pub fn parent_id(&self, local: usize) -> NodeId { self.nodes[local] }

    /// Local id of a parent node, or `None` if outside the view.
    #[inline]
    pub fn local_id(&self, node: NodeId) -> Option<usize> {
        match self.local[node] {
            ABSENT => None,
            i => Some(i as usize),
        }
    }

    /// Sorted members of the view, as parent ids.
    #[inline] pub fn members(&self) -> &[NodeId] { &self.nodes }

    /// Sorted iterator over local neighbors of a local node.
    pub fn neighbors(&self, local: usize) -> impl Iterator<Item = usize> + '_ {
        self.graph
            .neighbors(self.nodes[local])
            .filter_map(move |v| self.local_id(v))
    }

    /// Induced edges as local `(u, v)` pairs with `u < v`, in
    /// deterministic sorted order.
    pub fn edges(&self) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        for u in 0..self.len() {
            for v in self.neighbors(u) {
                if u < v { out.push((u, v)) }
            }
        }
        out
    }

    /// Per-local-node integer attribute column (population lookups).
    pub fn node_ints(&self, name: &str) -> Result<Vec<i64>> {
        self.nodes.iter().map(|&v| self.graph.node_int(v, name)).collect()
    }

    /// Connected components of the view, as sets of parent node ids.
    /// Each component is sorted ascending; components are ordered by their
    /// smallest element.
    pub fn connected_components(&self) -> Vec<Vec<NodeId>> {
        let mut components = Vec::new();
        let mut visited = vec![false; self.len()];

        for start in 0..self.len() {
            if visited[start] { continue }
            visited[start] = true;
            let mut component = vec![start];
            let mut queue = VecDeque::from([start]);
            while let Some(u) = queue.pop_front() {
                for v in self.neighbors(u) {
                    if !visited[v] {
                        visited[v] = true;
                        component.push(v);
                        queue.push_back(v);
                    }
                }
            }
            let mut component = component.into_iter().map(|u| self.nodes[u]).collect::<Vec<_>>();
            component.sort_unstable();
            components.push(component);
        }
        components
    }

    /// Whether the view induces a connected subgraph.
    pub fn is_connected(&self) -> bool {
        if self.len() <= 1 { return true }

        let mut seen = 1usize;
        let mut visited = vec![false; self.len()];
        visited[0] = true;
        let mut queue = VecDeque::from([0usize]);
        while let Some(u) = queue.pop_front() {
            for v in self.neighbors(u) {
                if !visited[v] {
                    visited[v] = true;
                    seen += 1;
                    queue.push_back(v);
                }
            }
        }
        seen == self.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::AttributeTable;

    fn cycle_graph(n: usize) -> Graph {
        let ids = (0..n).map(|i| i.to_string()).collect();
        let edges = (0..n).map(|i| (i, (i + 1) % n)).collect::<Vec<_>>();
        Graph::from_adjacency(ids, &edges, AttributeTable::new(n), AttributeTable::new(n)).unwrap()
    }

    #[test]
    fn local_ids_are_contiguous_and_sorted() {
        let g = cycle_graph(6);
        let sub = g.subgraph([5, 1, 3]);
        assert_eq!(sub.members(), &[1, 3, 5]);
        assert_eq!(sub.local_id(3), Some(1));
        assert_eq!(sub.local_id(0), None);
        assert_eq!(sub.parent_id(2), 5);
    }

    #[test]
    fn induced_edges_only() {
        let g = cycle_graph(6);
        // 0-1-2 is a path inside the cycle; 0-5 and 2-3 leave the view.
        let sub = g.subgraph([0, 1, 2]);
        assert_eq!(sub.edges(), vec![(0, 1), (1, 2)]);
    }

    #[test]
    fn components_deterministic_order() {
        let g = cycle_graph(6);
        let sub = g.subgraph([0, 1, 3, 4]);
        assert_eq!(sub.connected_components(), vec![vec![0, 1], vec![3, 4]]);
        assert!(!sub.is_connected());
        assert!(g.subgraph([3, 4, 5]).is_connected());
    }

    #[test]
    fn singleton_is_connected() {
        let g = cycle_graph(4);
        assert!(g.subgraph([2]).is_connected());
    }
}
