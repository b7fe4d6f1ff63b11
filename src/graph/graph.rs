use crate::error::{ChainError, Result};
use crate::graph::{AttrValue, AttributeTable, Subgraph};

/// Internal node index, contiguous in `0..node_count`.
pub type NodeId = usize;

/// An undirected edge, normalized so the smaller endpoint comes first.
pub type Edge = (NodeId, NodeId);

/// Normalize an edge so the smaller endpoint comes first.
#[inline]
pub fn edge(u: NodeId, v: NodeId) -> Edge {
    if u < v { (u, v) } else { (v, u) }
}

/// A frozen, undirected, simple graph in compressed sparse row format,
/// carrying typed attribute tables for nodes and edges.
///
/// Neighbor lists are sorted ascending, node ids are contiguous internally,
/// and an external string id table is kept for serialization. Once
/// constructed, neither topology nor attributes mutate.
#[derive(Debug, Clone)]
pub struct Graph {
    external_ids: Vec<String>,
    offsets: Vec<u32>,
    neighbors: Vec<u32>,
    edge_ids: Vec<u32>,       // edge id for each CSR slot
    edge_list: Vec<(u32, u32)>, // normalized, sorted lexicographically
    node_attrs: AttributeTable,
    edge_attrs: AttributeTable,
}

impl Graph {
    /// Build a frozen graph from an externally-produced adjacency table.
    ///
    /// `edges` lists each undirected edge once, in any orientation. Fails
    /// with `InvalidGraph` on unknown endpoints, self-loops, or duplicate
    /// edges. `edge_attrs` rows must follow the normalized, sorted edge
    /// order (the same order `edges()` iterates in).
    pub fn from_adjacency(
        external_ids: Vec<String>,
        edges: &[(NodeId, NodeId)],
        node_attrs: AttributeTable,
        edge_attrs: AttributeTable,
    ) -> Result<Self> {
        let n = external_ids.len();
        if node_attrs.len() != n {
            return Err(ChainError::InvalidGraph(format!(
                "node attribute table has {} rows for {} nodes", node_attrs.len(), n
            )));
        }

        let mut edge_list = Vec::with_capacity(edges.len());
        for &(u, v) in edges {
            if u >= n || v >= n {
                return Err(ChainError::InvalidGraph(format!(
                    "edge ({u}, {v}) refers to an unknown node"
                )));
            }
            if u == v {
                return Err(ChainError::InvalidGraph(format!("self-loop at node {u}")));
            }
            let (a, b) = edge(u, v);
            edge_list.push((a as u32, b as u32));
        }
        edge_list.sort_unstable();
        if edge_list.windows(2).any(|w| w[0] == w[1]) {
            return Err(ChainError::InvalidGraph("duplicate edge".to_string()));
        }
        if edge_attrs.len() != edge_list.len() {
            return Err(ChainError::InvalidGraph(format!(
                "edge attribute table has {} rows for {} edges", edge_attrs.len(), edge_list.len()
            )));
        }

        // CSR over both directions, neighbor lists sorted ascending.
        let mut degree = vec![0u32; n];
        for &(u, v) in &edge_list {
            degree[u as usize] += 1;
            degree[v as usize] += 1;
        }
        let mut offsets = Vec::with_capacity(n + 1);
        offsets.push(0u32);
        for d in &degree {
            offsets.push(offsets.last().unwrap() + d);
        }

        let total = *offsets.last().unwrap() as usize;
        let mut neighbors = vec![0u32; total];
        let mut edge_ids = vec![0u32; total];
        let mut cursor = offsets[..n].to_vec();
        for (id, &(u, v)) in edge_list.iter().enumerate() {
            for (from, to) in [(u, v), (v, u)] {
                let slot = cursor[from as usize] as usize;
                neighbors[slot] = to;
                edge_ids[slot] = id as u32;
                cursor[from as usize] += 1;
            }
        }
        // Each row gets its neighbors in edge-list order; sort per row so
        // the sorted-neighbor contract holds for both endpoints.
        for v in 0..n {
            let range = offsets[v] as usize..offsets[v + 1] as usize;
            let mut row = neighbors[range.clone()].iter().copied()
                .zip(edge_ids[range.clone()].iter().copied())
                .collect::<Vec<_>>();
            row.sort_unstable();
            for (i, (nb, eid)) in row.into_iter().enumerate() {
                neighbors[range.start + i] = nb;
                edge_ids[range.start + i] = eid;
            }
        }

        Ok(Self { external_ids, offsets, neighbors, edge_ids, edge_list, node_attrs, edge_attrs })
    }

    /// Get the number of nodes in the graph.
    #[inline] pub fn node_count(&self) -> usize { self.external_ids.len() }

    /// Get the number of undirected edges in the graph.
    #[inline] pub fn edge_count(&self) -> usize { self.edge_list.len() }

    /// Get the external (serialization) id of a node.
    #[inline] pub fn external_id(&self, v: NodeId) -> &str { &self.external_ids[v] }

    #[inline]
    fn range(&self, v: NodeId) -> std::ops::Range<usize> {
        self.offsets[v] as usize..self.offsets[v + 1] as usize
    }

    /// Get the degree of a node.
    #[inline] pub fn degree(&self, v: NodeId) -> usize { self.range(v).len() }

    /// Sorted iterator over the neighbors of a node.
    #[inline]
    pub fn neighbors(&self, v: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.range(v).map(move |i| self.neighbors[i] as usize)
    }

    /// Iterator over `(neighbor, edge id)` pairs of a node.
    #[inline]
    pub fn incident_edges(&self, v: NodeId) -> impl Iterator<Item = (NodeId, usize)> + '_ {
        self.range(v).map(move |i| (self.neighbors[i] as usize, self.edge_ids[i] as usize))
    }

    /// Iterator over all edges, normalized and sorted.
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.edge_list.iter().map(|&(u, v)| (u as usize, v as usize))
    }

    /// The endpoints of an edge id.
    #[inline]
    pub fn edge_endpoints(&self, id: usize) -> Edge {
        let (u, v) = self.edge_list[id];
        (u as usize, v as usize)
    }

    /// Look up the edge id of `(u, v)`, or `None` if not adjacent.
    pub fn edge_id(&self, u: NodeId, v: NodeId) -> Option<usize> {
        let (a, b) = edge(u, v);
        let range = self.range(a);
        let row = &self.neighbors[range.clone()];
        let i = row.binary_search(&(b as u32)).ok()?;
        Some(self.edge_ids[range.start + i] as usize)
    }

    /// Whether the graph contains any node of degree zero.
    pub fn has_islands(&self) -> bool {
        (0..self.node_count()).any(|v| self.degree(v) == 0)
    }

    /// The node attribute table.
    #[inline] pub fn node_attrs(&self) -> &AttributeTable { &self.node_attrs }

    /// The edge attribute table, indexed by edge id.
    #[inline] pub fn edge_attrs(&self) -> &AttributeTable { &self.edge_attrs }

    /// Typed node attribute lookup; fails with `UnknownNode` for an
    /// out-of-range id and `MissingAttribute` for an unknown column.
    pub fn node_attr(&self, v: NodeId, name: &str) -> Result<AttrValue> {
        if v >= self.node_count() { return Err(ChainError::UnknownNode(v)) }
        self.node_attrs.get(name, v).ok_or_else(|| ChainError::MissingAttribute(name.to_string()))
    }

    /// Typed edge attribute lookup for the edge `(u, v)`.
    pub fn edge_attr(&self, u: NodeId, v: NodeId, name: &str) -> Result<AttrValue> {
        if u >= self.node_count() { return Err(ChainError::UnknownNode(u)) }
        if v >= self.node_count() { return Err(ChainError::UnknownNode(v)) }
        let id = self.edge_id(u, v).ok_or_else(|| {
            ChainError::InvalidGraph(format!("no edge between {u} and {v}"))
        })?;
        self.edge_attrs.get(name, id).ok_or_else(|| ChainError::MissingAttribute(name.to_string()))
    }

    /// Integer node attribute (population columns).
    #[inline]
    pub fn node_int(&self, v: NodeId, name: &str) -> Result<i64> {
        self.node_attrs.int(name, v)
    }

    /// Numeric node attribute, coercing integers.
    #[inline]
    pub fn node_float(&self, v: NodeId, name: &str) -> Result<f64> {
        self.node_attrs.float(name, v)
    }

    /// Numeric edge attribute by edge, coercing integers.
    pub fn edge_float(&self, e: Edge, name: &str) -> Result<f64> {
        let id = self.edge_id(e.0, e.1).ok_or_else(|| {
            ChainError::InvalidGraph(format!("no edge between {} and {}", e.0, e.1))
        })?;
        self.edge_attrs.float(name, id)
    }

    /// Lightweight induced-subgraph view over a node subset.
    /// Attributes are not copied; local ids map back to graph ids.
    pub fn subgraph<'a>(&'a self, members: impl IntoIterator<Item = NodeId>) -> Subgraph<'a> {
        Subgraph::new(self, members)
    }
}
