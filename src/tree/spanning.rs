use std::collections::BTreeMap;

use rand::Rng;

use crate::error::{ChainError, Result};
use crate::graph::Subgraph;

/// Disjoint-set structure for Kruskal's algorithm, with path halving and
/// union by rank. Equal-rank ties root at the lower index so the merge
/// history is deterministic.
#[derive(Debug)]
struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self { parent: (0..n).collect(), rank: vec![0; n] }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            let grandparent = self.parent[self.parent[x]];
            self.parent[x] = grandparent;
            x = grandparent;
        }
        x
    }

    /// Merge the sets of `a` and `b`; false if already joined.
    fn union(&mut self, a: usize, b: usize) -> bool {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb { return false }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                let (root, child) = if ra < rb { (ra, rb) } else { (rb, ra) };
                self.parent[child] = root;
                self.rank[root] += 1;
            }
        }
        true
    }
}

/// A rooted spanning tree over a subgraph's local ids, laid out for cheap
/// cuts: `order` is a preorder walk, so every subtree is the contiguous
/// slice `order[index[u] .. index[u] + size[u]]`.
#[derive(Debug)]
pub struct SpanningTree {
    root: usize,
    parent: Vec<usize>, // parent[root] == root
    order: Vec<usize>,
    index: Vec<usize>,
    size: Vec<usize>,
}

impl SpanningTree {
    /// Orient `n - 1` undirected tree edges away from `root` and build the
    /// preorder layout.
    fn from_edges(n: usize, edges: &[(usize, usize)], root: usize) -> Self {
        debug_assert!(edges.len() + 1 == n, "expected a tree");

        let mut adjacency = vec![Vec::new(); n];
        for &(u, v) in edges {
            adjacency[u].push(v);
            adjacency[v].push(u);
        }
        for row in &mut adjacency {
            row.sort_unstable();
        }

        let mut parent = vec![usize::MAX; n];
        parent[root] = root;
        let mut children = vec![Vec::new(); n];
        let mut stack = vec![root];
        while let Some(u) = stack.pop() {
            for &v in &adjacency[u] {
                if parent[v] == usize::MAX {
                    parent[v] = u;
                    children[u].push(v);
                    stack.push(v);
                }
            }
        }

        // Preorder walk computing subtree sizes on exit.
        let mut order = Vec::with_capacity(n);
        let mut index = vec![0; n];
        let mut size = vec![0; n];
        let mut stack = vec![(root, false)];
        while let Some((u, entered)) = stack.pop() {
            if !entered {
                index[u] = order.len();
                order.push(u);
                stack.push((u, true));
                for &c in children[u].iter().rev() {
                    stack.push((c, false));
                }
            } else {
                size[u] = 1 + children[u].iter().map(|&c| size[c]).sum::<usize>();
            }
        }

        Self { root, parent, order, index, size }
    }

    /// Number of nodes in the tree.
    #[inline] pub fn len(&self) -> usize { self.order.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.order.is_empty() }

    /// The root node.
    #[inline] pub fn root(&self) -> usize { self.root }

    /// Parent of a node; the root is its own parent.
    #[inline] pub fn parent(&self, u: usize) -> usize { self.parent[u] }

    /// Preorder walk over the whole tree.
    #[inline] pub fn order(&self) -> &[usize] { &self.order }

    /// The subtree rooted at `u`, as a contiguous preorder slice.
    #[inline]
    pub fn subtree(&self, u: usize) -> &[usize] {
        &self.order[self.index[u]..self.index[u] + self.size[u]]
    }

    /// Subtree sums of `values` (indexed in preorder via prefix sums).
    pub fn subtree_sums(&self, values: &[i64]) -> Vec<i64> {
        let mut prefix = Vec::with_capacity(self.len() + 1);
        prefix.push(0);
        for &u in &self.order {
            prefix.push(prefix.last().unwrap() + values[u]);
        }
        (0..self.len())
            .map(|u| prefix[self.index[u] + self.size[u]] - prefix[self.index[u]])
            .collect()
    }
}

/// Draw a spanning tree by Kruskal's method over random edge weights,
/// surcharging edges that cross between different values of each region
/// attribute. With all surcharges zero this is the standard
/// random-weight spanning tree; surcharges push region-crossing edges out
/// of the tree so that balanced cuts tend to respect region lines.
pub fn random_spanning_tree(
    sub: &Subgraph<'_>,
    region_surcharge: &BTreeMap<String, f64>,
    rng: &mut impl Rng,
) -> Result<SpanningTree> {
    let n = sub.len();
    if n == 0 {
        return Err(ChainError::InvalidGraph("cannot span an empty subgraph".into()));
    }

    let mut weighted = Vec::new();
    for (u, v) in sub.edges() {
        let mut weight = rng.random::<f64>();
        for (region, surcharge) in region_surcharge {
            let a = sub.graph().node_attr(sub.parent_id(u), region)?;
            let b = sub.graph().node_attr(sub.parent_id(v), region)?;
            if a != b { weight += surcharge }
        }
        weighted.push((weight, u, v));
    }
    weighted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

    let mut forest = UnionFind::new(n);
    let mut tree_edges = Vec::with_capacity(n - 1);
    for (_, u, v) in weighted {
        if forest.union(u, v) {
            tree_edges.push((u, v));
            if tree_edges.len() == n - 1 { break }
        }
    }
    if tree_edges.len() + 1 != n {
        return Err(ChainError::InvalidGraph("subgraph is disconnected".into()));
    }

    let root = rng.random_range(0..n);
    Ok(SpanningTree::from_edges(n, &tree_edges, root))
}

/// Draw a spanning tree uniformly from the space of all spanning trees,
/// by Wilson's loop-erased random walks. Slower than the Kruskal draw;
/// opt-in for callers that need exact uniformity.
pub fn uniform_spanning_tree(sub: &Subgraph<'_>, rng: &mut impl Rng) -> Result<SpanningTree> {
    let n = sub.len();
    if n == 0 {
        return Err(ChainError::InvalidGraph("cannot span an empty subgraph".into()));
    }
    // A walk started outside the root's component would never terminate.
    if !sub.is_connected() {
        return Err(ChainError::InvalidGraph("subgraph is disconnected".into()));
    }

    let root = rng.random_range(0..n);
    let mut in_tree = vec![false; n];
    in_tree[root] = true;
    let mut next = vec![usize::MAX; n];

    for start in 0..n {
        if in_tree[start] { continue }

        // Random walk until the tree is hit; `next` keeps only the
        // loop-erased path because revisits overwrite earlier exits.
        let mut u = start;
        while !in_tree[u] {
            let neighbors = sub.neighbors(u).collect::<Vec<_>>();
            if neighbors.is_empty() {
                return Err(ChainError::InvalidGraph("subgraph is disconnected".into()));
            }
            next[u] = neighbors[rng.random_range(0..neighbors.len())];
            u = next[u];
        }

        let mut u = start;
        while !in_tree[u] {
            in_tree[u] = true;
            u = next[u];
        }
    }

    let tree_edges = (0..n)
        .filter(|&u| u != root && next[u] != usize::MAX && in_tree[u])
        .map(|u| (u, next[u]))
        .collect::<Vec<_>>();
    if tree_edges.len() + 1 != n {
        return Err(ChainError::InvalidGraph("subgraph is disconnected".into()));
    }
    Ok(SpanningTree::from_edges(n, &tree_edges, root))
}
