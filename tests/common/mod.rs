// Shared graph builders for the end-to-end chain scenarios.
#![allow(dead_code)]

use manderchain::{AttrColumn, AttributeTable, Graph, NodeId};

/// A `width` x `height` grid with rook adjacency and the given node
/// populations.
pub fn grid_graph(width: usize, height: usize, pops: Vec<i64>) -> Graph {
    let n = width * height;
    assert_eq!(pops.len(), n);

    let mut edges = Vec::new();
    for y in 0..height {
        for x in 0..width {
            let v = y * width + x;
            if x + 1 < width { edges.push((v, v + 1)) }
            if y + 1 < height { edges.push((v, v + width)) }
        }
    }

    let mut node_attrs = AttributeTable::new(n);
    node_attrs.insert("pop", AttrColumn::Int(pops)).unwrap();
    let m = edges.len();
    Graph::from_adjacency(
        (0..n).map(|i| i.to_string()).collect(),
        &edges,
        node_attrs,
        AttributeTable::new(m),
    ).unwrap()
}

/// A path graph with the given node populations.
pub fn path_graph(pops: Vec<i64>) -> Graph {
    let n = pops.len();
    let edges = (0..n - 1).map(|i| (i, i + 1)).collect::<Vec<_>>();
    let mut node_attrs = AttributeTable::new(n);
    node_attrs.insert("pop", AttrColumn::Int(pops)).unwrap();
    Graph::from_adjacency(
        (0..n).map(|i| i.to_string()).collect(),
        &edges,
        node_attrs,
        AttributeTable::new(n - 1),
    ).unwrap()
}

/// Split a grid into a left part 0 and right part 1 at `split_col`.
pub fn split_by_column(width: usize, height: usize, split_col: usize) -> Vec<u32> {
    (0..width * height)
        .map(|v: NodeId| if v % width < split_col { 0 } else { 1 })
        .collect()
}
