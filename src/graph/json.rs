use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::{ChainError, Result};
use crate::graph::{AttrColumn, AttrValue, AttributeTable, Graph};

/// NetworkX-style `adjacency_data` document, the mandated interchange
/// format: node list with typed attributes plus a parallel adjacency list
/// of `{ "id": neighbor, <edge attrs> }` entries.
#[derive(Debug, Serialize, Deserialize)]
struct AdjacencyDoc {
    directed: bool,
    multigraph: bool,
    #[serde(default)]
    graph: Map<String, Value>,
    nodes: Vec<Map<String, Value>>,
    adjacency: Vec<Vec<Map<String, Value>>>,
}

impl Graph {
    /// Parse a graph from adjacency JSON.
    ///
    /// Node entries carry an `id` (integer or string) and any number of
    /// typed attributes; `geometry` entries are ignored (polygon handling
    /// is an external concern). Each undirected edge must appear in the
    /// adjacency rows of both endpoints.
    pub fn from_json_str(s: &str) -> Result<Self> {
        parse_json(s).map_err(|e| ChainError::InvalidGraph(format!("{e:#}")))
    }

    /// Serialize the graph back to adjacency JSON.
    pub fn to_json_string(&self) -> Result<String> {
        let doc = build_doc(self).map_err(|e| ChainError::InvalidGraph(format!("{e:#}")))?;
        serde_json::to_string(&doc).map_err(|e| ChainError::InvalidGraph(e.to_string()))
    }
}

fn parse_json(s: &str) -> anyhow::Result<Graph> {
    let doc: AdjacencyDoc = serde_json::from_str(s).context("parsing adjacency json")?;
    if doc.directed {
        bail!("directed graphs are not supported");
    }
    if doc.multigraph {
        bail!("multigraphs are not supported");
    }
    if doc.adjacency.len() != doc.nodes.len() {
        bail!("adjacency has {} rows for {} nodes", doc.adjacency.len(), doc.nodes.len());
    }

    let n = doc.nodes.len();
    let mut external_ids = Vec::with_capacity(n);
    for (i, entry) in doc.nodes.iter().enumerate() {
        let id = entry.get("id").with_context(|| format!("node {i} has no id"))?;
        external_ids.push(id_to_string(id)?);
    }

    // Node id lookup for resolving adjacency targets.
    let index = external_ids.iter().enumerate()
        .map(|(i, id)| (id.clone(), i))
        .collect::<std::collections::HashMap<_, _>>();
    if index.len() != n {
        bail!("duplicate node ids");
    }

    let node_attrs = columns_from_maps(&doc.nodes, &["id", "geometry"], n)
        .context("building node attribute table")?;

    // Each undirected edge appears in both endpoint rows; keep the
    // occurrence listed under its smaller endpoint.
    let mut edges = Vec::new();
    let mut edge_entries = Vec::new();
    for (u, row) in doc.adjacency.iter().enumerate() {
        for entry in row {
            let id = entry.get("id").with_context(|| format!("adjacency row {u} entry has no id"))?;
            let target = id_to_string(id)?;
            let &v = index.get(&target)
                .with_context(|| format!("adjacency row {u} references unknown node '{target}'"))?;
            if u < v {
                edges.push((u, v));
                edge_entries.push(entry.clone());
            }
        }
    }

    // Re-order edge attribute rows to the normalized sorted edge order.
    let mut order = (0..edges.len()).collect::<Vec<_>>();
    order.sort_unstable_by_key(|&i| edges[i]);
    let sorted_entries = order.iter().map(|&i| edge_entries[i].clone()).collect::<Vec<_>>();
    let edge_attrs = columns_from_maps(&sorted_entries, &["id"], edges.len())
        .context("building edge attribute table")?;

    Ok(Graph::from_adjacency(external_ids, &edges, node_attrs, edge_attrs)?)
}

fn id_to_string(v: &Value) -> anyhow::Result<String> {
    match v {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => bail!("unsupported id {other}"),
    }
}

/// Collect the non-reserved keys of a list of JSON maps into typed
/// columns. Every key must be present on every entry with a consistent
/// type; integer columns are promoted to float when mixed with floats.
fn columns_from_maps(
    maps: &[Map<String, Value>],
    reserved: &[&str],
    len: usize,
) -> anyhow::Result<AttributeTable> {
    let mut table = AttributeTable::new(len);
    let Some(first) = maps.first() else { return Ok(table) };

    let keys = first.keys()
        .filter(|k| !reserved.contains(&k.as_str()))
        .cloned()
        .collect::<Vec<_>>();

    for key in keys {
        let mut values = Vec::with_capacity(len);
        for (i, map) in maps.iter().enumerate() {
            let v = map.get(&key).with_context(|| format!("entry {i} missing attribute '{key}'"))?;
            values.push(attr_value(v).with_context(|| format!("attribute '{key}' on entry {i}"))?);
        }
        table.insert(key, column_from_values(values)?)?;
    }
    Ok(table)
}

fn attr_value(v: &Value) -> anyhow::Result<AttrValue> {
    match v {
        Value::Bool(b) => Ok(AttrValue::Bool(*b)),
        Value::String(s) => Ok(AttrValue::Str(s.clone())),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(AttrValue::Int(i)),
            None => Ok(AttrValue::Float(n.as_f64().context("non-finite number")?)),
        },
        other => bail!("unsupported attribute value {other}"),
    }
}

fn column_from_values(values: Vec<AttrValue>) -> anyhow::Result<AttrColumn> {
    let promote = values.iter().any(|v| matches!(v, AttrValue::Float(_)));
    match values.first() {
        None => Ok(AttrColumn::Int(vec![])),
        Some(AttrValue::Int(_) | AttrValue::Float(_)) if promote => {
            values.into_iter()
                .map(|v| v.as_f64().context("mixed numeric and non-numeric column"))
                .collect::<anyhow::Result<Vec<_>>>()
                .map(AttrColumn::Float)
        }
        Some(AttrValue::Int(_)) => values.into_iter()
            .map(|v| match v { AttrValue::Int(i) => Ok(i), other => bail!("expected integer, got {other:?}") })
            .collect::<anyhow::Result<Vec<_>>>()
            .map(AttrColumn::Int),
        Some(AttrValue::Str(_)) => values.into_iter()
            .map(|v| match v { AttrValue::Str(s) => Ok(s), other => bail!("expected string, got {other:?}") })
            .collect::<anyhow::Result<Vec<_>>>()
            .map(AttrColumn::Str),
        Some(AttrValue::Bool(_)) => values.into_iter()
            .map(|v| match v { AttrValue::Bool(b) => Ok(b), other => bail!("expected bool, got {other:?}") })
            .collect::<anyhow::Result<Vec<_>>>()
            .map(AttrColumn::Bool),
        Some(AttrValue::Float(_)) => unreachable!("float columns always take the promote arm"),
    }
}

fn json_value(v: AttrValue) -> anyhow::Result<Value> {
    Ok(match v {
        AttrValue::Int(i) => Value::Number(i.into()),
        AttrValue::Float(f) => Value::Number(Number::from_f64(f).context("non-finite float")?),
        AttrValue::Str(s) => Value::String(s),
        AttrValue::Bool(b) => Value::Bool(b),
    })
}

fn build_doc(graph: &Graph) -> anyhow::Result<AdjacencyDoc> {
    let n = graph.node_count();
    let mut nodes = Vec::with_capacity(n);
    for v in 0..n {
        let mut map = Map::new();
        map.insert("id".to_string(), Value::String(graph.external_id(v).to_string()));
        for name in graph.node_attrs().names() {
            let value = graph.node_attrs().get(name, v).unwrap();
            map.insert(name.to_string(), json_value(value)?);
        }
        nodes.push(map);
    }

    let mut adjacency = vec![Vec::new(); n];
    for v in 0..n {
        for (u, id) in graph.incident_edges(v) {
            let mut map = Map::new();
            map.insert("id".to_string(), Value::String(graph.external_id(u).to_string()));
            for name in graph.edge_attrs().names() {
                let value = graph.edge_attrs().get(name, id).unwrap();
                map.insert(name.to_string(), json_value(value)?);
            }
            adjacency[v].push(map);
        }
    }

    Ok(AdjacencyDoc {
        directed: false,
        multigraph: false,
        graph: Map::new(),
        nodes,
        adjacency,
    })
}
