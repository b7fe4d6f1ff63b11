use std::collections::{BTreeMap, BTreeSet};

use crate::error::{ChainError, Result};
use crate::graph::{AttrValue, Graph, NodeId};
use crate::partition::{Flip, PartId, Partition};
use crate::updaters::{Updater, UpdaterValue};

/// Split status of one county within a partition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CountySplitStatus {
    /// All of the county's nodes share one part.
    NotSplit,
    /// Split now, but was not split in the parent partition.
    NewSplit,
    /// Split now and already split in the parent (or initial) partition.
    OldSplit,
}

/// County bookkeeping: its nodes and the parts it currently intersects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CountyInfo {
    pub status: CountySplitStatus,
    pub nodes: Vec<NodeId>,
    pub parts: BTreeSet<PartId>,
}

/// For each value of a county attribute, tracks the set of parts the
/// county intersects and whether a flip newly split it.
///
/// Diff path: only counties containing a flipped node can change, so the
/// parent's map is patched county by county.
#[derive(Clone, Debug)]
pub struct CountySplits {
    alias: String,
    county_col: String,
}

impl CountySplits {
    pub fn new(alias: impl Into<String>, county_col: impl Into<String>) -> Self {
        Self { alias: alias.into(), county_col: county_col.into() }
    }

    fn county_key(&self, graph: &Graph, v: NodeId) -> Result<String> {
        match graph.node_attr(v, &self.county_col)? {
            AttrValue::Str(s) => Ok(s),
            AttrValue::Int(i) => Ok(i.to_string()),
            _ => Err(ChainError::MissingAttribute(self.county_col.clone())),
        }
    }
}

impl Updater for CountySplits {
    fn name(&self) -> &str { &self.alias }

    fn recompute(&self, partition: &Partition) -> Result<UpdaterValue> {
        let graph = partition.graph();
        let mut counties: BTreeMap<String, CountyInfo> = BTreeMap::new();
        for v in 0..graph.node_count() {
            let key = self.county_key(graph, v)?;
            let info = counties.entry(key).or_insert_with(|| CountyInfo {
                status: CountySplitStatus::NotSplit,
                nodes: Vec::new(),
                parts: BTreeSet::new(),
            });
            info.nodes.push(v);
            info.parts.insert(partition.part_of(v));
        }
        for info in counties.values_mut() {
            if info.parts.len() > 1 {
                info.status = CountySplitStatus::OldSplit;
            }
        }
        Ok(UpdaterValue::Counties(counties))
    }

    fn update_from_parent(
        &self,
        parent_value: &UpdaterValue,
        partition: &Partition,
        flips: &Flip,
    ) -> Result<UpdaterValue> {
        let Some(old) = parent_value.counties() else { return self.recompute(partition) };

        let graph = partition.graph();
        let mut touched = BTreeSet::new();
        for &v in flips.keys() {
            touched.insert(self.county_key(graph, v)?);
        }

        let mut counties = old.clone();
        for key in touched {
            let Some(info) = counties.get_mut(&key) else { continue };
            info.parts = info.nodes.iter().map(|&v| partition.part_of(v)).collect();
            info.status = if info.parts.len() > 1 {
                match info.status {
                    CountySplitStatus::OldSplit => CountySplitStatus::OldSplit,
                    _ => CountySplitStatus::NewSplit,
                }
            } else {
                CountySplitStatus::NotSplit
            };
        }
        Ok(UpdaterValue::Counties(counties))
    }
}
