use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::Result;
use crate::graph::edge;
use crate::partition::Partition;
use crate::tree::uniform_spanning_tree;
use crate::updaters::{Updater, UpdaterValue};

/// Draws one uniform spanning tree per part, cached on the partition.
///
/// Updaters have no access to the chain's RNG, so the draw is seeded
/// deterministically from the part's member set; identical parts yield
/// identical trees across runs.
#[derive(Clone, Debug)]
pub struct SpanningTrees {
    alias: String,
}

impl SpanningTrees {
    pub fn new(alias: impl Into<String>) -> Self {
        Self { alias: alias.into() }
    }
}

impl Default for SpanningTrees {
    fn default() -> Self { Self::new("spanning_trees") }
}

impl Updater for SpanningTrees {
    fn name(&self) -> &str { &self.alias }

    fn recompute(&self, partition: &Partition) -> Result<UpdaterValue> {
        let mut trees = BTreeMap::new();
        for p in partition.parts() {
            // FNV-1a over the part id and sorted members.
            let mut seed = 0xcbf29ce484222325u64;
            let mut mix = |x: u64| {
                seed ^= x;
                seed = seed.wrapping_mul(0x100000001b3);
            };
            mix(p as u64);
            for &v in partition.members(p) {
                mix(v as u64);
            }

            let sub = partition.part_subgraph(p);
            let mut rng = StdRng::seed_from_u64(seed);
            let tree = uniform_spanning_tree(&sub, &mut rng)?;
            let mut edges = tree.order().iter()
                .filter(|&&u| u != tree.root())
                .map(|&u| edge(sub.parent_id(u), sub.parent_id(tree.parent(u))))
                .collect::<Vec<_>>();
            edges.sort_unstable();
            trees.insert(p, edges);
        }
        Ok(UpdaterValue::TreesByPart(trees))
    }
}
