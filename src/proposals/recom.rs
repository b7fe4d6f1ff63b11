use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;

use crate::error::{ChainError, Result};
use crate::partition::{Flip, PartId, Partition};
use crate::proposals::Proposal;
use crate::tree::{bipartition_tree, BipartitionSpec, SpanningTreeMethod, WarningSink};

/// Recombination proposal: merge two adjacent districts, draw a spanning
/// tree on the merged subgraph, and cut one edge so that both sides land
/// within `epsilon` of the population target.
#[derive(Clone, Debug)]
pub struct ReCom {
    pop_col: String,
    pop_target: f64,
    epsilon: f64,
    node_repeats: usize,
    max_attempts: usize,
    region_surcharge: BTreeMap<String, f64>,
    method: SpanningTreeMethod,
    allow_pair_reselection: bool,
    warnings: WarningSink,
}

impl ReCom {
    pub fn new(pop_col: impl Into<String>, pop_target: f64, epsilon: f64) -> Self {
        Self {
            pop_col: pop_col.into(),
            pop_target,
            epsilon,
            node_repeats: 1,
            max_attempts: 10_000,
            region_surcharge: BTreeMap::new(),
            method: SpanningTreeMethod::RandomWeight,
            allow_pair_reselection: false,
            warnings: WarningSink::new(),
        }
    }

    /// How many roots to try per spanning tree before redrawing.
    pub fn with_node_repeats(mut self, node_repeats: usize) -> Self {
        self.node_repeats = node_repeats.max(1);
        self
    }

    /// Spanning-tree draw budget per district pair.
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Weight the spanning tree against cutting across these region
    /// attributes (region-aware ReCom).
    pub fn with_region_surcharge(mut self, surcharge: BTreeMap<String, f64>) -> Self {
        self.region_surcharge = surcharge;
        self
    }

    /// Use Wilson's algorithm instead of random-weight Kruskal.
    pub fn with_method(mut self, method: SpanningTreeMethod) -> Self {
        self.method = method;
        self
    }

    /// On a failed pair, draw a different adjacent pair instead of
    /// failing the proposal.
    pub fn with_pair_reselection(mut self, allow: bool) -> Self {
        self.allow_pair_reselection = allow;
        self
    }

    /// Route bipartition warnings into the given sink.
    pub fn with_warning_sink(mut self, warnings: WarningSink) -> Self {
        self.warnings = warnings;
        self
    }

    /// The warning sink, for counting after a run.
    pub fn warnings(&self) -> &WarningSink { &self.warnings }

    fn spec(&self) -> BipartitionSpec {
        let mut spec = BipartitionSpec::new(&self.pop_col, self.pop_target, self.epsilon);
        spec.node_repeats = self.node_repeats;
        spec.max_attempts = self.max_attempts;
        spec.region_surcharge = self.region_surcharge.clone();
        spec.method = self.method;
        spec.allow_pair_reselection = self.allow_pair_reselection;
        spec
    }

    /// Distinct adjacent part pairs, from the cut-edge set.
    fn adjacent_pairs(partition: &Partition) -> Result<Vec<(PartId, PartId)>> {
        let mut pairs = BTreeSet::new();
        for &e in partition.cut_edges()? {
            let (p, q) = (partition.part_of(e.0), partition.part_of(e.1));
            pairs.insert(if p < q { (p, q) } else { (q, p) });
        }
        Ok(pairs.into_iter().collect())
    }

    /// Orient the split so the fewest nodes change assignment.
    fn build_flip(
        partition: &Partition,
        p: PartId,
        q: PartId,
        side: &BTreeSet<usize>,
    ) -> Flip {
        let side_in_p = side.intersection(partition.members(p)).count();
        let side_in_q = side.intersection(partition.members(q)).count();
        let (side_part, other_part) = if side_in_p >= side_in_q { (p, q) } else { (q, p) };

        let mut flips = Flip::new();
        for &v in side {
            if partition.part_of(v) != side_part {
                flips.insert(v, side_part);
            }
        }
        for &v in partition.members(p).iter().chain(partition.members(q)) {
            if !side.contains(&v) && partition.part_of(v) != other_part {
                flips.insert(v, other_part);
            }
        }
        flips
    }
}

impl Proposal for ReCom {
    fn propose(&self, current: &Arc<Partition>, rng: &mut StdRng) -> Result<Partition> {
        let mut pairs = Self::adjacent_pairs(current)?;
        if pairs.is_empty() {
            return Err(ChainError::BipartitionFailure { attempts: 0 });
        }

        let total_pairs = pairs.len();
        let spec = self.spec();
        loop {
            let &(p, q) = pairs.choose(rng).unwrap();
            let sub = current.merged_subgraph(p, q);
            match bipartition_tree(&sub, &spec, &self.warnings, rng) {
                Ok(side) => {
                    let flips = Self::build_flip(current, p, q, &side);
                    return current.flip(flips);
                }
                Err(ChainError::ReselectPair) => {
                    pairs.retain(|&pair| pair != (p, q));
                    if pairs.is_empty() {
                        return Err(ChainError::ReselectionExhausted { attempts: total_pairs });
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}
