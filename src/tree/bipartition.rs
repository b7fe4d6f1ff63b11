use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rand::seq::IndexedRandom;
use rand::Rng;

use crate::error::{ChainError, Result};
use crate::graph::{NodeId, Subgraph};
use crate::tree::{random_spanning_tree, uniform_spanning_tree, SpanningTree};

/// Which spanning-tree draw the bipartition uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SpanningTreeMethod {
    /// Kruskal over random edge weights (plus region surcharges).
    #[default]
    RandomWeight,
    /// Wilson's algorithm; exactly uniform over spanning trees, slower.
    Uniform,
}

/// Emitted when a bipartition attempt is struggling but another attempt
/// will be tried. Not an error.
#[derive(Clone, Debug)]
pub struct BipartitionWarning {
    pub attempts: usize,
}

/// Counts warnings and optionally forwards them to a host callback, so
/// callers can log without an exception mechanism.
#[derive(Clone, Default)]
pub struct WarningSink {
    count: Arc<AtomicUsize>,
    hook: Option<Arc<dyn Fn(&BipartitionWarning) + Send + Sync>>,
}

impl WarningSink {
    pub fn new() -> Self { Self::default() }

    /// A sink that forwards every warning to `hook`.
    pub fn with_hook(hook: impl Fn(&BipartitionWarning) + Send + Sync + 'static) -> Self {
        Self { count: Arc::new(AtomicUsize::new(0)), hook: Some(Arc::new(hook)) }
    }

    /// Number of warnings emitted so far.
    pub fn count(&self) -> usize { self.count.load(Ordering::Relaxed) }

    pub(crate) fn emit(&self, warning: BipartitionWarning) {
        self.count.fetch_add(1, Ordering::Relaxed);
        if let Some(hook) = &self.hook {
            hook(&warning);
        }
    }
}

impl std::fmt::Debug for WarningSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WarningSink").field("count", &self.count()).finish()
    }
}

/// Parameters of a balanced spanning-tree bipartition.
#[derive(Clone, Debug)]
pub struct BipartitionSpec {
    pub pop_col: String,
    pub pop_target: f64,
    pub epsilon: f64,
    pub node_repeats: usize,
    pub max_attempts: usize,
    pub warn_attempts: usize,
    pub region_surcharge: BTreeMap<String, f64>,
    pub method: SpanningTreeMethod,
    /// One-sided cuts only require the cut-off side to hit the target;
    /// used when carving single districts out of a larger pool.
    pub one_sided: bool,
    pub allow_pair_reselection: bool,
}

impl BipartitionSpec {
    pub fn new(pop_col: impl Into<String>, pop_target: f64, epsilon: f64) -> Self {
        Self {
            pop_col: pop_col.into(),
            pop_target,
            epsilon,
            node_repeats: 1,
            max_attempts: 10_000,
            warn_attempts: 1_000,
            region_surcharge: BTreeMap::new(),
            method: SpanningTreeMethod::RandomWeight,
            one_sided: false,
            allow_pair_reselection: false,
        }
    }

    /// Integer balance window `[ceil(target(1-eps)), floor(target(1+eps))]`.
    fn window(&self) -> (i64, i64) {
        let lo = (self.pop_target * (1.0 - self.epsilon)).ceil() as i64;
        let hi = (self.pop_target * (1.0 + self.epsilon)).floor() as i64;
        (lo, hi)
    }
}

/// One admissible cut of the current spanning tree.
struct CutCandidate {
    node: usize,
    take_complement: bool,
    crossed: Vec<String>,
    surcharge_sum: f64,
}

/// Find a balanced two-way split of the subgraph by drawing spanning
/// trees and cutting one edge, honoring the population window of `spec`.
/// Returns the chosen side as parent-graph node ids; the other side is
/// its complement within the subgraph.
///
/// Redraws up to `max_attempts` trees, emitting a `BipartitionWarning`
/// through `sink` once `warn_attempts` draws have failed. On exhaustion
/// fails with `ReselectPair` when `allow_pair_reselection` is set, and
/// `BipartitionFailure` otherwise.
pub fn bipartition_tree(
    sub: &Subgraph<'_>,
    spec: &BipartitionSpec,
    sink: &WarningSink,
    rng: &mut impl Rng,
) -> Result<BTreeSet<NodeId>> {
    let pops = sub.node_ints(&spec.pop_col)?;
    let total = pops.iter().sum::<i64>();
    let (lo, hi) = spec.window();

    let mut tree = draw_tree(sub, spec, rng)?;
    let mut restarts = 0;
    let mut attempts = 0;

    while attempts < spec.max_attempts {
        if restarts == spec.node_repeats {
            tree = draw_tree(sub, spec, rng)?;
            restarts = 0;
        }

        let candidates = balanced_cuts(sub, &tree, &pops, total, lo, hi, spec)?;
        if !candidates.is_empty() {
            let choice = cut_choice(&candidates, &spec.region_surcharge, rng);
            return Ok(collect_side(sub, &tree, choice));
        }

        restarts += 1;
        attempts += 1;

        if attempts == spec.warn_attempts && !spec.allow_pair_reselection {
            sink.emit(BipartitionWarning { attempts });
        }
    }

    if spec.allow_pair_reselection {
        return Err(ChainError::ReselectPair);
    }
    Err(ChainError::BipartitionFailure { attempts })
}

fn draw_tree(
    sub: &Subgraph<'_>,
    spec: &BipartitionSpec,
    rng: &mut impl Rng,
) -> Result<SpanningTree> {
    match spec.method {
        SpanningTreeMethod::RandomWeight => random_spanning_tree(sub, &spec.region_surcharge, rng),
        SpanningTreeMethod::Uniform => uniform_spanning_tree(sub, rng),
    }
}

/// Enumerate every tree edge whose cut satisfies the balance window.
fn balanced_cuts(
    sub: &Subgraph<'_>,
    tree: &SpanningTree,
    pops: &[i64],
    total: i64,
    lo: i64,
    hi: i64,
    spec: &BipartitionSpec,
) -> Result<Vec<CutCandidate>> {
    let sums = tree.subtree_sums(pops);
    let mut candidates = Vec::new();

    for &u in tree.order() {
        if u == tree.root() { continue }
        let below = sums[u];
        let above = total - below;

        let take_complement = if spec.one_sided {
            if (lo..=hi).contains(&below) {
                false
            } else if (lo..=hi).contains(&above) {
                true
            } else {
                continue;
            }
        } else {
            if !((lo..=hi).contains(&below) && (lo..=hi).contains(&above)) { continue }
            false
        };

        let (crossed, surcharge_sum) = crossed_regions(sub, tree, u, spec)?;
        candidates.push(CutCandidate { node: u, take_complement, crossed, surcharge_sum });
    }
    Ok(candidates)
}

/// The region attributes whose values differ across the cut edge
/// `(u, parent(u))`, with their summed surcharge.
fn crossed_regions(
    sub: &Subgraph<'_>,
    tree: &SpanningTree,
    u: usize,
    spec: &BipartitionSpec,
) -> Result<(Vec<String>, f64)> {
    let mut crossed = Vec::new();
    let mut sum = 0.0;
    let a = sub.parent_id(u);
    let b = sub.parent_id(tree.parent(u));
    for (region, surcharge) in &spec.region_surcharge {
        if sub.graph().node_attr(a, region)? != sub.graph().node_attr(b, region)? {
            crossed.push(region.clone());
            sum += surcharge;
        }
    }
    Ok((crossed, sum))
}

/// Select the cut edge. Candidate classes are ordered first by how many
/// region lines the edge bridges (descending), then by summed surcharge
/// (descending), then by the region-name tuple (ascending); the pick
/// within the winning class is uniform. With no surcharges every
/// candidate is in one class and the choice is plain uniform.
fn cut_choice<'c>(
    candidates: &'c [CutCandidate],
    region_surcharge: &BTreeMap<String, f64>,
    rng: &mut impl Rng,
) -> &'c CutCandidate {
    if region_surcharge.is_empty() {
        return candidates.choose(rng).unwrap();
    }

    let best = candidates.iter()
        .max_by(|a, b| {
            a.crossed.len().cmp(&b.crossed.len())
                .then(a.surcharge_sum.total_cmp(&b.surcharge_sum))
                .then_with(|| b.crossed.cmp(&a.crossed))
        })
        .unwrap();
    let class = candidates.iter()
        .filter(|c| c.crossed == best.crossed)
        .collect::<Vec<_>>();
    class.choose(rng).copied().unwrap()
}

fn collect_side(
    sub: &Subgraph<'_>,
    tree: &SpanningTree,
    choice: &CutCandidate,
) -> BTreeSet<NodeId> {
    let subtree = tree.subtree(choice.node);
    if choice.take_complement {
        let below = subtree.iter().copied().collect::<BTreeSet<_>>();
        (0..sub.len())
            .filter(|u| !below.contains(u))
            .map(|u| sub.parent_id(u))
            .collect()
    } else {
        subtree.iter().map(|&u| sub.parent_id(u)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{AttrColumn, AttributeTable, Graph};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn path_with_pops(pops: &[i64]) -> Graph {
        let n = pops.len();
        let ids = (0..n).map(|i| i.to_string()).collect();
        let edges = (0..n - 1).map(|i| (i, i + 1)).collect::<Vec<_>>();
        let mut node_attrs = AttributeTable::new(n);
        node_attrs.insert("pop", AttrColumn::Int(pops.to_vec())).unwrap();
        Graph::from_adjacency(ids, &edges, node_attrs, AttributeTable::new(n - 1)).unwrap()
    }

    #[test]
    fn splits_unit_path_in_half() {
        let g = path_with_pops(&[1; 8]);
        let sub = g.subgraph(0..8);
        let spec = BipartitionSpec::new("pop", 4.0, 0.25);
        let mut rng = StdRng::seed_from_u64(2024);
        let side = bipartition_tree(&sub, &spec, &WarningSink::new(), &mut rng).unwrap();
        // Window is [3, 5]; both sides must fall inside it.
        assert!((3..=5).contains(&(side.len() as i64)));
        assert!((3..=5).contains(&(8 - side.len() as i64)));
        // A path splits into two contiguous runs.
        let side = side.iter().copied().collect::<Vec<_>>();
        assert!(side.windows(2).all(|w| w[1] == w[0] + 1));
    }

    #[test]
    fn one_sided_cut_hits_target() {
        let g = path_with_pops(&[2, 3, 1, 4, 2, 3]);
        let sub = g.subgraph(0..6);
        let mut spec = BipartitionSpec::new("pop", 5.0, 0.2);
        spec.one_sided = true;
        let mut rng = StdRng::seed_from_u64(9);
        let side = bipartition_tree(&sub, &spec, &WarningSink::new(), &mut rng).unwrap();
        let pop = side.iter().map(|&v| g.node_int(v, "pop").unwrap()).sum::<i64>();
        assert!((4..=6).contains(&pop));
    }

    #[test]
    fn impossible_window_exhausts() {
        let g = path_with_pops(&[10, 10]);
        let sub = g.subgraph(0..2);
        let mut spec = BipartitionSpec::new("pop", 7.0, 0.01);
        spec.max_attempts = 50;
        spec.warn_attempts = 10;
        let sink = WarningSink::new();
        let mut rng = StdRng::seed_from_u64(1);
        let err = bipartition_tree(&sub, &spec, &sink, &mut rng).unwrap_err();
        assert!(matches!(err, ChainError::BipartitionFailure { attempts: 50 }));
        assert_eq!(sink.count(), 1);
    }

    #[test]
    fn reselection_signal_when_allowed() {
        let g = path_with_pops(&[10, 10]);
        let sub = g.subgraph(0..2);
        let mut spec = BipartitionSpec::new("pop", 7.0, 0.01);
        spec.max_attempts = 20;
        spec.allow_pair_reselection = true;
        let mut rng = StdRng::seed_from_u64(1);
        let err = bipartition_tree(&sub, &spec, &WarningSink::new(), &mut rng).unwrap_err();
        assert!(matches!(err, ChainError::ReselectPair));
    }

    #[test]
    fn missing_pop_column_is_fatal() {
        let g = path_with_pops(&[1, 1]);
        let sub = g.subgraph(0..2);
        let spec = BipartitionSpec::new("nope", 1.0, 0.5);
        let mut rng = StdRng::seed_from_u64(1);
        let err = bipartition_tree(&sub, &spec, &WarningSink::new(), &mut rng).unwrap_err();
        assert!(matches!(err, ChainError::MissingAttribute(_)));
    }

    #[test]
    fn fixed_seed_is_deterministic() {
        let g = path_with_pops(&[1; 8]);
        let spec = BipartitionSpec::new("pop", 4.0, 0.25);
        let draw = |seed| {
            let sub = g.subgraph(0..8);
            let mut rng = StdRng::seed_from_u64(seed);
            bipartition_tree(&sub, &spec, &WarningSink::new(), &mut rng).unwrap()
        };
        assert_eq!(draw(42), draw(42));
    }
}
