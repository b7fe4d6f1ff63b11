use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use rand::rngs::StdRng;

use crate::error::{ChainError, Result};
use crate::graph::{AttrColumn, Graph, NodeId};
use crate::tree::recursive_seed_part;

/// Opaque district label. Part ids are not required to be contiguous and
/// are preserved across flips.
pub type PartId = u32;

/// A partial reassignment of nodes to new parts.
pub type Flip = BTreeMap<NodeId, PartId>;

/// How many times random seeding redraws before giving up.
const SEED_ATTEMPTS: usize = 20;

/// Bidirectional node/part mapping with O(|flip|) updates.
///
/// Member sets are held behind `Arc` so that `clone_with_flip` shares the
/// untouched parts with its parent and copies only the parts a flip
/// actually touches.
#[derive(Clone, Debug, PartialEq)]
pub struct Assignment {
    part_of: Vec<PartId>,
    members: BTreeMap<PartId, Arc<BTreeSet<NodeId>>>,
}

impl Assignment {
    /// Build from a complete node-to-part vector.
    pub fn from_vec(part_of: Vec<PartId>) -> Result<Self> {
        if part_of.is_empty() {
            return Err(ChainError::InvalidInitialState("assignment covers no nodes".into()));
        }
        let mut members: BTreeMap<PartId, Arc<BTreeSet<NodeId>>> = BTreeMap::new();
        for (v, &p) in part_of.iter().enumerate() {
            Arc::make_mut(members.entry(p).or_default()).insert(v);
        }
        Ok(Self { part_of, members })
    }

    /// Build from an explicit node-to-part map covering every node.
    pub fn of_mapping(node_count: usize, mapping: &BTreeMap<NodeId, PartId>) -> Result<Self> {
        let mut part_of = vec![0; node_count];
        let mut seen = vec![false; node_count];
        for (&v, &p) in mapping {
            if v >= node_count { return Err(ChainError::UnknownNode(v)) }
            part_of[v] = p;
            seen[v] = true;
        }
        if let Some(v) = seen.iter().position(|&s| !s) {
            return Err(ChainError::InvalidInitialState(format!("node {v} has no part assigned")));
        }
        Self::from_vec(part_of)
    }

    /// Build from an integer node attribute whose value on each node is
    /// its part id.
    pub fn from_node_attr(graph: &Graph, name: &str) -> Result<Self> {
        let column = match graph.node_attrs().column(name) {
            Some(AttrColumn::Int(values)) => values,
            _ => return Err(ChainError::MissingAttribute(name.to_string())),
        };
        let part_of = column.iter()
            .map(|&p| {
                u32::try_from(p).map_err(|_| {
                    ChainError::InvalidInitialState(format!("attribute '{name}' has negative part id {p}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_vec(part_of)
    }

    /// Produce a population-balanced initial assignment by recursive
    /// spanning-tree bipartition, with parts labeled `0..n_parts`.
    /// Fails with `SeedFailure` once the retry budget is spent.
    pub fn from_random(
        graph: &Graph,
        n_parts: u32,
        pop_col: &str,
        epsilon: f64,
        rng: &mut StdRng,
    ) -> Result<Self> {
        for _ in 0..SEED_ATTEMPTS {
            match recursive_seed_part(graph, n_parts, pop_col, epsilon, rng) {
                Ok(part_of) => return Self::from_vec(part_of),
                Err(ChainError::MissingAttribute(name)) => {
                    return Err(ChainError::MissingAttribute(name))
                }
                Err(_) => continue,
            }
        }
        Err(ChainError::SeedFailure { attempts: SEED_ATTEMPTS })
    }

    /// Number of nodes covered by the assignment.
    #[inline] pub fn node_count(&self) -> usize { self.part_of.len() }

    /// Number of parts.
    #[inline] pub fn part_count(&self) -> usize { self.members.len() }

    /// The part a node belongs to.
    #[inline]
    pub fn part_of(&self, v: NodeId) -> PartId {
        debug_assert!(v < self.part_of.len(), "node {} out of range", v);
        self.part_of[v]
    }

    /// Sorted members of a part. Panics on an unknown part id.
    #[inline]
    pub fn members(&self, p: PartId) -> &BTreeSet<NodeId> {
        self.members.get(&p).unwrap_or_else(|| panic!("unknown part {p}"))
    }

    /// Members of a part, or `None` for an unknown part id.
    #[inline]
    pub fn members_opt(&self, p: PartId) -> Option<&BTreeSet<NodeId>> {
        self.members.get(&p).map(|s| s.as_ref())
    }

    /// Sorted iterator over part ids.
    pub fn parts(&self) -> impl Iterator<Item = PartId> + '_ {
        self.members.keys().copied()
    }

    /// Apply a flip in place. Nodes already in their target part are
    /// no-ops. Fails with `DegenerateFlip` if any part would be emptied;
    /// on failure the assignment is left unchanged.
    pub fn apply_flip_inplace(&mut self, flips: &Flip) -> Result<()> {
        // Net member-count change per part decides emptiness up front.
        let mut delta: BTreeMap<PartId, i64> = BTreeMap::new();
        for (&v, &new_part) in flips {
            if v >= self.part_of.len() { return Err(ChainError::UnknownNode(v)) }
            let old_part = self.part_of[v];
            if old_part == new_part { continue }
            *delta.entry(old_part).or_insert(0) -= 1;
            *delta.entry(new_part).or_insert(0) += 1;
        }
        for (&p, &d) in &delta {
            let size = self.members.get(&p).map_or(0, |m| m.len()) as i64;
            if size + d == 0 {
                return Err(ChainError::DegenerateFlip(p));
            }
        }

        for (&v, &new_part) in flips {
            let old_part = self.part_of[v];
            if old_part == new_part { continue }
            Arc::make_mut(self.members.get_mut(&old_part).unwrap()).remove(&v);
            Arc::make_mut(self.members.entry(new_part).or_default()).insert(v);
            self.part_of[v] = new_part;
        }
        Ok(())
    }

    /// Shallow-copy the assignment (sharing untouched member sets) and
    /// apply the flip to the copy.
    pub fn clone_with_flip(&self, flips: &Flip) -> Result<Self> {
        let mut next = self.clone();
        next.apply_flip_inplace(flips)?;
        Ok(next)
    }
}
