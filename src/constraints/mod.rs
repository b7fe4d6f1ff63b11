mod bounds;
mod compactness;
mod contiguity;

use std::sync::Arc;

pub use bounds::{
    no_vanishing_parts, refuse_new_county_splits, within_percent_of_ideal_population, Bounds,
    LowerBound, NoVanishingParts, RefuseNewCountySplits, ScoreFn, SelfConfiguringLowerBound,
    SelfConfiguringUpperBound, UpperBound, ValuesFn, WithinPercentRangeOfBounds,
};
pub use compactness::{
    cut_edge_count, l1_polsby_popper, l1_reciprocal_polsby_popper, l_minus_1_polsby_popper,
    no_worse_l1_reciprocal_polsby_popper, no_worse_l_minus_1_polsby_popper,
};
pub use contiguity::{Contiguous, SingleFlipContiguous};

use crate::error::Result;
use crate::partition::Partition;

/// Outcome of one constraint check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConstraintResult {
    Pass,
    Fail(String),
    /// The fast path cannot decide; the validator falls back to the
    /// constraint's full check.
    Indeterminate,
}

/// A predicate over candidate partitions. `check` may use a fast path
/// specialized to the last flip and return `Indeterminate` when that path
/// does not apply; `check_full` must always decide.
pub trait Constraint: Send + Sync {
    fn name(&self) -> &str;

    fn check(&self, partition: &Partition) -> Result<ConstraintResult>;

    fn check_full(&self, partition: &Partition) -> Result<ConstraintResult> {
        self.check(partition)
    }
}

/// The conjunction of constraint predicates, evaluated left to right with
/// a short circuit on the first failure. List cheap constraints first;
/// contiguity failures are common and local, population bounds are not.
#[derive(Clone, Default)]
pub struct Validator {
    constraints: Vec<Arc<dyn Constraint>>,
}

impl Validator {
    /// A validator with no constraints, passing everything.
    pub fn new() -> Self { Self::default() }

    /// Conjunction of the given constraints, left to right.
    pub fn all_of(constraints: Vec<Arc<dyn Constraint>>) -> Self {
        Self { constraints }
    }

    /// Append a constraint.
    pub fn push(&mut self, constraint: impl Constraint + 'static) -> &mut Self {
        self.constraints.push(Arc::new(constraint));
        self
    }

    /// Number of constraints.
    #[inline] pub fn len(&self) -> usize { self.constraints.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.constraints.is_empty() }

    /// Check a candidate against every constraint. Failures carry the
    /// failing constraint's name; `Indeterminate` fast paths fall back to
    /// the constraint's full check.
    pub fn validate(&self, partition: &Partition) -> Result<ConstraintResult> {
        for constraint in &self.constraints {
            let result = match constraint.check(partition)? {
                ConstraintResult::Indeterminate => constraint.check_full(partition)?,
                decided => decided,
            };
            match result {
                ConstraintResult::Pass => {}
                ConstraintResult::Fail(reason) => {
                    return Ok(ConstraintResult::Fail(format!("{}: {}", constraint.name(), reason)));
                }
                ConstraintResult::Indeterminate => {
                    return Ok(ConstraintResult::Fail(format!(
                        "{}: full check did not decide", constraint.name()
                    )));
                }
            }
        }
        Ok(ConstraintResult::Pass)
    }
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("constraints", &self.constraints.iter().map(|c| c.name()).collect::<Vec<_>>())
            .finish()
    }
}
