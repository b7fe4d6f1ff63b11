use std::sync::Arc;

use crate::constraints::{Constraint, ConstraintResult};
use crate::error::{ChainError, Result};
use crate::partition::Partition;
use crate::updaters::CountySplitStatus;

/// A scalar reduction of a partition, used by the numeric bound family.
pub type ScoreFn = Arc<dyn Fn(&Partition) -> Result<f64> + Send + Sync>;

/// A per-part vector reduction of a partition.
pub type ValuesFn = Arc<dyn Fn(&Partition) -> Result<Vec<f64>> + Send + Sync>;

/// Requires every value of a vector reduction to lie inside
/// `[lower, upper]`.
#[derive(Clone)]
pub struct Bounds {
    name: String,
    values: ValuesFn,
    lower: f64,
    upper: f64,
}

impl Bounds {
    pub fn new(name: impl Into<String>, values: ValuesFn, lower: f64, upper: f64) -> Self {
        Self { name: name.into(), values, lower, upper }
    }
}

impl Constraint for Bounds {
    fn name(&self) -> &str { &self.name }

    fn check(&self, partition: &Partition) -> Result<ConstraintResult> {
        for value in (self.values)(partition)? {
            if value < self.lower || value > self.upper {
                return Ok(ConstraintResult::Fail(format!(
                    "value {value} outside [{}, {}]", self.lower, self.upper
                )));
            }
        }
        Ok(ConstraintResult::Pass)
    }
}

/// Requires a scalar reduction to stay at or below a fixed bound.
#[derive(Clone)]
pub struct UpperBound {
    name: String,
    score: ScoreFn,
    bound: f64,
}

impl UpperBound {
    pub fn new(name: impl Into<String>, score: ScoreFn, bound: f64) -> Self {
        Self { name: name.into(), score, bound }
    }
}

impl Constraint for UpperBound {
    fn name(&self) -> &str { &self.name }

    fn check(&self, partition: &Partition) -> Result<ConstraintResult> {
        let value = (self.score)(partition)?;
        if value <= self.bound {
            Ok(ConstraintResult::Pass)
        } else {
            Ok(ConstraintResult::Fail(format!("{value} exceeds bound {}", self.bound)))
        }
    }
}

/// Requires a scalar reduction to stay at or above a fixed bound.
#[derive(Clone)]
pub struct LowerBound {
    name: String,
    score: ScoreFn,
    bound: f64,
}

impl LowerBound {
    pub fn new(name: impl Into<String>, score: ScoreFn, bound: f64) -> Self {
        Self { name: name.into(), score, bound }
    }
}

impl Constraint for LowerBound {
    fn name(&self) -> &str { &self.name }

    fn check(&self, partition: &Partition) -> Result<ConstraintResult> {
        let value = (self.score)(partition)?;
        if value >= self.bound {
            Ok(ConstraintResult::Pass)
        } else {
            Ok(ConstraintResult::Fail(format!("{value} below bound {}", self.bound)))
        }
    }
}

/// An `UpperBound` whose bound is the score of the starting partition:
/// the chain may never do worse than it started.
pub struct SelfConfiguringUpperBound;

impl SelfConfiguringUpperBound {
    pub fn new(name: impl Into<String>, score: ScoreFn, initial: &Partition) -> Result<UpperBound> {
        let bound = score(initial)?;
        Ok(UpperBound::new(name, score, bound))
    }
}

/// A `LowerBound` initialized from the starting partition's score, less a
/// small slack.
pub struct SelfConfiguringLowerBound;

impl SelfConfiguringLowerBound {
    pub fn new(
        name: impl Into<String>,
        score: ScoreFn,
        initial: &Partition,
        slack: f64,
    ) -> Result<LowerBound> {
        let bound = score(initial)? - slack;
        Ok(LowerBound::new(name, score, bound))
    }
}

/// A symmetric band of `percent` percent around the starting partition's
/// score.
#[derive(Clone)]
pub struct WithinPercentRangeOfBounds {
    name: String,
    score: ScoreFn,
    lower: f64,
    upper: f64,
}

impl WithinPercentRangeOfBounds {
    pub fn new(
        name: impl Into<String>,
        score: ScoreFn,
        percent: f64,
        initial: &Partition,
    ) -> Result<Self> {
        let center = score(initial)?;
        let fraction = percent / 100.0;
        Ok(Self {
            name: name.into(),
            score,
            lower: center * (1.0 - fraction),
            upper: center * (1.0 + fraction),
        })
    }
}

impl Constraint for WithinPercentRangeOfBounds {
    fn name(&self) -> &str { &self.name }

    fn check(&self, partition: &Partition) -> Result<ConstraintResult> {
        let value = (self.score)(partition)?;
        if value >= self.lower && value <= self.upper {
            Ok(ConstraintResult::Pass)
        } else {
            Ok(ConstraintResult::Fail(format!(
                "value {value} outside [{}, {}]", self.lower, self.upper
            )))
        }
    }
}

/// Require every part's tally under `pop_key` to lie within
/// `epsilon` of the ideal population `total / n_parts`, both computed
/// from the starting partition.
pub fn within_percent_of_ideal_population(
    initial: &Partition,
    epsilon: f64,
    pop_key: &str,
) -> Result<Bounds> {
    let tally = initial.by_part(pop_key)?;
    if tally.is_empty() {
        return Err(ChainError::InvalidInitialState(format!(
            "population tally '{pop_key}' has no parts"
        )));
    }
    let total = tally.values().sum::<f64>();
    let ideal = total / tally.len() as f64;

    let key = pop_key.to_string();
    let values: ValuesFn = Arc::new(move |partition: &Partition| {
        Ok(partition.by_part(&key)?.values().copied().collect())
    });
    Ok(Bounds::new(
        format!("within_percent_of_ideal_population({pop_key})"),
        values,
        ideal * (1.0 - epsilon),
        ideal * (1.0 + epsilon),
    ))
}

/// Rejects any candidate that splits a county that was whole in its
/// parent partition. Needs a `CountySplits` updater registered under
/// `alias`.
#[derive(Clone, Debug)]
pub struct RefuseNewCountySplits {
    alias: String,
}

impl Constraint for RefuseNewCountySplits {
    fn name(&self) -> &str { "refuse_new_county_splits" }

    fn check(&self, partition: &Partition) -> Result<ConstraintResult> {
        let counties = partition.value(&self.alias)?.counties()
            .ok_or_else(|| ChainError::UpdaterFailure {
                name: self.alias.clone(),
                cause: "updater is not a county-splits map".to_string(),
            })?;
        for (county, info) in counties {
            if info.status == CountySplitStatus::NewSplit {
                return Ok(ConstraintResult::Fail(format!("county '{county}' newly split")));
            }
        }
        Ok(ConstraintResult::Pass)
    }
}

/// County-split bound over the updater registered under `alias`.
pub fn refuse_new_county_splits(alias: impl Into<String>) -> RefuseNewCountySplits {
    RefuseNewCountySplits { alias: alias.into() }
}

/// Requires that no part vanish relative to the parent partition.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoVanishingParts;

impl Constraint for NoVanishingParts {
    fn name(&self) -> &str { "no_vanishing_parts" }

    fn check(&self, partition: &Partition) -> Result<ConstraintResult> {
        let Some(parent) = partition.parent() else { return Ok(ConstraintResult::Pass) };
        if partition.part_count() < parent.part_count() {
            return Ok(ConstraintResult::Fail("a part was consumed".to_string()));
        }
        Ok(ConstraintResult::Pass)
    }
}

/// The no-vanishing-parts constraint.
pub fn no_vanishing_parts() -> NoVanishingParts { NoVanishingParts }

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{AttrColumn, AttributeTable, Graph};
    use crate::partition::{Assignment, Flip};
    use crate::updaters::{Tally, UpdaterRegistry};
    use std::sync::Arc;

    fn pop_partition() -> Arc<Partition> {
        // Path of 4, unit populations, split 2/2.
        let ids = (0..4).map(|i| i.to_string()).collect();
        let mut node_attrs = AttributeTable::new(4);
        node_attrs.insert("pop", AttrColumn::Int(vec![1; 4])).unwrap();
        let graph = Graph::from_adjacency(
            ids, &[(0, 1), (1, 2), (2, 3)], node_attrs, AttributeTable::new(3),
        ).unwrap();
        let assignment = Assignment::from_vec(vec![0, 0, 1, 1]).unwrap();
        let mut registry = UpdaterRegistry::with_defaults();
        registry.register(Tally::new("pop", "population"));
        Arc::new(Partition::new(graph, assignment, registry).unwrap())
    }

    #[test]
    fn ideal_population_band_holds_initially() {
        let p = pop_partition();
        let bound = within_percent_of_ideal_population(&p, 0.5, "population").unwrap();
        assert_eq!(bound.check(&p).unwrap(), ConstraintResult::Pass);
    }

    #[test]
    fn unbalancing_flip_fails_population_bound() {
        let p = pop_partition();
        // 25% tolerance around ideal 2 gives [1.5, 2.5]; a 3/1 split fails.
        let bound = within_percent_of_ideal_population(&p, 0.25, "population").unwrap();
        let child = p.flip(Flip::from([(2, 0)])).unwrap();
        assert!(matches!(bound.check(&child).unwrap(), ConstraintResult::Fail(_)));
    }

    #[test]
    fn upper_and_lower_bounds() {
        let p = pop_partition();
        let count: ScoreFn = Arc::new(|p: &Partition| Ok(p.cut_edges()?.len() as f64));
        assert_eq!(
            UpperBound::new("cut_bound", count.clone(), 1.0).check(&p).unwrap(),
            ConstraintResult::Pass
        );
        assert!(matches!(
            LowerBound::new("cut_bound", count, 2.0).check(&p).unwrap(),
            ConstraintResult::Fail(_)
        ));
    }

    #[test]
    fn self_configuring_upper_bound_uses_initial_value() {
        let p = pop_partition();
        let count: ScoreFn = Arc::new(|p: &Partition| Ok(p.cut_edges()?.len() as f64));
        let bound = SelfConfiguringUpperBound::new("no_worse_cuts", count, &p).unwrap();
        assert_eq!(bound.check(&p).unwrap(), ConstraintResult::Pass);
        // Flipping 3 into part 0 strands node 2, raising the cut count
        // from 1 to 2.
        let child = p.flip(Flip::from([(3, 0)])).unwrap();
        assert!(matches!(bound.check(&child).unwrap(), ConstraintResult::Fail(_)));
    }

    #[test]
    fn percent_band_around_initial() {
        let p = pop_partition();
        let count: ScoreFn = Arc::new(|p: &Partition| Ok(p.cut_edges()?.len() as f64));
        let band = WithinPercentRangeOfBounds::new("cut_band", count, 50.0, &p).unwrap();
        assert_eq!(band.check(&p).unwrap(), ConstraintResult::Pass);
        let child = p.flip(Flip::from([(3, 0)])).unwrap();
        assert!(matches!(band.check(&child).unwrap(), ConstraintResult::Fail(_)));
    }

    #[test]
    fn no_vanishing_parts_passes_without_parent() {
        let p = pop_partition();
        assert_eq!(no_vanishing_parts().check(&p).unwrap(), ConstraintResult::Pass);
    }
}
