use std::collections::BTreeMap;

use crate::error::Result;
use crate::partition::{Flip, PartId, Partition};
use crate::updaters::{flows_from_flips, Updater, UpdaterValue};

/// A named view over two or more party vote columns, exposing per-part
/// totals, shares, and seat counts. Defined entirely as an updater.
#[derive(Clone, Debug)]
pub struct Election {
    name: String,
    alias: String,
    parties: Vec<(String, String)>, // (party, column)
}

impl Election {
    /// `parties` maps party names to the node attribute columns holding
    /// their vote totals.
    pub fn new(name: impl Into<String>, parties: Vec<(String, String)>) -> Self {
        let name = name.into();
        Self { alias: name.clone(), name, parties }
    }

    /// Parties whose names double as their column names.
    pub fn from_columns(name: impl Into<String>, columns: &[&str]) -> Self {
        let parties = columns.iter().map(|c| (c.to_string(), c.to_string())).collect();
        Self::new(name, parties)
    }

    /// Register the election under a different updater alias.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    fn totals_for(&self, partition: &Partition, column: &str) -> Result<BTreeMap<PartId, f64>> {
        let graph = partition.graph();
        let mut totals = BTreeMap::new();
        for p in partition.parts() {
            let mut sum = 0.0;
            for &v in partition.members(p) {
                sum += graph.node_float(v, column)?;
            }
            totals.insert(p, sum);
        }
        Ok(totals)
    }

    fn results_from_totals(
        &self,
        totals_for_party: BTreeMap<String, BTreeMap<PartId, f64>>,
    ) -> ElectionResults {
        ElectionResults::new(self.name.clone(), totals_for_party)
    }
}

impl Updater for Election {
    fn name(&self) -> &str { &self.alias }

    fn recompute(&self, partition: &Partition) -> Result<UpdaterValue> {
        let mut totals_for_party = BTreeMap::new();
        for (party, column) in &self.parties {
            totals_for_party.insert(party.clone(), self.totals_for(partition, column)?);
        }
        Ok(UpdaterValue::Election(self.results_from_totals(totals_for_party)))
    }

    fn update_from_parent(
        &self,
        parent_value: &UpdaterValue,
        partition: &Partition,
        flips: &Flip,
    ) -> Result<UpdaterValue> {
        let (Some(parent), Some(previous)) = (partition.parent(), parent_value.election()) else {
            return self.recompute(partition);
        };

        let graph = partition.graph();
        let flows = flows_from_flips(parent, flips);
        let mut totals_for_party = BTreeMap::new();
        for (party, column) in &self.parties {
            let mut totals = previous.totals_for_party[party].clone();
            for (p, flow) in &flows {
                let mut sum = *totals.get(p).unwrap_or(&0.0);
                for &v in &flow.inflow {
                    sum += graph.node_float(v, column)?;
                }
                for &v in &flow.outflow {
                    sum -= graph.node_float(v, column)?;
                }
                totals.insert(*p, sum);
            }
            totals_for_party.insert(party.clone(), totals);
        }
        Ok(UpdaterValue::Election(self.results_from_totals(totals_for_party)))
    }
}

/// Per-part outcome of one election: vote totals and shares per party.
#[derive(Clone, Debug, PartialEq)]
pub struct ElectionResults {
    pub name: String,
    pub totals_for_party: BTreeMap<String, BTreeMap<PartId, f64>>,
    pub totals: BTreeMap<PartId, f64>,
    pub percents_for_party: BTreeMap<String, BTreeMap<PartId, f64>>,
}

impl ElectionResults {
    fn new(name: String, totals_for_party: BTreeMap<String, BTreeMap<PartId, f64>>) -> Self {
        let mut totals: BTreeMap<PartId, f64> = BTreeMap::new();
        for party_totals in totals_for_party.values() {
            for (&p, &count) in party_totals {
                *totals.entry(p).or_insert(0.0) += count;
            }
        }
        let percents_for_party = totals_for_party.iter()
            .map(|(party, counts)| {
                let percents = counts.iter()
                    .map(|(&p, &count)| {
                        let total = totals[&p];
                        (p, if total > 0.0 { count / total } else { f64::NAN })
                    })
                    .collect();
                (party.clone(), percents)
            })
            .collect();
        Self { name, totals_for_party, totals, percents_for_party }
    }

    /// Vote share of a party in one part.
    pub fn percent(&self, party: &str, part: PartId) -> Option<f64> {
        self.percents_for_party.get(party)?.get(&part).copied()
    }

    /// Whether the party has the (strictly weak) plurality in a part.
    pub fn won(&self, party: &str, part: PartId) -> bool {
        let Some(own) = self.totals_for_party.get(party).and_then(|t| t.get(&part)) else {
            return false;
        };
        self.totals_for_party.values().all(|t| t.get(&part).is_none_or(|&v| v <= *own))
    }

    /// Number of parts the party wins.
    pub fn seats(&self, party: &str) -> usize {
        self.totals.keys().filter(|&&p| self.won(party, p)).count()
    }

    /// Parties participating, sorted by name.
    pub fn parties(&self) -> impl Iterator<Item = &str> {
        self.totals_for_party.keys().map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{AttrColumn, AttributeTable, Graph};
    use crate::partition::Assignment;
    use crate::updaters::UpdaterRegistry;
    use std::sync::Arc;

    fn election_partition() -> Arc<Partition> {
        // Path of 4; votes (D, R): (30,10), (20,20), (10,30), (5,35).
        let ids = (0..4).map(|i| i.to_string()).collect();
        let mut node_attrs = AttributeTable::new(4);
        node_attrs.insert("D", AttrColumn::Int(vec![30, 20, 10, 5])).unwrap();
        node_attrs.insert("R", AttrColumn::Int(vec![10, 20, 30, 35])).unwrap();
        let graph = Graph::from_adjacency(
            ids, &[(0, 1), (1, 2), (2, 3)], node_attrs, AttributeTable::new(3),
        ).unwrap();
        let assignment = Assignment::from_vec(vec![0, 0, 1, 1]).unwrap();
        let mut registry = UpdaterRegistry::with_defaults();
        registry.register(Election::from_columns("gov22", &["D", "R"]));
        Arc::new(Partition::new(graph, assignment, registry).unwrap())
    }

    #[test]
    fn totals_and_percents() {
        let p = election_partition();
        let results = p.value("gov22").unwrap().election().unwrap().clone();
        assert_eq!(results.totals_for_party["D"][&0], 50.0);
        assert_eq!(results.totals_for_party["R"][&1], 65.0);
        assert_eq!(results.totals[&0], 80.0);
        assert!((results.percent("D", 0).unwrap() - 0.625).abs() < 1e-12);
        assert!(results.won("D", 0));
        assert!(results.won("R", 1));
        assert_eq!(results.seats("D"), 1);
        assert_eq!(results.seats("R"), 1);
    }

    #[test]
    fn diff_matches_recompute_after_flip() {
        let p = election_partition();
        let child = p.flip(crate::partition::Flip::from([(1, 1)])).unwrap();
        let diffed = child.value("gov22").unwrap().clone();
        let recomputed = Election::from_columns("gov22", &["D", "R"]).recompute(&child).unwrap();
        assert_eq!(diffed, recomputed);
    }
}
