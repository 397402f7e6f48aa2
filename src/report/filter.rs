//! Categorical filter engine.
//!
//! Selections are sticky across renders and self-healing: when the fetched
//! record set changes identity (detected with a cheap fingerprint) and a
//! previously chosen value no longer exists in the new option universe, every
//! dimension resets to "all" at once. A filter UI must never show a selected
//! value that the data no longer contains.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::LedgerRecord;

/// The filterable dimensions of the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Player,
    Club,
    Agent,
    Reference,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::Player,
        Dimension::Club,
        Dimension::Agent,
        Dimension::Reference,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Dimension::Player => "player",
            Dimension::Club => "club",
            Dimension::Agent => "agent",
            Dimension::Reference => "reference",
        }
    }

    /// The record field this dimension filters on.
    pub fn value<'a>(&self, r: &'a LedgerRecord) -> &'a str {
        match self {
            Dimension::Player => &r.player_name,
            Dimension::Club => &r.club,
            Dimension::Agent => &r.agent_name,
            Dimension::Reference => &r.reference,
        }
    }
}

/// A per-dimension selection: the "all" sentinel or an explicit value set.
/// The sentinel is a variant, not a magic member of the value set, so a real
/// categorical value can never collide with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    #[default]
    All,
    Values(BTreeSet<String>),
}

impl Selection {
    pub fn is_all(&self) -> bool {
        matches!(self, Selection::All)
    }

    pub fn matches(&self, value: &str) -> bool {
        match self {
            Selection::All => true,
            Selection::Values(chosen) => chosen.contains(value),
        }
    }

    /// True when every chosen value still exists in `universe`. The sentinel
    /// is trivially valid.
    fn valid_against(&self, universe: &BTreeSet<&str>) -> bool {
        match self {
            Selection::All => true,
            Selection::Values(chosen) => chosen.iter().all(|v| universe.contains(v.as_str())),
        }
    }
}

/// Sticky filter state, one selection per dimension. AND across dimensions,
/// OR within one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FilterSelections {
    pub player: Selection,
    pub club: Selection,
    pub agent: Selection,
    pub reference: Selection,
}

impl FilterSelections {
    pub fn get(&self, dim: Dimension) -> &Selection {
        match dim {
            Dimension::Player => &self.player,
            Dimension::Club => &self.club,
            Dimension::Agent => &self.agent,
            Dimension::Reference => &self.reference,
        }
    }

    pub fn set(&mut self, dim: Dimension, selection: Selection) {
        match dim {
            Dimension::Player => self.player = selection,
            Dimension::Club => self.club = selection,
            Dimension::Agent => self.agent = selection,
            Dimension::Reference => self.reference = selection,
        }
    }

    /// Clear every dimension back to "all". The user-invokable reset.
    pub fn reset(&mut self) {
        *self = FilterSelections::default();
    }

    pub fn is_unfiltered(&self) -> bool {
        Dimension::ALL.iter().all(|d| self.get(*d).is_all())
    }

    /// Apply all selections. Zero rows in, zero rows out; an all-sentinel
    /// dimension never contributes a predicate.
    pub fn apply(&self, records: &[LedgerRecord]) -> Vec<LedgerRecord> {
        records
            .iter()
            .filter(|r| Dimension::ALL.iter().all(|d| self.get(*d).matches(d.value(r))))
            .cloned()
            .collect()
    }

    /// Self-healing step, run once per render before filtering: when the
    /// fingerprint moved and any chosen value fell out of its dimension's
    /// universe, reset everything. Returns true if a reset happened.
    pub fn heal(&mut self, records: &[LedgerRecord]) -> bool {
        for dim in Dimension::ALL {
            let universe: BTreeSet<&str> = records.iter().map(|r| dim.value(r)).collect();
            if !self.get(dim).valid_against(&universe) {
                self.reset();
                return true;
            }
        }
        false
    }
}

/// A cheap structural summary of a fetched set: row count plus a sample of
/// distinct player names (first ten, sorted). Enough to notice that a
/// different window or scope was fetched without hashing every row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint(String);

pub fn fingerprint(records: &[LedgerRecord]) -> Fingerprint {
    let names: BTreeSet<&str> = records.iter().map(|r| r.player_name.as_str()).collect();
    let sample: Vec<&str> = names.iter().take(10).copied().collect();
    Fingerprint(format!("{}:{}", records.len(), sample.join("|")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::testutil::record;

    fn values(vals: &[&str]) -> Selection {
        Selection::Values(vals.iter().map(|s| s.to_string()).collect())
    }

    fn sample_rows() -> Vec<LedgerRecord> {
        vec![
            record("Maria Silva", "ClubA", "AgentX", "R1"),
            record("Maria Silva", "ClubB", "AgentX", "R2"),
            record("Pedro", "ClubA", "AgentY", "R1"),
            record("Ana", "ClubC", "AgentY", "R2"),
            record("Carlos", "ClubB", "AgentZ", "R3"),
        ]
    }

    #[test]
    fn test_all_sentinel_is_a_no_op() {
        let rows = sample_rows();
        let filters = FilterSelections::default();
        assert!(filters.is_unfiltered());
        assert_eq!(filters.apply(&rows), rows);
    }

    #[test]
    fn test_or_within_dimension_and_across_dimensions() {
        let rows = sample_rows();

        let mut filters = FilterSelections::default();
        filters.set(Dimension::Club, values(&["ClubA", "ClubB"]));
        let out = filters.apply(&rows);
        assert_eq!(out.len(), 4);

        filters.set(Dimension::Player, values(&["Maria Silva"]));
        let out = filters.apply(&rows);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|r| r.player_name == "Maria Silva"));
    }

    #[test]
    fn test_full_distinct_set_round_trips() {
        let rows = sample_rows();
        let every_club: Vec<&str> = {
            let set: BTreeSet<&str> = rows.iter().map(|r| r.club.as_str()).collect();
            set.into_iter().collect()
        };

        let mut filters = FilterSelections::default();
        filters.set(Dimension::Club, values(&every_club));
        assert_eq!(filters.apply(&rows), rows);
    }

    #[test]
    fn test_empty_selection_set_filters_everything_without_error() {
        let rows = sample_rows();
        let mut filters = FilterSelections::default();
        filters.set(Dimension::Agent, Selection::Values(BTreeSet::new()));
        assert!(filters.apply(&rows).is_empty());
    }

    #[test]
    fn test_zero_rows_in_zero_rows_out() {
        let mut filters = FilterSelections::default();
        filters.set(Dimension::Club, values(&["ClubA"]));
        assert!(filters.apply(&[]).is_empty());
    }

    #[test]
    fn test_heal_resets_all_dimensions_on_stale_value() {
        // Prior render chose ClubA and AgentX; the new fetch has neither ClubA
        // nor those players.
        let mut filters = FilterSelections::default();
        filters.set(Dimension::Club, values(&["ClubA"]));
        filters.set(Dimension::Agent, values(&["AgentX"]));

        let new_rows = vec![
            record("Novo Jogador", "ClubZ", "AgentQ", "R9"),
            record("Outra Pessoa", "ClubZ", "AgentQ", "R9"),
        ];

        assert!(filters.heal(&new_rows));
        // Not just the club selection: every dimension went back to "all".
        assert!(filters.is_unfiltered());
    }

    #[test]
    fn test_heal_keeps_selections_that_survive() {
        let mut filters = FilterSelections::default();
        filters.set(Dimension::Club, values(&["ClubA"]));

        let rows = sample_rows();
        assert!(!filters.heal(&rows));
        assert_eq!(filters.get(Dimension::Club), &values(&["ClubA"]));
    }

    #[test]
    fn test_user_reset_is_unconditional() {
        let mut filters = FilterSelections::default();
        filters.set(Dimension::Player, values(&["Maria Silva"]));
        filters.set(Dimension::Reference, values(&["R1"]));
        filters.reset();
        assert!(filters.is_unfiltered());
    }

    #[test]
    fn test_fingerprint_tracks_shape_and_sample() {
        let rows = sample_rows();
        let fp1 = fingerprint(&rows);
        assert_eq!(fp1, fingerprint(&rows.clone()));

        let mut grown = rows.clone();
        grown.push(record("Zeca", "ClubA", "AgentX", "R1"));
        assert_ne!(fp1, fingerprint(&grown));

        assert_ne!(fp1, fingerprint(&[]));
    }
}
