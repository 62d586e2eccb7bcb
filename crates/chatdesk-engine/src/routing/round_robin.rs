//! # Round-Robin Coordinator
//!
//! Keyed monotonic counters backing every rotation in the dispatch
//! pipeline: the cross-team rotation, the per-team seniority cohorts, and
//! the overflow pool. Each key advances independently with an atomic
//! read-modify-write, so concurrent pickers never hand out the same slot
//! twice in a row and unfairness across agents stays bounded.
//!
//! The modulus is applied with the *current* cohort size at update time;
//! cohorts shrink and grow as shifts roll over, and a counter stored
//! mod-N keeps every subsequent pick in range.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::agent::{Seniority, Team};
use crate::error::{DispatchError, Result};

/// Concurrent map of named rotation counters
///
/// ```
/// use chatdesk_engine::routing::RoundRobinCoordinator;
///
/// let rotation = RoundRobinCoordinator::new();
/// assert_eq!(rotation.next("pool", 3).unwrap(), 0);
/// assert_eq!(rotation.next("pool", 3).unwrap(), 1);
/// assert_eq!(rotation.next("pool", 3).unwrap(), 2);
/// assert_eq!(rotation.next("pool", 3).unwrap(), 0);
///
/// rotation.reset("pool");
/// assert_eq!(rotation.next("pool", 3).unwrap(), 0);
/// ```
pub struct RoundRobinCoordinator {
    counters: DashMap<String, u64>,
}

impl RoundRobinCoordinator {
    /// Create a coordinator with no counters
    pub fn new() -> Self {
        Self { counters: DashMap::new() }
    }

    /// Advance the counter for `key` and return the pick within `0..n`
    ///
    /// The first call on a key yields 0; each later call stores and yields
    /// `(prev + 1) % n`. The whole step runs under the key's map entry, so
    /// concurrent callers serialize per key. `n` must be positive.
    pub fn next(&self, key: &str, n: usize) -> Result<usize> {
        if n == 0 {
            return Err(DispatchError::invalid_input(format!(
                "round-robin modulus for key '{key}' must be positive"
            )));
        }
        match self.counters.entry(key.to_string()) {
            Entry::Vacant(vacant) => {
                vacant.insert(0);
                Ok(0)
            }
            Entry::Occupied(mut occupied) => {
                let next = (*occupied.get() + 1) % n as u64;
                occupied.insert(next);
                Ok(next as usize)
            }
        }
    }

    /// Drop the counter for `key`; the next call starts over at 0
    pub fn reset(&self, key: &str) {
        self.counters.remove(key);
    }

    /// Rotation key for a team pool
    ///
    /// The selector's cross-team rotation deliberately runs on
    /// `team_key(Team::TeamA)` rather than a dedicated key.
    pub fn team_key(team: Team) -> String {
        format!("team_{team}")
    }

    /// Rotation key for a seniority cohort inside a team
    pub fn seniority_key(team: Team, seniority: Seniority) -> String {
        format!("team_{team}_seniority_{seniority}")
    }
}

impl Default for RoundRobinCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn keys_advance_independently() {
        let rotation = RoundRobinCoordinator::new();
        assert_eq!(rotation.next("a", 2).unwrap(), 0);
        assert_eq!(rotation.next("b", 5).unwrap(), 0);
        assert_eq!(rotation.next("a", 2).unwrap(), 1);
        assert_eq!(rotation.next("b", 5).unwrap(), 1);
        assert_eq!(rotation.next("a", 2).unwrap(), 0);
    }

    #[test]
    fn zero_modulus_is_rejected() {
        let rotation = RoundRobinCoordinator::new();
        assert!(matches!(
            rotation.next("a", 0),
            Err(DispatchError::InvalidInput(_))
        ));
    }

    #[test]
    fn shrinking_modulus_stays_in_range() {
        let rotation = RoundRobinCoordinator::new();
        for _ in 0..4 {
            rotation.next("pool", 5).unwrap();
        }
        // Cohort shrank from 5 to 2: every pick must stay below 2.
        for _ in 0..6 {
            assert!(rotation.next("pool", 2).unwrap() < 2);
        }
    }

    #[test]
    fn key_builders_match_wire_names() {
        assert_eq!(RoundRobinCoordinator::team_key(Team::TeamA), "team_TeamA");
        assert_eq!(RoundRobinCoordinator::team_key(Team::Overflow), "team_Overflow");
        assert_eq!(
            RoundRobinCoordinator::seniority_key(Team::TeamB, Seniority::Junior),
            "team_TeamB_seniority_Junior"
        );
    }

    #[test]
    fn concurrent_callers_cover_the_range() {
        let rotation = Arc::new(RoundRobinCoordinator::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let rotation = Arc::clone(&rotation);
            handles.push(std::thread::spawn(move || {
                let mut picks = Vec::new();
                for _ in 0..100 {
                    picks.push(rotation.next("shared", 4).unwrap());
                }
                picks
            }));
        }
        let mut counts = [0usize; 4];
        for handle in handles {
            for pick in handle.join().unwrap() {
                counts[pick] += 1;
            }
        }
        // 800 picks over a 4-slot rotation: every slot gets its share.
        assert_eq!(counts.iter().sum::<usize>(), 800);
        assert!(counts.iter().all(|&c| c == 200), "counts: {counts:?}");
    }
}
