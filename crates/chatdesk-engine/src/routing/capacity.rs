//! # Capacity Calculator and Admission Control
//!
//! Computes per-team and total chat capacity from the live roster and
//! answers the admission question for new sessions. Capacity figures are
//! cached for a few seconds: admission is best-effort by design, and the
//! final arbiter of a slot is always the reservation, so a slightly stale
//! read is acceptable. Writers invalidate the affected scopes on every
//! assignment commit.
//!
//! ## Admission
//!
//! A new session is admitted when the main queue has headroom against
//! `floor(total_capacity * queue_multiplier)`. When it does not, office
//! hours open a second door: if the overflow queue still has headroom
//! against the overflow team's own limit, the session is admitted into the
//! main queue and the dispatcher migrates it to overflow on a later tick.
//! Outside office hours that second door is closed and the session is
//! refused.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

use crate::agent::{AgentStore, Team};
use crate::clock::Clock;
use crate::config::CapacityConfig;
use crate::error::Result;
use crate::routing::hours::BusinessHours;
use crate::session::SessionStore;

/// Cache scope for a capacity figure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Scope {
    Team(Team),
    Total,
}

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    computed_at: Instant,
    value: u32,
}

/// Capacity math with a short-TTL cache and the admission predicate
pub struct CapacityCalculator {
    agents: Arc<AgentStore>,
    sessions: Arc<SessionStore>,
    clock: Arc<dyn Clock>,
    cache: DashMap<Scope, CacheEntry>,
    ttl: Duration,
    queue_multiplier: f64,
}

impl CapacityCalculator {
    /// Create a calculator over the stores
    pub fn new(
        agents: Arc<AgentStore>,
        sessions: Arc<SessionStore>,
        clock: Arc<dyn Clock>,
        config: &CapacityConfig,
    ) -> Self {
        Self {
            agents,
            sessions,
            clock,
            cache: DashMap::new(),
            ttl: Duration::from_secs(config.cache_ttl_secs),
            queue_multiplier: config.queue_multiplier,
        }
    }

    /// Capacity of one team: sum of `max_concurrent` over its active agents
    pub async fn team_capacity(&self, team: Team) -> Result<u32> {
        if let Some(cached) = self.fresh(Scope::Team(team)) {
            return Ok(cached);
        }
        let value = self.agents.team_capacity(team).await?;
        self.cache.insert(
            Scope::Team(team),
            CacheEntry { computed_at: Instant::now(), value },
        );
        Ok(value)
    }

    /// Combined capacity of the three regular teams
    pub async fn total_capacity(&self) -> Result<u32> {
        if let Some(cached) = self.fresh(Scope::Total) {
            return Ok(cached);
        }
        let mut value = 0;
        for team in Team::ROTATION {
            value += self.agents.team_capacity(team).await?;
        }
        self.cache.insert(
            Scope::Total,
            CacheEntry { computed_at: Instant::now(), value },
        );
        Ok(value)
    }

    /// Queue limit for a capacity figure: `floor(capacity * multiplier)`
    pub fn queue_limit(&self, capacity: u32) -> usize {
        (capacity as f64 * self.queue_multiplier).floor() as usize
    }

    /// Whether a new session would be admitted right now
    pub async fn can_accept(&self) -> Result<bool> {
        let main_limit = self.queue_limit(self.total_capacity().await?);
        let main_length = self.sessions.queue_length().await?;
        if main_length < main_limit {
            return Ok(true);
        }

        if BusinessHours::is_office_hours(self.clock.now()) {
            let overflow_limit = self.queue_limit(self.team_capacity(Team::Overflow).await?);
            let overflow_length = self.sessions.overflow_queue_length().await?;
            if overflow_length < overflow_limit {
                debug!(
                    "📋 Main queue full ({main_length}/{main_limit}); admitting on overflow headroom ({overflow_length}/{overflow_limit})"
                );
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Drop the cached figure for one team
    pub fn invalidate_team(&self, team: Team) {
        self.cache.remove(&Scope::Team(team));
    }

    /// Drop the cached total
    pub fn invalidate_total(&self) {
        self.cache.remove(&Scope::Total);
    }

    fn fresh(&self, scope: Scope) -> Option<u32> {
        self.cache
            .get(&scope)
            .filter(|entry| entry.computed_at.elapsed() < self.ttl)
            .map(|entry| entry.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{starting_roster, Agent, Seniority, ShiftBasis, ShiftWindow};
    use crate::clock::SimulatedClock;
    use chrono::TimeZone;

    fn calculator_with_roster(
        all_active: bool,
    ) -> (CapacityCalculator, Arc<AgentStore>, Arc<SessionStore>) {
        let agents = Arc::new(AgentStore::new());
        for agent in starting_roster(10) {
            if all_active {
                agent.set_shift_flags(true, true);
            }
            agents.insert(agent);
        }
        let sessions = Arc::new(SessionStore::new());
        // A Monday outside office hours (03:00 UTC is 23:00 Sunday Eastern).
        let clock = Arc::new(SimulatedClock::new(
            chrono::Utc.with_ymd_and_hms(2025, 6, 2, 3, 0, 0).unwrap(),
        ));
        let calc = CapacityCalculator::new(
            Arc::clone(&agents),
            Arc::clone(&sessions),
            clock,
            &CapacityConfig::default(),
        );
        (calc, agents, sessions)
    }

    #[tokio::test]
    async fn roster_capacities() {
        let (calc, _, _) = calculator_with_roster(true);
        assert_eq!(calc.team_capacity(Team::TeamA).await.unwrap(), 21);
        assert_eq!(calc.team_capacity(Team::TeamB).await.unwrap(), 22);
        assert_eq!(calc.team_capacity(Team::TeamC).await.unwrap(), 12);
        assert_eq!(calc.team_capacity(Team::Overflow).await.unwrap(), 24);
        assert_eq!(calc.total_capacity().await.unwrap(), 55);
        assert_eq!(calc.queue_limit(55), 82);
        assert_eq!(calc.queue_limit(24), 36);
    }

    #[tokio::test]
    async fn cache_serves_stale_until_invalidated() {
        let (calc, agents, _) = calculator_with_roster(true);
        assert_eq!(calc.team_capacity(Team::TeamA).await.unwrap(), 21);

        // Alice goes off shift; the cached figure survives...
        let alice = agents.get(&"alice-thompson".into()).await.unwrap().unwrap();
        alice.set_shift_flags(false, false);
        assert_eq!(calc.team_capacity(Team::TeamA).await.unwrap(), 21);

        // ...until a writer invalidates the scope.
        calc.invalidate_team(Team::TeamA);
        assert_eq!(calc.team_capacity(Team::TeamA).await.unwrap(), 16);
    }

    #[tokio::test]
    async fn admission_closes_at_the_main_limit_off_hours() {
        let (calc, _, sessions) = calculator_with_roster(true);
        let t0 = chrono::Utc.with_ymd_and_hms(2025, 6, 2, 3, 0, 0).unwrap();
        for i in 0..82 {
            sessions
                .insert(crate::session::ChatSession::queued(
                    format!("u{i}"),
                    t0 + chrono::Duration::seconds(i),
                ))
                .await
                .unwrap();
        }
        // 82 queued against a limit of 82, outside office hours: refused.
        assert!(!calc.can_accept().await.unwrap());
    }

    #[tokio::test]
    async fn inactive_roster_has_no_capacity() {
        let (calc, _, _) = calculator_with_roster(false);
        assert_eq!(calc.total_capacity().await.unwrap(), 0);
        assert!(!calc.can_accept().await.unwrap());
    }

    #[tokio::test]
    async fn office_hours_open_the_overflow_door() {
        let agents = Arc::new(AgentStore::new());
        for agent in starting_roster(10) {
            agent.set_shift_flags(true, true);
            agents.insert(agent);
        }
        let sessions = Arc::new(SessionStore::new());
        // Wednesday 15:00 UTC = 11:00 EDT: office hours.
        let clock = Arc::new(SimulatedClock::new(
            chrono::Utc.with_ymd_and_hms(2025, 6, 4, 15, 0, 0).unwrap(),
        ));
        let calc = CapacityCalculator::new(
            Arc::clone(&agents),
            Arc::clone(&sessions),
            clock,
            &CapacityConfig::default(),
        );

        let t0 = chrono::Utc.with_ymd_and_hms(2025, 6, 4, 14, 0, 0).unwrap();
        for i in 0..82 {
            sessions
                .insert(crate::session::ChatSession::queued(
                    format!("u{i}"),
                    t0 + chrono::Duration::seconds(i),
                ))
                .await
                .unwrap();
        }
        // Main queue at its limit, overflow queue empty: still admitted.
        assert!(calc.can_accept().await.unwrap());

        // Fill the overflow queue to its limit of 36: now refused.
        for i in 0..36 {
            let mut session = crate::session::ChatSession::queued(
                format!("o{i}"),
                t0 + chrono::Duration::seconds(100 + i),
            );
            session.move_to_overflow();
            sessions.insert(session).await.unwrap();
        }
        assert!(!calc.can_accept().await.unwrap());
    }

    #[tokio::test]
    async fn single_agent_team_capacity() {
        let agents = Arc::new(AgentStore::new());
        let agent = Agent::new(
            "solo",
            "Solo Senior",
            Seniority::Senior,
            Team::TeamA,
            ShiftWindow::new((0, 0), (23, 59), ShiftBasis::Utc),
            10,
        );
        agent.set_shift_flags(true, true);
        agents.insert(agent);
        let sessions = Arc::new(SessionStore::new());
        let clock = Arc::new(SimulatedClock::new(
            chrono::Utc.with_ymd_and_hms(2025, 6, 2, 3, 0, 0).unwrap(),
        ));
        let calc = CapacityCalculator::new(agents, sessions, clock, &CapacityConfig::default());
        assert_eq!(calc.total_capacity().await.unwrap(), 8);
        assert_eq!(calc.queue_limit(8), 12);
    }
}
