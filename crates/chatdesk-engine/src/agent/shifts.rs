//! # Shift Management
//!
//! Keeps each agent's `active` and `accepting_new_chats` flags in line with
//! their shift window, and builds the fixed startup roster.
//!
//! The regular teams cover the day in three overlapping UTC windows; the
//! ten minutes of overlap absorb the handoff. The overflow pool works
//! office hours on the US-Eastern clock, the same calendar the overflow
//! queue is served on.
//!
//! | Team     | Window              | Staff                            |
//! |----------|---------------------|----------------------------------|
//! | Team A   | 00:00–08:05 UTC     | 1 TeamLead, 2 MidLevel, 1 Junior |
//! | Team B   | 07:55–16:05 UTC     | 1 Senior, 1 MidLevel, 2 Junior   |
//! | Team C   | 15:55–24:05 UTC     | 2 MidLevel                       |
//! | Overflow | 09:00–17:00 Eastern | 6 Junior                         |

use std::sync::Arc;

use chrono::{DateTime, Timelike, Utc};
use tracing::debug;

use crate::agent::store::AgentStore;
use crate::agent::types::{Agent, Seniority, ShiftBasis, ShiftWindow, Team};
use crate::error::Result;
use crate::routing::hours::BusinessHours;

/// Recomputes shift-derived agent flags from the clock
///
/// `active` means the agent is inside their window; `accepting_new_chats`
/// additionally requires more than the handoff margin before the window
/// closes, so an agent five minutes from shift end finishes their current
/// chats but takes no new ones.
pub struct ShiftManager {
    agents: Arc<AgentStore>,
    handoff_minutes: i64,
}

impl ShiftManager {
    /// Create a shift manager over the store
    pub fn new(agents: Arc<AgentStore>, handoff_minutes: i64) -> Self {
        Self { agents, handoff_minutes }
    }

    /// Refresh `active` / `accepting_new_chats` for every agent
    pub async fn update_status(&self, now: DateTime<Utc>) -> Result<()> {
        let utc_minute = now.time().hour() * 60 + now.time().minute();
        let eastern_minute = BusinessHours::eastern_minute_of_day(now);

        for agent in self.agents.all().await? {
            let minute = match agent.shift.basis {
                ShiftBasis::Utc => utc_minute,
                ShiftBasis::Eastern => eastern_minute,
            };
            let active = agent.shift.contains(minute);
            let accepting = active
                && agent.shift.minutes_until_end(minute) as i64 > self.handoff_minutes;
            agent.set_shift_flags(active, accepting);
            debug!(
                "🔄 Shift status for {}: active={} accepting={}",
                agent.id, active, accepting
            );
        }
        Ok(())
    }
}

/// Build the fixed startup roster
///
/// Agent ids are stable kebab-case slugs of the display names; the roster
/// never changes in-process.
pub fn starting_roster(base_capacity: u32) -> Vec<Agent> {
    let team_a = ShiftWindow::new((0, 0), (8, 5), ShiftBasis::Utc);
    let team_b = ShiftWindow::new((7, 55), (16, 5), ShiftBasis::Utc);
    let team_c = ShiftWindow::new((15, 55), (24, 5), ShiftBasis::Utc);
    let overflow = ShiftWindow::new((9, 0), (17, 0), ShiftBasis::Eastern);

    let mut roster = vec![
        named("Alice Thompson", Seniority::TeamLead, Team::TeamA, team_a, base_capacity),
        named("Bob Wilson", Seniority::MidLevel, Team::TeamA, team_a, base_capacity),
        named("Carol Davis", Seniority::MidLevel, Team::TeamA, team_a, base_capacity),
        named("David Brown", Seniority::Junior, Team::TeamA, team_a, base_capacity),
        named("Emma Johnson", Seniority::Senior, Team::TeamB, team_b, base_capacity),
        named("Frank Miller", Seniority::MidLevel, Team::TeamB, team_b, base_capacity),
        named("Grace Lee", Seniority::Junior, Team::TeamB, team_b, base_capacity),
        named("Henry Chen", Seniority::Junior, Team::TeamB, team_b, base_capacity),
        named("Isabel Rodriguez", Seniority::MidLevel, Team::TeamC, team_c, base_capacity),
        named("Jack Anderson", Seniority::MidLevel, Team::TeamC, team_c, base_capacity),
    ];
    for n in 1..=6 {
        roster.push(named(
            &format!("Overflow Agent {n}"),
            Seniority::Junior,
            Team::Overflow,
            overflow,
            base_capacity,
        ));
    }
    roster
}

fn named(
    display_name: &str,
    seniority: Seniority,
    team: Team,
    shift: ShiftWindow,
    base_capacity: u32,
) -> Agent {
    let id = display_name.to_lowercase().replace(' ', "-");
    Agent::new(id, display_name, seniority, team, shift, base_capacity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    async fn store_with_roster() -> Arc<AgentStore> {
        let store = Arc::new(AgentStore::new());
        for agent in starting_roster(10) {
            store.insert(agent);
        }
        store
    }

    #[tokio::test]
    async fn roster_has_sixteen_agents() {
        let store = store_with_roster().await;
        let all = store.all().await.unwrap();
        assert_eq!(all.len(), 16);
        assert_eq!(
            all.iter().filter(|a| a.team == Team::Overflow).count(),
            6
        );
    }

    #[tokio::test]
    async fn early_morning_activates_team_a_only_among_regulars() {
        let store = store_with_roster().await;
        let manager = ShiftManager::new(Arc::clone(&store), 5);
        // 03:00 UTC on a Wednesday: inside Team A's window only.
        let now = Utc.with_ymd_and_hms(2025, 6, 4, 3, 0, 0).unwrap();
        manager.update_status(now).await.unwrap();

        for agent in store.all().await.unwrap() {
            let expected = matches!(agent.team, Team::TeamA);
            assert_eq!(agent.is_active(), expected, "agent {}", agent.id);
        }
    }

    #[tokio::test]
    async fn handoff_overlap_keeps_both_teams_active() {
        let store = store_with_roster().await;
        let manager = ShiftManager::new(Arc::clone(&store), 5);
        // 08:00 UTC: Team A has 5 minutes left, Team B started at 07:55.
        let now = Utc.with_ymd_and_hms(2025, 6, 4, 8, 0, 0).unwrap();
        manager.update_status(now).await.unwrap();

        let alice = store.get(&"alice-thompson".into()).await.unwrap().unwrap();
        let emma = store.get(&"emma-johnson".into()).await.unwrap().unwrap();
        assert!(alice.is_active());
        // Inside the 5-minute handoff margin: active but not accepting.
        assert!(!alice.is_accepting_new_chats());
        assert!(emma.is_active());
        assert!(emma.is_accepting_new_chats());
    }

    #[tokio::test]
    async fn overflow_follows_eastern_clock() {
        let store = store_with_roster().await;
        let manager = ShiftManager::new(Arc::clone(&store), 5);
        let overflow_agent = store.get(&"overflow-agent-1".into()).await.unwrap().unwrap();

        // 15:00 UTC in June is 11:00 EDT: inside the overflow window.
        let midday = Utc.with_ymd_and_hms(2025, 6, 4, 15, 0, 0).unwrap();
        manager.update_status(midday).await.unwrap();
        assert!(overflow_agent.is_active());
        assert!(overflow_agent.is_accepting_new_chats());

        // 10:00 UTC in June is 06:00 EDT: before opening.
        let early = Utc.with_ymd_and_hms(2025, 6, 4, 10, 0, 0).unwrap();
        manager.update_status(early).await.unwrap();
        assert!(!overflow_agent.is_active());
    }

    #[tokio::test]
    async fn team_c_spillover_past_midnight() {
        let store = store_with_roster().await;
        let manager = ShiftManager::new(Arc::clone(&store), 5);
        let isabel = store.get(&"isabel-rodriguez".into()).await.unwrap().unwrap();

        // 00:03 UTC: Team C's window runs to 24:05.
        let past_midnight = Utc.with_ymd_and_hms(2025, 6, 4, 0, 3, 0).unwrap();
        manager.update_status(past_midnight).await.unwrap();
        assert!(isabel.is_active());
        assert!(!isabel.is_accepting_new_chats());
    }
}
