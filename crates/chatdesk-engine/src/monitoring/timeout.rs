//! # Session Timeout Service
//!
//! Watches every live session for client-side liveness. A client is
//! expected to poll about once per second; each scan raises the
//! missed-poll counter of a silent session to the number of whole seconds
//! since its last poll, and a session that reaches the threshold (three)
//! is inactivated. If the session had a committed assignment, the agent's
//! slot is released so the capacity returns to the pool.
//!
//! The staleness check and the counter update share the session's critical
//! section, so a racing poll either resets before the update or resets the
//! update itself; either way a live client never drifts toward
//! inactivation.

use std::sync::Arc;

use chrono::Duration;
use tracing::{info, warn};

use crate::agent::AgentStore;
use crate::clock::Clock;
use crate::config::MonitorConfig;
use crate::error::Result;
use crate::session::SessionStore;

/// Staleness scan and inactivation pass
pub struct SessionTimeoutService {
    sessions: Arc<SessionStore>,
    agents: Arc<AgentStore>,
    clock: Arc<dyn Clock>,
    stale_after: Duration,
    threshold: u32,
}

impl SessionTimeoutService {
    /// Create the service over the stores
    pub fn new(
        sessions: Arc<SessionStore>,
        agents: Arc<AgentStore>,
        clock: Arc<dyn Clock>,
        config: &MonitorConfig,
    ) -> Self {
        Self {
            sessions,
            agents,
            clock,
            stale_after: Duration::seconds(config.expected_poll_interval_secs),
            threshold: config.missed_poll_threshold,
        }
    }

    /// One monitoring pass: bump stale counters, then inactivate the dead
    pub async fn process_timeouts(&self) -> Result<()> {
        self.increment_missed_for_stale().await?;
        self.inactivate_timed_out().await
    }

    /// Bump the missed-poll counter of every stale live session
    async fn increment_missed_for_stale(&self) -> Result<()> {
        let now = self.clock.now();
        for session in self.sessions.active_for_monitoring().await? {
            self.sessions
                .increment_missed_if_stale(&session.id, now, self.stale_after)
                .await?;
        }
        Ok(())
    }

    /// Inactivate every live session past the missed-poll threshold
    ///
    /// Queued, assigned, and active sessions are all eligible: a queued
    /// client that stopped polling has abandoned the chat just as surely
    /// as an assigned one. Only committed assignments release a slot.
    async fn inactivate_timed_out(&self) -> Result<()> {
        let expired: Vec<_> = self
            .sessions
            .active_for_monitoring()
            .await?
            .into_iter()
            .filter(|s| s.missed_poll_count >= self.threshold)
            .collect();

        for session in expired {
            let Some(finalized) = self.sessions.mark_inactive(&session.id).await? else {
                // A poll or another pass won the race; nothing to release.
                continue;
            };
            warn!(
                "⏰ Session {} inactivated after {} missed polls",
                finalized.id, finalized.missed_poll_count
            );

            if let Some(agent_id) = finalized.assigned_agent_id.clone() {
                match self.agents.get(&agent_id).await? {
                    Some(agent) => {
                        if agent.complete_chat() {
                            info!(
                                "🔓 Released a slot on {} ({} chats remain)",
                                agent.id,
                                agent.current()
                            );
                        }
                        self.agents.update(&agent).await?;
                    }
                    None => warn!("⚠️ Assigned agent {agent_id} not found during release"),
                }
            }
            self.sessions.update(finalized).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{Agent, Seniority, ShiftBasis, ShiftWindow, Team};
    use crate::clock::SimulatedClock;
    use crate::session::{ChatSession, SessionStatus};
    use chrono::TimeZone;

    fn t0() -> chrono::DateTime<chrono::Utc> {
        chrono::Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap()
    }

    struct Fixture {
        sessions: Arc<SessionStore>,
        agents: Arc<AgentStore>,
        clock: Arc<SimulatedClock>,
        service: SessionTimeoutService,
    }

    fn fixture() -> Fixture {
        let sessions = Arc::new(SessionStore::new());
        let agents = Arc::new(AgentStore::new());
        let clock = Arc::new(SimulatedClock::new(t0()));
        let service = SessionTimeoutService::new(
            Arc::clone(&sessions),
            Arc::clone(&agents),
            clock.clone() as Arc<dyn Clock>,
            &MonitorConfig::default(),
        );
        Fixture { sessions, agents, clock, service }
    }

    #[tokio::test]
    async fn unpolled_session_dies_after_three_passes() {
        let fx = fixture();
        let session = ChatSession::queued("u1", t0());
        let id = session.id;
        fx.sessions.insert(session).await.unwrap();

        for _ in 0..2 {
            fx.clock.advance(Duration::seconds(1));
            fx.service.process_timeouts().await.unwrap();
            let live = fx.sessions.get(&id).await.unwrap().unwrap();
            assert_eq!(live.status, SessionStatus::Queued);
        }

        fx.clock.advance(Duration::seconds(1));
        fx.service.process_timeouts().await.unwrap();
        let dead = fx.sessions.get(&id).await.unwrap().unwrap();
        assert_eq!(dead.status, SessionStatus::Inactive);
        assert_eq!(dead.missed_poll_count, 3);
    }

    #[tokio::test]
    async fn polling_resets_the_countdown() {
        let fx = fixture();
        let session = ChatSession::queued("u1", t0());
        let id = session.id;
        fx.sessions.insert(session).await.unwrap();

        for _ in 0..5 {
            fx.clock.advance(Duration::seconds(1));
            fx.service.process_timeouts().await.unwrap();
            fx.sessions.record_poll(&id, fx.clock.now()).await.unwrap();
        }
        let live = fx.sessions.get(&id).await.unwrap().unwrap();
        assert_eq!(live.status, SessionStatus::Queued);
        assert_eq!(live.missed_poll_count, 0);
    }

    #[tokio::test]
    async fn inactivation_releases_the_assigned_slot() {
        let fx = fixture();
        let agent = Agent::new(
            "j",
            "j",
            Seniority::Junior,
            Team::TeamA,
            ShiftWindow::new((0, 0), (23, 59), ShiftBasis::Utc),
            10,
        );
        agent.set_shift_flags(true, true);
        assert!(agent.assign_direct());
        fx.agents.insert(agent);

        let mut session = ChatSession::queued("u1", t0());
        session.assign_to_agent("j".into(), t0()).unwrap();
        let id = session.id;
        fx.sessions.insert(session).await.unwrap();

        // Three silent seconds are three missed polls: one pass suffices.
        fx.clock.advance(Duration::seconds(3));
        fx.service.process_timeouts().await.unwrap();

        let dead = fx.sessions.get(&id).await.unwrap().unwrap();
        assert_eq!(dead.status, SessionStatus::Inactive);
        let agent = fx.agents.get(&"j".into()).await.unwrap().unwrap();
        assert_eq!(agent.current(), 0);
    }

    #[tokio::test]
    async fn queued_session_releases_no_slot() {
        let fx = fixture();
        let session = ChatSession::queued("u1", t0());
        let id = session.id;
        fx.sessions.insert(session).await.unwrap();

        fx.clock.advance(Duration::seconds(5));
        fx.service.process_timeouts().await.unwrap();
        let dead = fx.sessions.get(&id).await.unwrap().unwrap();
        assert_eq!(dead.status, SessionStatus::Inactive);
        assert!(dead.assigned_agent_id.is_none());
    }

    #[tokio::test]
    async fn terminal_sessions_are_ignored() {
        let fx = fixture();
        let session = ChatSession::refused("u1", t0());
        let id = session.id;
        fx.sessions.insert(session).await.unwrap();

        fx.clock.advance(Duration::seconds(10));
        fx.service.process_timeouts().await.unwrap();
        let untouched = fx.sessions.get(&id).await.unwrap().unwrap();
        assert_eq!(untouched.status, SessionStatus::Refused);
        assert_eq!(untouched.missed_poll_count, 0);
    }
}
