//! # Assignment Commit
//!
//! Converts a selector pairing into a committed assignment: re-check the
//! agent, move the session from `Queued` to `Assigned`, consume the
//! reservation, persist both records, and invalidate the capacity caches.
//!
//! The commit is written so a reservation can never leak: every failure
//! path either leaves the reservation for the caller to release or (on a
//! persistence retry) releases it here. A session that fails to commit
//! keeps its queue position and is offered again on a later tick.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::agent::{Agent, AgentStore};
use crate::clock::Clock;
use crate::config::DispatcherConfig;
use crate::error::{DispatchError, Result};
use crate::routing::capacity::CapacityCalculator;
use crate::session::{ChatSession, SessionStore};

/// Commits selector pairings against the stores
pub struct Assigner {
    sessions: Arc<SessionStore>,
    agents: Arc<AgentStore>,
    capacity: Arc<CapacityCalculator>,
    clock: Arc<dyn Clock>,
    retries: u32,
    backoff_base_ms: u64,
}

impl Assigner {
    /// Create an assigner over the stores
    pub fn new(
        sessions: Arc<SessionStore>,
        agents: Arc<AgentStore>,
        capacity: Arc<CapacityCalculator>,
        clock: Arc<dyn Clock>,
        config: &DispatcherConfig,
    ) -> Self {
        Self {
            sessions,
            agents,
            capacity,
            clock,
            retries: config.assignment_retries,
            backoff_base_ms: config.retry_backoff_base_ms,
        }
    }

    /// Try to commit `session` onto `agent`
    ///
    /// Returns `Ok(true)` on commit. `Ok(false)` means the pairing fell
    /// through (capacity raced away or the session left the queue) and
    /// the caller must release the reservation it holds. Transient
    /// persistence failures are retried with linear backoff before giving
    /// up.
    pub async fn try_assign(&self, session: &ChatSession, agent: &Arc<Agent>) -> Result<bool> {
        // The selector's reservation is ours, so the re-check must not be
        // defeated by it: can_accept ignores reserved capacity.
        if !agent.can_accept() {
            info!("⏭️ Agent {} can no longer accept; session {} stays queued", agent.id, session.id);
            return Ok(false);
        }

        // Work on a fresh copy; the store applies it wholesale on success.
        let Some(mut updated) = self.sessions.get(&session.id).await? else {
            warn!("⏭️ Session {} vanished before assignment", session.id);
            return Ok(false);
        };
        match updated.assign_to_agent(agent.id.clone(), self.clock.now()) {
            Ok(()) => {}
            Err(DispatchError::CapacityConflict(reason)) => {
                info!("⏭️ {reason}");
                return Ok(false);
            }
            Err(other) => return Err(other),
        }

        // Consume the reservation; fall back to a direct grab when the
        // reservation was lost (e.g. released by a cleanup pass).
        if !agent.confirm_reservation() && !agent.assign_direct() {
            info!("⏭️ Capacity on {} gone before commit; session {} stays queued", agent.id, session.id);
            return Ok(false);
        }

        if !self.persist(&updated, agent).await? {
            return Ok(false);
        }

        self.capacity.invalidate_team(agent.team);
        self.capacity.invalidate_total();

        info!(
            "✅ Session {} assigned to {} ({} current, {} reserved)",
            updated.id,
            agent.id,
            agent.current(),
            agent.reserved()
        );
        Ok(true)
    }

    /// Persist session then agent, retrying transient failures
    async fn persist(&self, session: &ChatSession, agent: &Arc<Agent>) -> Result<bool> {
        for attempt in 1..=self.retries {
            let outcome = async {
                self.sessions.update(session.clone()).await?;
                self.agents.update(agent).await?;
                Ok::<(), DispatchError>(())
            }
            .await;

            match outcome {
                Ok(()) => return Ok(true),
                Err(DispatchError::Transient(reason)) => {
                    warn!(
                        "⚠️ Persisting assignment of {} failed (attempt {attempt}/{}): {reason}",
                        session.id, self.retries
                    );
                    agent.release_reservation();
                    tokio::time::sleep(std::time::Duration::from_millis(
                        self.backoff_base_ms * attempt as u64,
                    ))
                    .await;
                }
                Err(fatal) => {
                    agent.release_reservation();
                    return Err(fatal);
                }
            }
        }
        error!("❌ Giving up on persisting assignment of {}; session stays queued", session.id);
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{Seniority, ShiftBasis, ShiftWindow, Team};
    use crate::clock::SimulatedClock;
    use crate::config::CapacityConfig;
    use crate::session::SessionStatus;
    use chrono::TimeZone;

    struct Fixture {
        sessions: Arc<SessionStore>,
        agents: Arc<AgentStore>,
        assigner: Assigner,
    }

    fn fixture() -> Fixture {
        let sessions = Arc::new(SessionStore::new());
        let agents = Arc::new(AgentStore::new());
        let clock: Arc<dyn Clock> = Arc::new(SimulatedClock::new(
            chrono::Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap(),
        ));
        let capacity = Arc::new(CapacityCalculator::new(
            Arc::clone(&agents),
            Arc::clone(&sessions),
            Arc::clone(&clock),
            &CapacityConfig::default(),
        ));
        let assigner = Assigner::new(
            Arc::clone(&sessions),
            Arc::clone(&agents),
            capacity,
            clock,
            &DispatcherConfig::default(),
        );
        Fixture { sessions, agents, assigner }
    }

    fn on_shift_junior(id: &str) -> Agent {
        let agent = Agent::new(
            id,
            id,
            Seniority::Junior,
            Team::TeamA,
            ShiftWindow::new((0, 0), (23, 59), ShiftBasis::Utc),
            10,
        );
        agent.set_shift_flags(true, true);
        agent
    }

    #[tokio::test]
    async fn reserved_commit_moves_the_slot() {
        let fx = fixture();
        fx.agents.insert(on_shift_junior("j"));
        let agent = fx.agents.get(&"j".into()).await.unwrap().unwrap();
        assert!(agent.try_reserve());

        let session = ChatSession::queued("u1", chrono::Utc::now());
        fx.sessions.insert(session.clone()).await.unwrap();

        assert!(fx.assigner.try_assign(&session, &agent).await.unwrap());
        assert_eq!((agent.current(), agent.reserved()), (1, 0));

        let committed = fx.sessions.get(&session.id).await.unwrap().unwrap();
        assert_eq!(committed.status, SessionStatus::Assigned);
        assert_eq!(committed.assigned_agent_id, Some("j".into()));
        assert!(committed.assigned_at.is_some());
    }

    #[tokio::test]
    async fn non_queued_session_fails_commit() {
        let fx = fixture();
        fx.agents.insert(on_shift_junior("j"));
        let agent = fx.agents.get(&"j".into()).await.unwrap().unwrap();
        assert!(agent.try_reserve());

        let mut session = ChatSession::queued("u1", chrono::Utc::now());
        session.mark_inactive();
        fx.sessions.insert(session.clone()).await.unwrap();

        assert!(!fx.assigner.try_assign(&session, &agent).await.unwrap());
        // The commit path does not consume the reservation on failure.
        assert_eq!((agent.current(), agent.reserved()), (0, 1));
        agent.release_reservation();
    }

    #[tokio::test]
    async fn off_shift_agent_fails_recheck() {
        let fx = fixture();
        fx.agents.insert(on_shift_junior("j"));
        let agent = fx.agents.get(&"j".into()).await.unwrap().unwrap();
        assert!(agent.try_reserve());
        agent.set_shift_flags(false, false);

        let session = ChatSession::queued("u1", chrono::Utc::now());
        fx.sessions.insert(session.clone()).await.unwrap();

        assert!(!fx.assigner.try_assign(&session, &agent).await.unwrap());
        let untouched = fx.sessions.get(&session.id).await.unwrap().unwrap();
        assert_eq!(untouched.status, SessionStatus::Queued);
    }

    #[tokio::test]
    async fn direct_assignment_covers_a_lost_reservation() {
        let fx = fixture();
        fx.agents.insert(on_shift_junior("j"));
        let agent = fx.agents.get(&"j".into()).await.unwrap().unwrap();
        // No reservation held: the commit falls back to assign_direct.
        let session = ChatSession::queued("u1", chrono::Utc::now());
        fx.sessions.insert(session.clone()).await.unwrap();

        assert!(fx.assigner.try_assign(&session, &agent).await.unwrap());
        assert_eq!((agent.current(), agent.reserved()), (1, 0));
    }
}
