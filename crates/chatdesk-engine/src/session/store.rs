//! # Session Store
//!
//! In-memory store of chat sessions plus the two FIFO queue views. The
//! main queue holds queued sessions with `is_in_overflow == false`, the
//! overflow queue those redirected to the overflow team; both are ordered
//! by `created_at`, so a session moved to overflow keeps its original wait
//! time.
//!
//! Updates are whole-object replacements. The poll and staleness mutations
//! run under the per-session map entry, which gives each session its own
//! critical section against the concurrent dispatcher and monitor loops.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tracing::info;

use crate::error::Result;
use crate::session::types::{ChatSession, SessionId, SessionStatus};

/// In-memory session store with derived FIFO queue views
pub struct SessionStore {
    sessions: DashMap<SessionId, ChatSession>,
}

impl SessionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self { sessions: DashMap::new() }
    }

    /// Insert a session; a queued session thereby joins its FIFO
    pub async fn insert(&self, session: ChatSession) -> Result<()> {
        if session.status == SessionStatus::Queued {
            info!(
                "📞 Enqueuing session {} for user {} ({})",
                session.id,
                session.user_id,
                if session.is_in_overflow { "overflow" } else { "main" }
            );
        }
        self.sessions.insert(session.id, session);
        Ok(())
    }

    /// Replace a session wholesale
    pub async fn update(&self, session: ChatSession) -> Result<()> {
        self.sessions.insert(session.id, session);
        Ok(())
    }

    /// Look up a session by id
    pub async fn get(&self, id: &SessionId) -> Result<Option<ChatSession>> {
        Ok(self.sessions.get(id).map(|entry| entry.value().clone()))
    }

    /// The user's live session, if any
    ///
    /// Live means `Queued`, `Assigned`, or `Active`; at most one exists
    /// per user at a time.
    pub async fn active_for_user(&self, user_id: &str) -> Result<Option<ChatSession>> {
        Ok(self
            .sessions
            .iter()
            .find(|entry| entry.value().user_id == user_id && entry.value().status.is_live())
            .map(|entry| entry.value().clone()))
    }

    /// All sessions with the given status
    pub async fn by_status(&self, status: SessionStatus) -> Result<Vec<ChatSession>> {
        Ok(self
            .sessions
            .iter()
            .filter(|entry| entry.value().status == status)
            .map(|entry| entry.value().clone())
            .collect())
    }

    /// All sessions, newest first
    pub async fn all(&self) -> Result<Vec<ChatSession>> {
        let mut sessions: Vec<_> = self.sessions.iter().map(|e| e.value().clone()).collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }

    /// Main-queue sessions in FIFO order
    pub async fn queued_main(&self) -> Result<Vec<ChatSession>> {
        Ok(self.queued_view(false))
    }

    /// Overflow-queue sessions in FIFO order
    pub async fn queued_overflow(&self) -> Result<Vec<ChatSession>> {
        Ok(self.queued_view(true))
    }

    /// Number of sessions waiting in the main queue
    pub async fn queue_length(&self) -> Result<usize> {
        Ok(self
            .sessions
            .iter()
            .filter(|e| e.value().status == SessionStatus::Queued && !e.value().is_in_overflow)
            .count())
    }

    /// Number of sessions waiting in the overflow queue
    pub async fn overflow_queue_length(&self) -> Result<usize> {
        Ok(self
            .sessions
            .iter()
            .filter(|e| e.value().status == SessionStatus::Queued && e.value().is_in_overflow)
            .count())
    }

    /// Assigned or active sessions that have exhausted their missed polls
    pub async fn timed_out(&self, threshold: u32) -> Result<Vec<ChatSession>> {
        Ok(self
            .sessions
            .iter()
            .filter(|e| {
                matches!(
                    e.value().status,
                    SessionStatus::Assigned | SessionStatus::Active
                ) && e.value().missed_poll_count >= threshold
            })
            .map(|e| e.value().clone())
            .collect())
    }

    /// Sessions the liveness monitor watches: queued, assigned, or active
    pub async fn active_for_monitoring(&self) -> Result<Vec<ChatSession>> {
        Ok(self
            .sessions
            .iter()
            .filter(|e| e.value().status.is_live())
            .map(|e| e.value().clone())
            .collect())
    }

    /// Record a client poll under the session's critical section
    ///
    /// Resets the missed-poll counter, bumps the poll count, and promotes
    /// `Assigned` to `Active`. Returns `false` when the session is unknown.
    pub async fn record_poll(&self, id: &SessionId, now: DateTime<Utc>) -> Result<bool> {
        match self.sessions.get_mut(id) {
            Some(mut entry) => {
                entry.value_mut().record_poll(now);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Raise the missed-poll counter if the session has gone stale
    ///
    /// A missed poll is one full expected-poll interval elapsed since
    /// `last_polled_at`, so the counter is raised to the number of whole
    /// stale intervals (a scan arriving late counts every second of
    /// silence, not one). The staleness check and the update form one
    /// critical section per session: a concurrent poll either lands before
    /// (and resets a counter this call never raises) or after (and resets
    /// the raise). Returns the counter after the call, or `None` for
    /// unknown or non-monitored sessions.
    pub async fn increment_missed_if_stale(
        &self,
        id: &SessionId,
        now: DateTime<Utc>,
        stale_after: Duration,
    ) -> Result<Option<u32>> {
        match self.sessions.get_mut(id) {
            Some(mut entry) => {
                let session = entry.value_mut();
                if !session.status.is_live() {
                    return Ok(None);
                }
                let elapsed = now.signed_duration_since(session.last_polled_at);
                if elapsed >= stale_after {
                    let intervals =
                        (elapsed.num_milliseconds() / stale_after.num_milliseconds()) as u32;
                    session.missed_poll_count = session.missed_poll_count.max(intervals);
                }
                Ok(Some(session.missed_poll_count))
            }
            None => Ok(None),
        }
    }

    /// Inactivate a session, returning the final record
    ///
    /// No-ops (returning `None`) when the session is unknown or already
    /// terminal, so a racing poll-driven transition is never clobbered.
    pub async fn mark_inactive(&self, id: &SessionId) -> Result<Option<ChatSession>> {
        match self.sessions.get_mut(id) {
            Some(mut entry) => {
                let session = entry.value_mut();
                if !session.status.is_live() {
                    return Ok(None);
                }
                session.mark_inactive();
                Ok(Some(session.clone()))
            }
            None => Ok(None),
        }
    }

    /// Redirect a still-queued main-queue session to the overflow queue
    ///
    /// Returns `false` when the session is no longer queued in the main
    /// queue (assigned or inactivated since it was listed).
    pub async fn move_to_overflow(&self, id: &SessionId) -> Result<bool> {
        match self.sessions.get_mut(id) {
            Some(mut entry) => {
                let session = entry.value_mut();
                if session.status != SessionStatus::Queued || session.is_in_overflow {
                    return Ok(false);
                }
                session.move_to_overflow();
                info!("📋 Session {} moved to overflow queue", id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn queued_view(&self, overflow: bool) -> Vec<ChatSession> {
        let mut queued: Vec<_> = self
            .sessions
            .iter()
            .filter(|e| {
                e.value().status == SessionStatus::Queued && e.value().is_in_overflow == overflow
            })
            .map(|e| e.value().clone())
            .collect();
        queued.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.0.cmp(&b.id.0)));
        queued
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
