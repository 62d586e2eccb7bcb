//! Core types for chat sessions

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::AgentId;
use crate::error::{DispatchError, Result};

/// Session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Generate a fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Chat session lifecycle status
///
/// `Refused`, `Inactive`, and `Completed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionStatus {
    /// Waiting in the main or overflow queue
    Queued,
    /// Committed to an agent, waiting for the client's first poll
    Assigned,
    /// Client has polled since assignment
    Active,
    /// Abandoned: too many missed polls
    Inactive,
    /// Finished normally
    Completed,
    /// Rejected at admission
    Refused,
}

impl SessionStatus {
    /// Statuses that count as a live session for a user
    pub fn is_live(&self) -> bool {
        matches!(self, SessionStatus::Queued | SessionStatus::Assigned | SessionStatus::Active)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Queued => write!(f, "Queued"),
            SessionStatus::Assigned => write!(f, "Assigned"),
            SessionStatus::Active => write!(f, "Active"),
            SessionStatus::Inactive => write!(f, "Inactive"),
            SessionStatus::Completed => write!(f, "Completed"),
            SessionStatus::Refused => write!(f, "Refused"),
        }
    }
}

/// A user-initiated chat session
///
/// Sessions are value objects: stores replace the whole record on update,
/// and the mutation helpers below keep the state machine honest. At most
/// one live session exists per user at a time; the engine enforces that at
/// admission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    /// Stable identifier
    pub id: SessionId,
    /// Owning user
    pub user_id: String,
    /// Lifecycle status
    pub status: SessionStatus,
    /// Creation instant; the FIFO ordering key
    pub created_at: DateTime<Utc>,
    /// Instant of the assignment commit, if any
    pub assigned_at: Option<DateTime<Utc>>,
    /// Last client poll; initialized to `created_at`
    pub last_polled_at: DateTime<Utc>,
    /// Agent the session was committed to, if any
    pub assigned_agent_id: Option<AgentId>,
    /// Total polls received
    pub poll_count: u64,
    /// Consecutive seconds elapsed without a poll
    pub missed_poll_count: u32,
    /// Waiting in the overflow queue rather than the main queue
    pub is_in_overflow: bool,
}

impl ChatSession {
    /// Create a queued session for the main queue
    pub fn queued(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: SessionId::new(),
            user_id: user_id.into(),
            status: SessionStatus::Queued,
            created_at: now,
            assigned_at: None,
            last_polled_at: now,
            assigned_agent_id: None,
            poll_count: 0,
            missed_poll_count: 0,
            is_in_overflow: false,
        }
    }

    /// Create a session refused at admission
    pub fn refused(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            status: SessionStatus::Refused,
            ..Self::queued(user_id, now)
        }
    }

    /// Commit the session to an agent
    ///
    /// Only a queued session can be assigned; anything else is a capacity
    /// conflict (the session raced into another state between selection
    /// and commit).
    pub fn assign_to_agent(&mut self, agent_id: AgentId, now: DateTime<Utc>) -> Result<()> {
        if self.status != SessionStatus::Queued {
            return Err(DispatchError::capacity_conflict(format!(
                "session {} is {} and cannot be assigned",
                self.id, self.status
            )));
        }
        self.status = SessionStatus::Assigned;
        self.assigned_agent_id = Some(agent_id);
        self.assigned_at = Some(now);
        self.is_in_overflow = false;
        Ok(())
    }

    /// Record a client poll; first poll after assignment activates
    pub fn record_poll(&mut self, now: DateTime<Utc>) {
        self.last_polled_at = now;
        self.poll_count += 1;
        self.missed_poll_count = 0;
        if self.status == SessionStatus::Assigned {
            self.status = SessionStatus::Active;
        }
    }

    /// Transition to `Inactive` after too many missed polls
    pub fn mark_inactive(&mut self) {
        self.status = SessionStatus::Inactive;
    }

    /// Redirect the session to the overflow queue, keeping its wait time
    pub fn move_to_overflow(&mut self) {
        self.is_in_overflow = true;
    }
}
