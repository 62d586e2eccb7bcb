//! # Admin API
//!
//! Read-only snapshots of store contents for supervisors and the HTTP
//! admin routes. Everything here observes; nothing mutates.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agent::{AgentSnapshot, Team};
use crate::error::Result;
use crate::orchestrator::DispatchEngine;
use crate::routing::BusinessHours;
use crate::session::{ChatSession, SessionStatus};

/// Snapshot of both queues and the capacity picture
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatus {
    /// Sessions waiting in the main queue
    pub queue_length: usize,
    /// Sessions waiting in the overflow queue
    pub overflow_queue_length: usize,
    /// Admission limit of the main queue
    pub main_queue_limit: usize,
    /// Admission limit of the overflow queue
    pub overflow_queue_limit: usize,
    /// Combined capacity of the three regular teams
    pub total_capacity: u32,
    /// Capacity of the overflow team
    pub overflow_capacity: u32,
    /// Whether overflow service is currently open
    pub is_office_hours: bool,
    /// Per-agent load at snapshot time
    pub agents: Vec<AgentSnapshot>,
    /// Snapshot instant
    pub timestamp: DateTime<Utc>,
}

/// Read-only administrative views over a running engine
pub struct AdminApi {
    engine: Arc<DispatchEngine>,
}

impl AdminApi {
    /// Create the admin API over an engine
    pub fn new(engine: Arc<DispatchEngine>) -> Self {
        Self { engine }
    }

    /// Every session in the store, newest first
    pub async fn sessions(&self) -> Result<Vec<ChatSession>> {
        self.engine.sessions().all().await
    }

    /// Sessions that are queued, assigned, or active
    pub async fn active_sessions(&self) -> Result<Vec<ChatSession>> {
        let mut live = self.engine.sessions().active_for_monitoring().await?;
        live.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(live)
    }

    /// Sessions inactivated by the liveness monitor
    pub async fn inactive_sessions(&self) -> Result<Vec<ChatSession>> {
        self.engine.sessions().by_status(SessionStatus::Inactive).await
    }

    /// Queue lengths, limits, and per-agent load
    pub async fn queue_status(&self) -> Result<QueueStatus> {
        let capacity = self.engine.capacity();
        let total_capacity = capacity.total_capacity().await?;
        let overflow_capacity = capacity.team_capacity(Team::Overflow).await?;
        let mut agents = Vec::new();
        for agent in self.engine.agents().all().await? {
            agents.push(agent.snapshot());
        }

        Ok(QueueStatus {
            queue_length: self.engine.sessions().queue_length().await?,
            overflow_queue_length: self.engine.sessions().overflow_queue_length().await?,
            main_queue_limit: capacity.queue_limit(total_capacity),
            overflow_queue_limit: capacity.queue_limit(overflow_capacity),
            total_capacity,
            overflow_capacity,
            is_office_hours: BusinessHours::is_office_hours(self.engine.clock().now()),
            agents,
            timestamp: self.engine.clock().now(),
        })
    }
}
