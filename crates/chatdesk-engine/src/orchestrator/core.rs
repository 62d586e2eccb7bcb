//! Core dispatch engine
//!
//! This module contains the main [`DispatchEngine`] struct that wires the
//! stores, the selection pipeline, and the background loops together, and
//! exposes the in-process public API: session creation, polling, admission
//! checks, and queue introspection.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │           DispatchEngine            │
//! ├─────────────────────────────────────┤
//! │ ┌─────────────┐ ┌─────────────────┐ │
//! │ │ Agent       │ │ Session         │ │
//! │ │ Store       │ │ Store           │ │
//! │ └─────────────┘ └─────────────────┘ │
//! │ ┌─────────────┐ ┌─────────────────┐ │
//! │ │ Capacity    │ │ Agent           │ │
//! │ │ Calculator  │ │ Selector        │ │
//! │ └─────────────┘ └─────────────────┘ │
//! │ ┌─────────────┐ ┌─────────────────┐ │
//! │ │ Dispatcher  │ │ Monitor         │ │
//! │ │ (2s tick)   │ │ (5s tick)       │ │
//! │ └─────────────┘ └─────────────────┘ │
//! └─────────────────────────────────────┘
//! ```
//!
//! # Examples
//!
//! ```
//! use chatdesk_engine::prelude::*;
//!
//! # async fn example() -> Result<()> {
//! let engine = DispatchEngine::new(DispatchConfig::default(), None).await?;
//! engine.start();
//!
//! let session = engine.create_session("7c9e6679-7425-40de-944b-e07fc1f90ae7").await?;
//! println!("session {} is {}", session.id, session.status);
//!
//! engine.poll(&session.id).await?;
//! engine.shutdown();
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use chrono::Duration;
use tokio::sync::watch;
use tracing::info;

use crate::agent::{starting_roster, AgentStore, ShiftManager, Team};
use crate::clock::{Clock, SystemClock};
use crate::config::DispatchConfig;
use crate::error::{DispatchError, Result};
use crate::monitoring::{Monitor, SessionTimeoutService};
use crate::orchestrator::assignment::Assigner;
use crate::orchestrator::dispatcher::Dispatcher;
use crate::routing::capacity::CapacityCalculator;
use crate::routing::round_robin::RoundRobinCoordinator;
use crate::routing::selector::AgentSelector;
use crate::session::{ChatSession, SessionId, SessionStore};

/// Assumed minutes of handling per queued position ahead of a session
const ESTIMATED_HANDLE_MINUTES: i64 = 5;

/// Primary dispatch orchestration engine
///
/// The engine owns the fixed roster, both session queues, and the two
/// background loops. Request handlers call the public API below; the
/// dispatcher and monitor run concurrently against the same shared stores.
pub struct DispatchEngine {
    config: DispatchConfig,
    clock: Arc<dyn Clock>,
    agents: Arc<AgentStore>,
    sessions: Arc<SessionStore>,
    capacity: Arc<CapacityCalculator>,
    dispatcher: Arc<Dispatcher>,
    timeout_service: Arc<SessionTimeoutService>,
    monitor: Arc<Monitor>,
    shutdown: watch::Sender<bool>,
}

impl DispatchEngine {
    /// Create an engine from configuration
    ///
    /// Builds the fixed startup roster, applies the initial shift flags,
    /// and wires every subsystem. Pass a clock to pin time in tests; `None`
    /// uses the system clock. Background loops are not running until
    /// [`start`](Self::start).
    pub async fn new(
        config: DispatchConfig,
        clock: Option<Arc<dyn Clock>>,
    ) -> Result<Arc<Self>> {
        config.validate()?;
        let clock = clock.unwrap_or_else(|| Arc::new(SystemClock));

        let agents = Arc::new(AgentStore::new());
        for agent in starting_roster(config.general.base_capacity) {
            agents.insert(agent);
        }

        let sessions = Arc::new(SessionStore::new());
        let rotation = Arc::new(RoundRobinCoordinator::new());
        let capacity = Arc::new(CapacityCalculator::new(
            Arc::clone(&agents),
            Arc::clone(&sessions),
            Arc::clone(&clock),
            &config.capacity,
        ));
        let selector = Arc::new(AgentSelector::new(Arc::clone(&agents), Arc::clone(&rotation)));
        let assigner = Arc::new(Assigner::new(
            Arc::clone(&sessions),
            Arc::clone(&agents),
            Arc::clone(&capacity),
            Arc::clone(&clock),
            &config.dispatcher,
        ));
        let shift_manager = Arc::new(ShiftManager::new(
            Arc::clone(&agents),
            config.general.shift_handoff_minutes,
        ));
        shift_manager.update_status(clock.now()).await?;

        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&sessions),
            Arc::clone(&agents),
            selector,
            assigner,
            shift_manager,
            Arc::clone(&clock),
            config.dispatcher.clone(),
        ));
        let timeout_service = Arc::new(SessionTimeoutService::new(
            Arc::clone(&sessions),
            Arc::clone(&agents),
            Arc::clone(&clock),
            &config.monitor,
        ));
        let monitor = Arc::new(Monitor::new(Arc::clone(&timeout_service), &config.monitor));

        let (shutdown, _) = watch::channel(false);

        let roster_size = agents.all().await?.len();
        info!("🏁 Dispatch engine initialized with {roster_size} agents");
        Ok(Arc::new(Self {
            config,
            clock,
            agents,
            sessions,
            capacity,
            dispatcher,
            timeout_service,
            monitor,
            shutdown,
        }))
    }

    /// Spawn the dispatcher and monitor loops
    pub fn start(&self) {
        tokio::spawn(Arc::clone(&self.dispatcher).run(self.shutdown.subscribe()));
        tokio::spawn(Arc::clone(&self.monitor).run(self.shutdown.subscribe()));
    }

    /// Signal both loops to stop at their next interval boundary
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Create (or return) the chat session for a user
    ///
    /// Idempotent per user: while a user has a live session, creation
    /// returns that session. Otherwise admission is checked and the
    /// session is created `Queued` on the main queue, or `Refused` when
    /// the queues are at their limits.
    pub async fn create_session(&self, user_id: &str) -> Result<ChatSession> {
        if user_id.trim().is_empty() {
            return Err(DispatchError::invalid_input("userId must not be empty"));
        }

        if let Some(existing) = self.sessions.active_for_user(user_id).await? {
            info!("📞 User {} already has live session {}", user_id, existing.id);
            return Ok(existing);
        }

        let now = self.clock.now();
        let session = if self.capacity.can_accept().await? {
            ChatSession::queued(user_id, now)
        } else {
            info!("🚫 Refusing session for user {}: queues at capacity", user_id);
            ChatSession::refused(user_id, now)
        };
        self.sessions.insert(session.clone()).await?;
        Ok(session)
    }

    /// Record a client poll
    ///
    /// Refreshes liveness, zeroes the missed-poll counter, and promotes an
    /// `Assigned` session to `Active`. Returns `false` for unknown ids.
    pub async fn poll(&self, session_id: &SessionId) -> Result<bool> {
        self.sessions.record_poll(session_id, self.clock.now()).await
    }

    /// Whether a new session would currently be admitted
    pub async fn can_accept(&self) -> Result<bool> {
        self.capacity.can_accept().await
    }

    /// 1-based position in the session's current queue; 0 when not queued
    pub async fn queue_position(&self, session_id: &SessionId) -> Result<usize> {
        let Some(session) = self.sessions.get(session_id).await? else {
            return Ok(0);
        };
        if session.status != crate::session::SessionStatus::Queued {
            return Ok(0);
        }
        let queue = if session.is_in_overflow {
            self.sessions.queued_overflow().await?
        } else {
            self.sessions.queued_main().await?
        };
        Ok(queue
            .iter()
            .position(|s| s.id == session.id)
            .map(|idx| idx + 1)
            .unwrap_or(0))
    }

    /// Estimated wait for a queued session
    ///
    /// `position * 5 minutes / available agents` over the pool that serves
    /// the session's queue; `None` when the session is not queued or the
    /// pool is empty.
    pub async fn estimated_wait(&self, session_id: &SessionId) -> Result<Option<Duration>> {
        let position = self.queue_position(session_id).await?;
        if position == 0 {
            return Ok(None);
        }
        let session = self
            .sessions
            .get(session_id)
            .await?
            .ok_or_else(|| DispatchError::not_found(format!("session {session_id}")))?;

        let pool = self.agents.accepting_agents().await?;
        let available = pool
            .iter()
            .filter(|a| {
                if session.is_in_overflow {
                    a.team == Team::Overflow
                } else {
                    a.team != Team::Overflow
                }
            })
            .count();
        if available == 0 {
            return Ok(None);
        }
        Ok(Some(
            Duration::minutes(position as i64 * ESTIMATED_HANDLE_MINUTES) / available as i32,
        ))
    }

    /// The engine's session store
    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// The engine's agent store
    pub fn agents(&self) -> &Arc<AgentStore> {
        &self.agents
    }

    /// The engine's capacity calculator
    pub fn capacity(&self) -> &Arc<CapacityCalculator> {
        &self.capacity
    }

    /// The dispatcher task, for driving ticks by hand
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// The timeout service, for driving monitor passes by hand
    pub fn timeout_service(&self) -> &Arc<SessionTimeoutService> {
        &self.timeout_service
    }

    /// The engine's configuration
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// The engine's clock
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}
