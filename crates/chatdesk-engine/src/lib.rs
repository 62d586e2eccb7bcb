//! # Chatdesk Dispatch Engine
//!
//! An in-memory chat-support dispatch engine: user-initiated chat sessions
//! are queued FIFO, admitted or refused against capacity thresholds, and
//! assigned to support agents with a junior-first, capacity-weighted round
//! robin, while a liveness monitor demotes silent sessions and reclaims
//! agent capacity.
//!
//! ## Overview
//!
//! The engine is built from four tightly coupled subsystems:
//!
//! - **Capacity accounting** with reservation/commit semantics that
//!   survives concurrent assignment ([`agent`], [`routing::capacity`])
//! - **A two-tier queue** (main + overflow) with admission control
//!   ([`session`], [`routing::capacity`])
//! - **A junior-first round-robin selector** across teams and seniority
//!   strata ([`routing::selector`], [`routing::round_robin`])
//! - **A liveness monitor** that inactivates silent sessions and releases
//!   agent slots ([`monitoring`])
//!
//! Two background loops drive the system: the dispatcher drains the
//! queues every 2 seconds and, during office hours (Mon–Fri 09:00–17:00
//! US-Eastern), promotes stranded sessions to the overflow queue; the
//! monitor scans for silent clients every 5 seconds.
//!
//! ## Quick start
//!
//! ```
//! use chatdesk_engine::prelude::*;
//!
//! # async fn example() -> Result<()> {
//! let engine = DispatchEngine::new(DispatchConfig::default(), None).await?;
//! engine.start();
//!
//! let session = engine.create_session("7c9e6679-7425-40de-944b-e07fc1f90ae7").await?;
//! if session.status == SessionStatus::Queued {
//!     println!("queued at position {}", engine.queue_position(&session.id).await?);
//! }
//!
//! // Clients poll about once a second to stay live.
//! engine.poll(&session.id).await?;
//! engine.shutdown();
//! # Ok(())
//! # }
//! ```
//!
//! ## Key modules
//!
//! - [`orchestrator`]: engine wiring, assignment commit, dispatcher loop
//! - [`agent`]: roster, per-agent capacity accounting, shift management
//! - [`session`]: session state machine and the two FIFO queues
//! - [`routing`]: rotation counters, office hours, admission, selection
//! - [`monitoring`]: missed-poll scanning and inactivation
//! - [`api`]: read-only admin views
//! - [`server`]: the axum HTTP surface
//! - [`config`]: configuration tree and validation
//! - [`error`]: error types and the crate-wide `Result`

pub mod agent;
pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod monitoring;
pub mod orchestrator;
pub mod routing;
pub mod server;
pub mod session;

pub use config::DispatchConfig;
pub use error::{DispatchError, Result};
pub use orchestrator::DispatchEngine;
pub use server::{DispatchServer, DispatchServerBuilder};

/// Prelude module for convenient imports
///
/// ```
/// use chatdesk_engine::prelude::*;
/// ```
pub mod prelude {
    //! Commonly used types for dispatch engine applications

    pub use crate::agent::{Agent, AgentId, AgentSnapshot, AgentStore, Seniority, Team};
    pub use crate::api::{AdminApi, QueueStatus};
    pub use crate::clock::{Clock, SimulatedClock, SystemClock};
    pub use crate::config::{
        CapacityConfig, DispatchConfig, DispatcherConfig, GeneralConfig, MonitorConfig,
    };
    pub use crate::error::{DispatchError, Result};
    pub use crate::monitoring::SessionTimeoutService;
    pub use crate::orchestrator::DispatchEngine;
    pub use crate::routing::{AgentSelector, BusinessHours, CapacityCalculator, RoundRobinCoordinator};
    pub use crate::server::{DispatchServer, DispatchServerBuilder};
    pub use crate::session::{ChatSession, SessionId, SessionStatus, SessionStore};

    pub use chrono::{DateTime, Utc};
    pub use uuid::Uuid;
}
