//! # Agent Store
//!
//! The authoritative in-memory source of agent state. The store owns every
//! agent for the lifetime of the process (the roster is fixed at startup)
//! and hands out shared references; all load mutation goes through the
//! per-agent record so reservation accounting survives concurrent
//! dispatcher and monitor access.
//!
//! ## Reservation discipline
//!
//! Capacity is claimed in two phases. A selector holds a slot with
//! [`Agent::try_reserve`], and the assigner later converts it with
//! [`Agent::confirm_reservation`] or returns it with
//! [`Agent::release_reservation`]. Every reservation is matched by exactly
//! one of the two on every exit path; the invariant
//! `current + reserved <= max_concurrent` holds at all times.
//!
//! ## Examples
//!
//! ```
//! use chatdesk_engine::agent::{Agent, AgentStore, Seniority, ShiftBasis, ShiftWindow, Team};
//!
//! # async fn example() -> chatdesk_engine::Result<()> {
//! let store = AgentStore::new();
//! let agent = Agent::new(
//!     "grace-lee",
//!     "Grace Lee",
//!     Seniority::Junior,
//!     Team::TeamB,
//!     ShiftWindow::new((7, 55), (16, 5), ShiftBasis::Utc),
//!     10,
//! );
//! agent.set_shift_flags(true, true);
//! store.insert(agent);
//!
//! let grace = store.get(&"grace-lee".into()).await?.expect("registered");
//! assert!(grace.try_reserve());
//! assert!(grace.confirm_reservation());
//! assert_eq!(grace.current(), 1);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use dashmap::DashMap;
use tracing::info;

use crate::agent::types::{Agent, AgentId, Team};
use crate::error::Result;

/// In-memory agent store
///
/// Reads return `Arc<Agent>` handles; the handles stay valid for the
/// process lifetime since agents are never destroyed in-process. Store
/// operations are async to keep the persistence seam open even though the
/// in-memory backend never suspends.
pub struct AgentStore {
    agents: DashMap<AgentId, Arc<Agent>>,
}

impl AgentStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self { agents: DashMap::new() }
    }

    /// Register an agent
    ///
    /// Called once per roster entry at startup.
    pub fn insert(&self, agent: Agent) {
        info!("👤 Registering agent: {} ({} / {:?})", agent.display_name, agent.team, agent.seniority);
        self.agents.insert(agent.id.clone(), Arc::new(agent));
    }

    /// Look up an agent by id
    pub async fn get(&self, id: &AgentId) -> Result<Option<Arc<Agent>>> {
        Ok(self.agents.get(id).map(|entry| Arc::clone(entry.value())))
    }

    /// All agents, in stable id order
    pub async fn all(&self) -> Result<Vec<Arc<Agent>>> {
        let mut agents: Vec<_> = self.agents.iter().map(|e| Arc::clone(e.value())).collect();
        agents.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(agents)
    }

    /// Agents on the given team, in stable id order
    pub async fn by_team(&self, team: Team) -> Result<Vec<Arc<Agent>>> {
        let mut agents: Vec<_> = self
            .agents
            .iter()
            .filter(|e| e.value().team == team)
            .map(|e| Arc::clone(e.value()))
            .collect();
        agents.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(agents)
    }

    /// All agents currently inside their shift window
    pub async fn active_agents(&self) -> Result<Vec<Arc<Agent>>> {
        let mut agents: Vec<_> = self
            .agents
            .iter()
            .filter(|e| e.value().is_active())
            .map(|e| Arc::clone(e.value()))
            .collect();
        agents.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(agents)
    }

    /// All agents currently able to take a new chat
    ///
    /// Predicate: `active && accepting_new_chats && current + reserved <
    /// max_concurrent`. The result is a snapshot; final arbitration is the
    /// reservation itself.
    pub async fn accepting_agents(&self) -> Result<Vec<Arc<Agent>>> {
        let mut agents: Vec<_> = self
            .agents
            .iter()
            .filter(|e| e.value().has_open_slot())
            .map(|e| Arc::clone(e.value()))
            .collect();
        agents.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(agents)
    }

    /// Sum of `max_concurrent` over the team's active agents
    pub async fn team_capacity(&self, team: Team) -> Result<u32> {
        Ok(self
            .agents
            .iter()
            .filter(|e| e.value().team == team && e.value().is_active())
            .map(|e| e.value().max_concurrent())
            .sum())
    }

    /// Persist an agent's state
    ///
    /// The in-memory store shares the live record, so this is the
    /// suspension point a future persistent backend would occupy.
    pub async fn update(&self, _agent: &Arc<Agent>) -> Result<()> {
        Ok(())
    }
}

impl Default for AgentStore {
    fn default() -> Self {
        Self::new()
    }
}
