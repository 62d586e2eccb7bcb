//! # Agent Selection
//!
//! Picks agents for queued sessions with a junior-first, capacity-weighted
//! round robin. Selection never commits anything: the batch optimizer
//! holds a reservation on every agent it emits, and the caller must either
//! commit the pair through the assigner or release the reservation.
//!
//! ## Selection order
//!
//! 1. **Across teams**: rotate through Team A, Team B, Team C on the
//!    shared team counter, so no team becomes the default dumping ground.
//! 2. **Within a team**: walk seniorities junior-first (Junior, MidLevel,
//!    Senior, TeamLead) and stop at the first cohort with free capacity.
//!    Juniors absorb load before seniors are touched.
//! 3. **Within a cohort**: take the agents tied at the highest free
//!    capacity and rotate among them on the cohort counter.
//!
//! The overflow pool bypasses the team rotation: overflow sessions are
//! only ever offered to the Overflow team.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::agent::{Agent, AgentStore, Seniority, Team};
use crate::error::Result;
use crate::routing::round_robin::RoundRobinCoordinator;
use crate::session::ChatSession;

/// A session/agent pairing produced by the batch optimizer
///
/// The agent carries one reservation held on the session's behalf; the
/// pair must be committed or the reservation released.
pub struct AssignmentPlan {
    /// The queued session to place
    pub session: ChatSession,
    /// The reserved agent
    pub agent: Arc<Agent>,
}

/// Junior-first round-robin agent selector
pub struct AgentSelector {
    agents: Arc<AgentStore>,
    rotation: Arc<RoundRobinCoordinator>,
}

impl AgentSelector {
    /// Create a selector over the store and rotation counters
    pub fn new(agents: Arc<AgentStore>, rotation: Arc<RoundRobinCoordinator>) -> Self {
        Self { agents, rotation }
    }

    /// Pick a single agent without reserving
    ///
    /// With `use_overflow` the pick rotates across the Overflow pool.
    /// Otherwise the team rotation chooses one of the three regular teams
    /// and the junior-first walk picks within it; a team with no free
    /// agent yields `None` (the batch optimizer, not this method, probes
    /// alternate teams).
    pub async fn select_next(&self, use_overflow: bool) -> Result<Option<Arc<Agent>>> {
        if use_overflow {
            let pool = self.agents.by_team(Team::Overflow).await?;
            let candidates: Vec<Arc<Agent>> =
                pool.into_iter().filter(|a| a.has_open_slot()).collect();
            if candidates.is_empty() {
                return Ok(None);
            }
            let idx = self
                .rotation
                .next(&RoundRobinCoordinator::team_key(Team::Overflow), candidates.len())?;
            return Ok(Some(Arc::clone(&candidates[idx])));
        }

        // Cross-team rotation deliberately shares Team A's key.
        let idx = self
            .rotation
            .next(&RoundRobinCoordinator::team_key(Team::TeamA), Team::ROTATION.len())?;
        let team = Team::ROTATION[idx];
        let bucket: Vec<Arc<Agent>> = self
            .agents
            .by_team(team)
            .await?
            .into_iter()
            .filter(|a| a.has_open_slot())
            .collect();
        self.walk_bucket(team, &bucket)
    }

    /// Map a batch of sessions onto reserved agents
    ///
    /// Sessions are offered in the given (FIFO) order. For each session up
    /// to three teams are probed starting at the local rotation index; the
    /// first team whose walk yields a candidate gets a reservation attempt.
    /// A failed reservation drops the session from this batch; the agent
    /// pool will have moved on by the next tick anyway.
    pub fn create_optimal_assignments(
        &self,
        sessions: &[ChatSession],
        agents: &[Arc<Agent>],
    ) -> Result<Vec<AssignmentPlan>> {
        let buckets = Self::bucket_accepting(agents);
        let mut team_index = 0usize;
        let mut plans = Vec::new();

        for session in sessions {
            for offset in 0..Team::ROTATION.len() {
                let picked = (team_index + offset) % Team::ROTATION.len();
                let team = Team::ROTATION[picked];
                let Some(bucket) = buckets.get(&team) else {
                    continue;
                };
                let Some(agent) = self.walk_bucket(team, bucket)? else {
                    continue;
                };
                if agent.try_reserve() {
                    debug!("🔒 Reserved {} on {} for session {}", agent.id, team, session.id);
                    plans.push(AssignmentPlan { session: session.clone(), agent });
                    team_index = (picked + 1) % Team::ROTATION.len();
                } else {
                    debug!(
                        "⏭️ Reservation on {} lost for session {}; deferring to next tick",
                        agent.id, session.id
                    );
                }
                // Reserved or lost the race: either way this session is done
                // for the batch.
                break;
            }
        }

        if !plans.is_empty() {
            info!("📤 Batch optimizer paired {} of {} sessions", plans.len(), sessions.len());
        }
        Ok(plans)
    }

    /// Map a batch of overflow sessions onto reserved Overflow agents
    pub fn create_overflow_assignments(
        &self,
        sessions: &[ChatSession],
        agents: &[Arc<Agent>],
    ) -> Result<Vec<AssignmentPlan>> {
        let bucket: Vec<Arc<Agent>> = agents
            .iter()
            .filter(|a| a.team == Team::Overflow && a.has_open_slot())
            .map(Arc::clone)
            .collect();
        let mut plans = Vec::new();

        for session in sessions {
            let Some(agent) = self.walk_bucket(Team::Overflow, &bucket)? else {
                break;
            };
            if agent.try_reserve() {
                debug!("🔒 Reserved {} for overflow session {}", agent.id, session.id);
                plans.push(AssignmentPlan { session: session.clone(), agent });
            }
        }
        Ok(plans)
    }

    /// Junior-first walk with top-capacity tie-break rotation
    fn walk_bucket(&self, team: Team, bucket: &[Arc<Agent>]) -> Result<Option<Arc<Agent>>> {
        for seniority in Seniority::WALK_ORDER {
            // Snapshot availability once so the max and the tie-break agree.
            let cohort: Vec<(&Arc<Agent>, u32)> = bucket
                .iter()
                .filter(|a| a.seniority == seniority)
                .map(|a| (a, a.available()))
                .filter(|(_, available)| *available > 0)
                .collect();
            if cohort.is_empty() {
                continue;
            }

            let best = cohort.iter().map(|(_, a)| *a).max().unwrap_or(0);
            let top: Vec<&Arc<Agent>> = cohort
                .into_iter()
                .filter(|(_, available)| *available == best)
                .map(|(agent, _)| agent)
                .collect();
            let idx = self
                .rotation
                .next(&RoundRobinCoordinator::seniority_key(team, seniority), top.len())?;
            return Ok(Some(Arc::clone(top[idx])));
        }
        Ok(None)
    }

    fn bucket_accepting(agents: &[Arc<Agent>]) -> HashMap<Team, Vec<Arc<Agent>>> {
        let mut buckets: HashMap<Team, Vec<Arc<Agent>>> = HashMap::new();
        for agent in agents.iter().filter(|a| a.has_open_slot()) {
            buckets.entry(agent.team).or_default().push(Arc::clone(agent));
        }
        buckets
    }
}
