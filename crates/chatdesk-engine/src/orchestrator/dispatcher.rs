//! # Dispatcher
//!
//! The 2-second heartbeat of the engine. Each tick refreshes shift flags,
//! drains the head of the main queue through the batch optimizer, and
//! (during office hours) promotes a handful of stranded sessions to the
//! overflow queue and drains that queue against the Overflow team.
//!
//! Promotion runs after the main-queue pass, so a session demoted this
//! tick is first offered to the Overflow team on the next one; overflow
//! placement latency is bounded by a single tick.
//!
//! Tick failures are logged and swallowed: the loop must survive
//! transient store errors.

use std::cmp;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::agent::{AgentStore, ShiftManager, Team};
use crate::clock::Clock;
use crate::config::DispatcherConfig;
use crate::error::Result;
use crate::orchestrator::assignment::Assigner;
use crate::routing::hours::BusinessHours;
use crate::routing::selector::{AgentSelector, AssignmentPlan};
use crate::session::SessionStore;

/// Periodic queue-draining task
pub struct Dispatcher {
    sessions: Arc<SessionStore>,
    agents: Arc<AgentStore>,
    selector: Arc<AgentSelector>,
    assigner: Arc<Assigner>,
    shift_manager: Arc<ShiftManager>,
    clock: Arc<dyn Clock>,
    config: DispatcherConfig,
}

impl Dispatcher {
    /// Create a dispatcher over the engine's shared components
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sessions: Arc<SessionStore>,
        agents: Arc<AgentStore>,
        selector: Arc<AgentSelector>,
        assigner: Arc<Assigner>,
        shift_manager: Arc<ShiftManager>,
        clock: Arc<dyn Clock>,
        config: DispatcherConfig,
    ) -> Self {
        Self { sessions, agents, selector, assigner, shift_manager, clock, config }
    }

    /// Run the tick loop until the shutdown signal flips
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let period = std::time::Duration::from_secs(self.config.tick_interval_secs);
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("🚀 Dispatcher started ({}s tick)", self.config.tick_interval_secs);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        error!("❌ Dispatcher tick failed: {e}");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("🛑 Dispatcher stopping");
                        break;
                    }
                }
            }
        }
    }

    /// One dispatcher tick
    ///
    /// The overflow queue drains before this tick's promotions land, so a
    /// freshly promoted session waits one tick before it is offered to the
    /// Overflow team.
    pub async fn tick(&self) -> Result<()> {
        let now = self.clock.now();
        self.shift_manager.update_status(now).await?;
        self.process_main_queue().await?;
        if BusinessHours::is_office_hours(now) {
            self.process_overflow_queue().await?;
            self.move_unassigned_to_overflow().await?;
        }
        Ok(())
    }

    /// Offer the head of the main queue to the batch optimizer
    pub async fn process_main_queue(&self) -> Result<()> {
        let available = self.agents.accepting_agents().await?;
        if available.is_empty() {
            debug!("📋 No agents accepting; main queue untouched");
            return Ok(());
        }

        let mut batch = self.sessions.queued_main().await?;
        batch.truncate(cmp::min(self.config.batch_size, available.len()));
        if batch.is_empty() {
            return Ok(());
        }

        let plans = self.selector.create_optimal_assignments(&batch, &available)?;
        self.commit_plans(plans).await;
        Ok(())
    }

    /// Promote stranded main-queue sessions to the overflow queue
    ///
    /// Takes the oldest still-queued sessions, up to the promotion batch
    /// size; each keeps its `created_at` and therefore its accumulated
    /// wait.
    pub async fn move_unassigned_to_overflow(&self) -> Result<()> {
        let mut stranded = self.sessions.queued_main().await?;
        stranded.truncate(self.config.overflow_promotion_batch);
        for session in stranded {
            self.sessions.move_to_overflow(&session.id).await?;
        }
        Ok(())
    }

    /// Drain the overflow queue against the Overflow team
    pub async fn process_overflow_queue(&self) -> Result<()> {
        let overflow_pool = self.agents.by_team(Team::Overflow).await?;
        let mut batch = self.sessions.queued_overflow().await?;
        batch.truncate(self.config.batch_size);
        if batch.is_empty() {
            return Ok(());
        }

        let plans = self.selector.create_overflow_assignments(&batch, &overflow_pool)?;
        self.commit_plans(plans).await;
        Ok(())
    }

    /// Commit each plan; a failed commit hands its reservation back
    async fn commit_plans(&self, plans: Vec<AssignmentPlan>) {
        for plan in plans {
            match self.assigner.try_assign(&plan.session, &plan.agent).await {
                Ok(true) => {}
                Ok(false) => plan.agent.release_reservation(),
                Err(e) => {
                    error!("❌ Assignment of session {} failed: {e}", plan.session.id);
                    plan.agent.release_reservation();
                }
            }
        }
    }
}
