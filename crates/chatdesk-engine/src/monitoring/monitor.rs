//! Liveness monitor loop
//!
//! Runs the timeout service on a fixed cadence. Pass failures are logged
//! and swallowed so the loop outlives transient store errors.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::config::MonitorConfig;
use crate::monitoring::timeout::SessionTimeoutService;

/// Periodic liveness-monitoring task
pub struct Monitor {
    timeout_service: Arc<SessionTimeoutService>,
    tick_interval_secs: u64,
}

impl Monitor {
    /// Create a monitor over the timeout service
    pub fn new(timeout_service: Arc<SessionTimeoutService>, config: &MonitorConfig) -> Self {
        Self {
            timeout_service,
            tick_interval_secs: config.tick_interval_secs,
        }
    }

    /// Run the tick loop until the shutdown signal flips
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let period = std::time::Duration::from_secs(self.tick_interval_secs);
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("🚀 Monitor started ({}s tick)", self.tick_interval_secs);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.timeout_service.process_timeouts().await {
                        error!("❌ Monitor tick failed: {e}");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("🛑 Monitor stopping");
                        break;
                    }
                }
            }
        }
    }
}
