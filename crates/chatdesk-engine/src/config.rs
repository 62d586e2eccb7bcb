//! Dispatch engine configuration
//!
//! All tunables live here, grouped by subsystem, with working defaults.
//! Everything is serde-serializable so a deployment can load the tree from
//! a file and [`DispatchConfig::validate`] it before the engine starts.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::error::{DispatchError, Result};

/// Top-level dispatch engine configuration
///
/// # Examples
///
/// ```
/// use chatdesk_engine::config::DispatchConfig;
///
/// let config = DispatchConfig::default();
/// assert_eq!(config.general.base_capacity, 10);
/// assert_eq!(config.dispatcher.tick_interval_secs, 2);
/// assert_eq!(config.monitor.missed_poll_threshold, 3);
/// config.validate().expect("defaults are valid");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// System-wide settings: bind address, capacity base, shift handoff
    pub general: GeneralConfig,

    /// Admission control and capacity caching
    pub capacity: CapacityConfig,

    /// Dispatcher loop: tick cadence, batch sizes, assignment retries
    pub dispatcher: DispatcherConfig,

    /// Monitor loop: tick cadence and liveness thresholds
    pub monitor: MonitorConfig,
}

/// General system settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Address the HTTP surface binds to
    pub bind_addr: SocketAddr,

    /// Base concurrent-chat capacity scaled by the seniority multiplier
    ///
    /// An agent's slot count is `floor(base_capacity * multiplier)`.
    pub base_capacity: u32,

    /// Minutes before shift end during which an agent stops taking new chats
    pub shift_handoff_minutes: i64,
}

/// Admission control settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapacityConfig {
    /// Queue limit per scope is `floor(capacity * queue_multiplier)`
    pub queue_multiplier: f64,

    /// Seconds a cached capacity figure stays fresh
    pub cache_ttl_secs: u64,
}

/// Dispatcher loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Seconds between dispatcher ticks
    pub tick_interval_secs: u64,

    /// Maximum head-of-queue sessions offered to the batch optimizer per tick
    pub batch_size: usize,

    /// Maximum sessions promoted from main to overflow per tick
    pub overflow_promotion_batch: usize,

    /// Persistence attempts per assignment before giving up
    pub assignment_retries: u32,

    /// Backoff between attempts is `retry_backoff_base_ms * attempt`
    pub retry_backoff_base_ms: u64,
}

/// Monitor loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Seconds between monitor ticks
    pub tick_interval_secs: u64,

    /// A session is stale once this many seconds pass without a poll
    pub expected_poll_interval_secs: i64,

    /// Missed polls at which a session is inactivated
    pub missed_poll_threshold: u32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            capacity: CapacityConfig::default(),
            dispatcher: DispatcherConfig::default(),
            monitor: MonitorConfig::default(),
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".parse().expect("static default addr"),
            base_capacity: 10,
            shift_handoff_minutes: 5,
        }
    }
}

impl Default for CapacityConfig {
    fn default() -> Self {
        Self {
            queue_multiplier: 1.5,
            cache_ttl_secs: 5,
        }
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 2,
            batch_size: 10,
            overflow_promotion_batch: 5,
            assignment_retries: 3,
            retry_backoff_base_ms: 100,
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 5,
            expected_poll_interval_secs: 1,
            missed_poll_threshold: 3,
        }
    }
}

impl DispatchConfig {
    /// Validate the configuration tree
    ///
    /// Rejects values that would stall the engine (zero batch sizes, zero
    /// intervals) or break the capacity math (non-positive multipliers).
    pub fn validate(&self) -> Result<()> {
        if self.general.base_capacity == 0 {
            return Err(DispatchError::configuration("base_capacity must be positive"));
        }
        if self.general.shift_handoff_minutes < 0 {
            return Err(DispatchError::configuration("shift_handoff_minutes must not be negative"));
        }
        if self.capacity.queue_multiplier <= 0.0 {
            return Err(DispatchError::configuration("queue_multiplier must be positive"));
        }
        if self.dispatcher.tick_interval_secs == 0 {
            return Err(DispatchError::configuration("dispatcher tick_interval_secs must be positive"));
        }
        if self.dispatcher.batch_size == 0 {
            return Err(DispatchError::configuration("dispatcher batch_size must be positive"));
        }
        if self.dispatcher.assignment_retries == 0 {
            return Err(DispatchError::configuration("assignment_retries must be positive"));
        }
        if self.monitor.tick_interval_secs == 0 {
            return Err(DispatchError::configuration("monitor tick_interval_secs must be positive"));
        }
        if self.monitor.expected_poll_interval_secs <= 0 {
            return Err(DispatchError::configuration("expected_poll_interval_secs must be positive"));
        }
        if self.monitor.missed_poll_threshold == 0 {
            return Err(DispatchError::configuration("missed_poll_threshold must be positive"));
        }
        Ok(())
    }
}
