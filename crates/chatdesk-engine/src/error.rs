use thiserror::Error;

/// Error types for dispatch engine operations
///
/// Covers the failure modes of the dispatch pipeline, from bad caller input
/// through capacity races to store-level transients.
///
/// # Examples
///
/// ```
/// use chatdesk_engine::{DispatchError, Result};
///
/// fn admit(user_id: &str) -> Result<()> {
///     if user_id.is_empty() {
///         return Err(DispatchError::invalid_input("userId must not be empty"));
///     }
///     Ok(())
/// }
///
/// match admit("") {
///     Err(DispatchError::InvalidInput(msg)) => assert!(msg.contains("userId")),
///     other => panic!("unexpected: {:?}", other),
/// }
/// ```
#[derive(Error, Debug)]
pub enum DispatchError {
    /// Caller-supplied input failed validation
    ///
    /// A zero round-robin modulus, an empty user id, or an illegal state
    /// transition requested from the outside.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A session or agent could not be located
    ///
    /// Poll and introspection on unknown ids surface this as a
    /// `success=false` / `None` result at the edge, never as a 500.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Capacity disappeared between selection and commit
    ///
    /// `assign_to_agent` on a non-queued session, or a confirm/direct
    /// assignment once the agent's slots are gone. The assigner handles
    /// this locally: the reservation is released and the session stays
    /// queued for the next tick.
    #[error("Capacity conflict: {0}")]
    CapacityConflict(String),

    /// Queue-level failure
    #[error("Queue error: {0}")]
    Queue(String),

    /// Agent-level failure
    #[error("Agent error: {0}")]
    Agent(String),

    /// Configuration validation failure
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A store operation failed transiently
    ///
    /// The assigner retries these with backoff; a final failure is logged
    /// and the affected session keeps its queue position.
    #[error("Transient store error: {0}")]
    Transient(String),

    /// Unexpected internal error
    ///
    /// Surfaces as HTTP 500. State stays consistent because mutations are
    /// confined to committed units.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for DispatchError {
    fn from(err: anyhow::Error) -> Self {
        // Unexpected errors from lower-level components land here.
        Self::Internal(err.to_string())
    }
}

impl DispatchError {
    /// Create a new InvalidInput error with the provided message
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new NotFound error with the provided message
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new CapacityConflict error with the provided message
    pub fn capacity_conflict<S: Into<String>>(msg: S) -> Self {
        Self::CapacityConflict(msg.into())
    }

    /// Create a new Queue error with the provided message
    pub fn queue<S: Into<String>>(msg: S) -> Self {
        Self::Queue(msg.into())
    }

    /// Create a new Agent error with the provided message
    pub fn agent<S: Into<String>>(msg: S) -> Self {
        Self::Agent(msg.into())
    }

    /// Create a new Configuration error with the provided message
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a new Transient error with the provided message
    pub fn transient<S: Into<String>>(msg: S) -> Self {
        Self::Transient(msg.into())
    }

    /// Create a new Internal error with the provided message
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type for dispatch engine operations
pub type Result<T> = std::result::Result<T, DispatchError>;
