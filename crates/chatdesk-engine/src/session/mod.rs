//! Chat sessions: types and the in-memory store with its two FIFO queues

pub mod store;
pub mod types;

pub use store::SessionStore;
pub use types::{ChatSession, SessionId, SessionStatus};
