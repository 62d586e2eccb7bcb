//! Agent management: types, the in-memory store, and shift handling

pub mod shifts;
pub mod store;
pub mod types;

pub use shifts::{starting_roster, ShiftManager};
pub use store::AgentStore;
pub use types::{Agent, AgentId, AgentSnapshot, Seniority, ShiftBasis, ShiftWindow, Team};
