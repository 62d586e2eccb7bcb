//! Routing: rotation counters, the office-hours calendar, capacity and
//! admission math, and agent selection

pub mod capacity;
pub mod hours;
pub mod round_robin;
pub mod selector;

pub use capacity::CapacityCalculator;
pub use hours::BusinessHours;
pub use round_robin::RoundRobinCoordinator;
pub use selector::{AgentSelector, AssignmentPlan};
