//! Public in-process APIs layered over the engine

pub mod admin;

pub use admin::{AdminApi, QueueStatus};
