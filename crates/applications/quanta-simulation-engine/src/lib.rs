//! Quanta Simulation Engine
//!
//! Discrete-time simulator for comparing CPU scheduling policies.

pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod policies;
pub mod simulator;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{Result, SimError};
