//! Error types for the simulation engine

use thiserror::Error;

use crate::types::Pid;

/// Simulation result type
pub type Result<T> = std::result::Result<T, SimError>;

/// Errors that can occur before a simulation run starts.
///
/// A run that has started always proceeds to completion, so every variant here is
/// raised either while validating a configuration or while building the engine.
#[derive(Error, Debug)]
pub enum SimError {
    /// Quantum of zero for a round-robin style queue
    #[error("Invalid quantum for {context}: quantum must be positive")]
    InvalidQuantum { context: String },

    /// Multilevel queue descriptors are empty, duplicated or malformed
    #[error("Invalid queue descriptors: {0}")]
    InvalidQueues(String),

    /// Any other rejected configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Process with a burst time of zero
    #[error("Process {pid} has a non-positive burst time")]
    InvalidBurst { pid: Pid },

    /// Two processes share an id
    #[error("Duplicate process id {0}")]
    DuplicateProcess(Pid),

    /// IO error while reading or writing scenario files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SimError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a queue descriptor error
    pub fn queues(msg: impl Into<String>) -> Self {
        Self::InvalidQueues(msg.into())
    }

    /// Create a zero-quantum error
    pub fn quantum(context: impl Into<String>) -> Self {
        Self::InvalidQuantum {
            context: context.into(),
        }
    }
}
