//! Error taxonomy for the simulator
//!
//! Setup faults abort before the first reading is generated. Publish faults
//! only surface here under `PublishPolicy::AwaitAndAbort`; the other
//! policies log them and keep going.

use thiserror::Error;

use crate::config::ConfigError;
use crate::pubsub::{CredentialsError, PublishError, TopicError};
use crate::sensor::Reading;

/// Faults that prevent the loop from starting
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid destination: {0}")]
    Topic(#[from] TopicError),

    #[error("Failed to load credentials: {0}")]
    Credentials(#[from] CredentialsError),

    /// The messaging client could not be constructed
    #[error("Failed to construct publisher client: {0}")]
    Client(String),
}

/// Reasons the simulator stopped abnormally
#[derive(Debug, Error)]
pub enum SimulatorError {
    #[error("Setup failed: {0}")]
    Setup(#[from] SetupError),

    #[error("Failed to publish reading ({reading}): {source}")]
    Publish {
        reading: Reading,
        #[source]
        source: PublishError,
    },

    #[error("Failed to serialize reading: {0}")]
    Serialize(#[from] serde_json::Error),
}
