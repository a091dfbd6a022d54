//! Error types for SoundMap

use crate::agent::AgentId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SoundMapError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Environment not ready: {0}")]
    EnvironmentNotReady(String),

    #[error("Unknown agent: {0}")]
    UnknownAgent(AgentId),

    #[error("Agent {agent} has no {capability} capability")]
    CapabilityMissing {
        agent: AgentId,
        capability: &'static str,
    },

    #[error("Channel error: {0}")]
    Channel(String),
}

pub type Result<T> = std::result::Result<T, SoundMapError>;
