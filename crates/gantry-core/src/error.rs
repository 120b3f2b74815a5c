//! Error types for Gantry.

use thiserror::Error;

use crate::agent::TargetState;

#[derive(Debug, Error)]
pub enum Error {
    // Remote execution errors
    #[error("Remote command failed: {0}")]
    RemoteCommand(String),

    // State confirmation errors
    //
    // An agent fault carries the remote worker's own error report verbatim,
    // so the variant adds no framing of its own.
    #[error("{0}")]
    AgentFault(String),

    #[error("Agent did not reach the {target} state within {waited_secs} seconds")]
    ConfirmationTimeout {
        target: TargetState,
        waited_secs: u64,
    },

    // Broker errors
    #[error("Control plane query failed: {0}")]
    ControlPlane(String),

    #[error("Queue deletion failed: {0}")]
    QueueDelete(String),

    // Descriptor and operation errors
    #[error("Invalid agent descriptor: {0}")]
    Validation(String),

    #[error("Another operation is already running for agent: {0}")]
    ConcurrentOperation(String),

    #[error("Operation cancelled")]
    Cancelled,

    // Infrastructure errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
