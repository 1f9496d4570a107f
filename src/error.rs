use thiserror::Error;

use crate::orchestrator::OrchestratorError;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Handler already registered for job type: {0}")]
    DuplicateJobType(String),

    #[error("No handler registered for job type: {0}")]
    UnknownJobType(String),

    #[error("Unreadable job variables: {0}")]
    Variables(String),

    #[error("Orchestrator error: {0}")]
    Orchestrator(#[from] OrchestratorError),

    #[error("Invocation failed: {0}")]
    Invocation(#[from] InvocationError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Why a side-effect call did not succeed.
///
/// The resolver treats every variant the same way; the distinction only
/// matters for logs and for the error message sent with a fail command.
#[derive(Debug, Error)]
pub enum InvocationError {
    /// Connection refused, DNS failure, timeout or any other transport fault.
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a non-2xx status.
    #[error("service returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// The variable set could not be turned into a request payload.
    #[error("payload encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}
