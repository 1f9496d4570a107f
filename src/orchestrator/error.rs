//! Errors raised while talking to the orchestrator gateway.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The gateway could not be reached or the connection broke mid-request.
    #[error("gateway unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    /// The gateway answered with a non-2xx status (unknown job, bad process id, ...).
    #[error("gateway rejected command (status {status}): {message}")]
    Rejected { status: u16, message: String },

    /// The gateway answered 2xx with a body that does not match the expected shape.
    #[error("unexpected gateway response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The process-definition resource could not be read from disk.
    #[error("cannot read resource {path}: {source}")]
    Resource {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
