pub mod client;
pub mod error;
#[cfg(test)]
pub(crate) mod mock;
pub mod types;

pub use client::{OrchestratorClient, RestOrchestratorClient};
pub use error::OrchestratorError;
pub use types::{ActivateJobsRequest, Deployment, Job, Key, ProcessInstance, VariableSet};
