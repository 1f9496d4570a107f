use std::fmt;

use serde_json::Value;

use crate::orchestrator::VariableSet;

/// The decision reached for one dispatched job.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Complete the job with these variables.
    Completed(VariableSet),
    /// Fail the job and let the orchestrator redispatch it with `retries` left.
    Retryable { error: String, retries: u32 },
    /// No retry budget left (or nothing worth retrying): complete the job with
    /// variables recording the logical failure.
    Terminal { error: String, variables: VariableSet },
}

impl Outcome {
    pub fn final_state(&self) -> super::JobState {
        match self {
            Outcome::Completed(_) => super::JobState::Completed,
            Outcome::Retryable { .. } => super::JobState::RetryRequested,
            Outcome::Terminal { .. } => super::JobState::CompletedAsFailed,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Completed(_) => write!(f, "completed"),
            Outcome::Retryable { error, retries } => {
                write!(f, "retry requested ({retries} left): {error}")
            }
            Outcome::Terminal { error, .. } => write!(f, "completed as failed: {error}"),
        }
    }
}

/// Shapes the variables a job is completed with.
///
/// When a job runs out of retries it is completed, not failed, so the process
/// instance can carry on along its failure path instead of stalling on an
/// incident. Implementations decide how that failure is recorded.
pub trait CompletionPolicy: Send + Sync + fmt::Debug {
    /// Variables for a successful invocation, given the handler's business result.
    fn completed(&self, result: VariableSet) -> VariableSet;

    /// Variables for a job that will not be retried.
    fn exhausted(&self, error: &str) -> VariableSet;
}

/// Records success as a boolean process variable, e.g. `chargeSuccess`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuccessFlag {
    name: String,
}

impl SuccessFlag {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for SuccessFlag {
    fn default() -> Self {
        Self::new("chargeSuccess")
    }
}

impl CompletionPolicy for SuccessFlag {
    fn completed(&self, mut result: VariableSet) -> VariableSet {
        result.insert(self.name.clone(), Value::Bool(true));
        result
    }

    fn exhausted(&self, _error: &str) -> VariableSet {
        let mut variables = VariableSet::new();
        variables.insert(self.name.clone(), Value::Bool(false));
        variables
    }
}
