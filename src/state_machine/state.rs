use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::outcome::{CompletionPolicy, Outcome, SuccessFlag};
use crate::orchestrator::VariableSet;

/// Lifecycle of one dispatched job as seen by this worker.
///
/// `DISPATCHED → INVOKING → {COMPLETED | RETRY_REQUESTED | COMPLETED_AS_FAILED}`
///
/// `RetryRequested` is final for this job; the orchestrator redispatches a new
/// job with the decremented retries, which starts over at `Dispatched`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Dispatched,
    Invoking,
    Completed,
    RetryRequested,
    CompletedAsFailed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::CompletedAsFailed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Dispatched => write!(f, "DISPATCHED"),
            JobState::Invoking => write!(f, "INVOKING"),
            JobState::Completed => write!(f, "COMPLETED"),
            JobState::RetryRequested => write!(f, "RETRY_REQUESTED"),
            JobState::CompletedAsFailed => write!(f, "COMPLETED_AS_FAILED"),
        }
    }
}

/// Decides how a job terminates from its invocation result and retry budget.
///
/// Pure: no I/O happens here, the worker issues the resulting command.
#[derive(Debug, Clone)]
pub struct OutcomeResolver {
    policy: Arc<dyn CompletionPolicy>,
}

impl Default for OutcomeResolver {
    fn default() -> Self {
        Self::new(SuccessFlag::default())
    }
}

impl OutcomeResolver {
    pub fn new(policy: impl CompletionPolicy + 'static) -> Self {
        Self {
            policy: Arc::new(policy),
        }
    }

    /// - success completes with the policy's success variables, whatever the budget;
    /// - failure with more than one retry left fails the job with `retries - 1`;
    /// - failure on the last retry (or none) completes with the policy's
    ///   exhausted variables instead of failing again.
    pub fn resolve<E: fmt::Display>(
        &self,
        invocation: Result<VariableSet, E>,
        retries: u32,
    ) -> Outcome {
        match invocation {
            Ok(result) => Outcome::Completed(self.policy.completed(result)),
            Err(err) => self.handle_failure(err.to_string(), retries),
        }
    }

    /// Resolve a job that cannot be processed at all (e.g. unreadable
    /// variables). Retrying would not help, so no retry is consumed.
    pub fn reject(&self, error: impl fmt::Display) -> Outcome {
        let error = error.to_string();
        Outcome::Terminal {
            variables: self.policy.exhausted(&error),
            error,
        }
    }

    fn handle_failure(&self, error: String, retries: u32) -> Outcome {
        if retries > 1 {
            Outcome::Retryable {
                error,
                retries: retries - 1,
            }
        } else {
            self.reject(error)
        }
    }
}
