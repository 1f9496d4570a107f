//! In-memory orchestrator that records every command it receives.

use std::collections::VecDeque;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::client::OrchestratorClient;
use super::error::OrchestratorError;
use super::types::{ActivateJobsRequest, Deployment, Job, Key, ProcessInstance, VariableSet};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start {
        process_id: String,
        variables: VariableSet,
    },
    Complete {
        key: Key,
        variables: VariableSet,
    },
    Fail {
        key: Key,
        retries: u32,
        error_message: String,
    },
}

impl Command {
    /// Key of the job a terminating command refers to.
    pub fn job_key(&self) -> Option<&Key> {
        match self {
            Command::Complete { key, .. } | Command::Fail { key, .. } => Some(key),
            Command::Start { .. } => None,
        }
    }
}

#[derive(Default)]
pub struct RecordingOrchestrator {
    commands: Mutex<Vec<Command>>,
    attempts: Mutex<Vec<Command>>,
    pending: Mutex<VecDeque<Job>>,
    reject: Mutex<bool>,
    ignore_job_type: Mutex<bool>,
}

impl RecordingOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every command is rejected as if the gateway were unavailable.
    pub fn rejecting() -> Self {
        let orchestrator = Self::default();
        *orchestrator.reject.lock() = true;
        orchestrator
    }

    /// Hands out queued jobs regardless of the requested job type, like a
    /// gateway routing jobs to the wrong worker.
    pub fn misrouting() -> Self {
        let orchestrator = Self::default();
        *orchestrator.ignore_job_type.lock() = true;
        orchestrator
    }

    /// Queue jobs to be handed out by `activate_jobs`.
    pub fn enqueue(&self, jobs: impl IntoIterator<Item = Job>) {
        self.pending.lock().extend(jobs);
    }

    pub fn commands(&self) -> Vec<Command> {
        self.commands.lock().clone()
    }

    /// Every command received, including the rejected ones.
    pub fn attempts(&self) -> Vec<Command> {
        self.attempts.lock().clone()
    }

    pub fn terminations(&self) -> Vec<Command> {
        self.commands
            .lock()
            .iter()
            .filter(|command| command.job_key().is_some())
            .cloned()
            .collect()
    }

    fn record(&self, command: Command) -> Result<(), OrchestratorError> {
        self.attempts.lock().push(command.clone());
        if *self.reject.lock() {
            return Err(OrchestratorError::Rejected {
                status: 503,
                message: "gateway unavailable".into(),
            });
        }
        self.commands.lock().push(command);
        Ok(())
    }
}

#[async_trait]
impl OrchestratorClient for RecordingOrchestrator {
    async fn start_instance(
        &self,
        process_id: &str,
        variables: &VariableSet,
    ) -> Result<ProcessInstance, OrchestratorError> {
        self.record(Command::Start {
            process_id: process_id.to_string(),
            variables: variables.clone(),
        })?;
        Ok(ProcessInstance {
            process_instance_key: Key::new("1"),
            process_definition_key: None,
            process_definition_id: process_id.to_string(),
            version: 1,
        })
    }

    async fn activate_jobs(
        &self,
        request: &ActivateJobsRequest,
    ) -> Result<Vec<Job>, OrchestratorError> {
        let any_type = *self.ignore_job_type.lock();
        let jobs: Vec<Job> = {
            let mut pending = self.pending.lock();
            let mut taken = Vec::new();
            let mut remaining = VecDeque::new();
            while let Some(job) = pending.pop_front() {
                if (any_type || job.job_type == request.job_type)
                    && taken.len() < request.max_jobs_to_activate as usize
                {
                    taken.push(job);
                } else {
                    remaining.push_back(job);
                }
            }
            *pending = remaining;
            taken
        };

        if jobs.is_empty() {
            // Stand-in for the gateway holding the long poll open.
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        Ok(jobs)
    }

    async fn complete_job(
        &self,
        key: &Key,
        variables: &VariableSet,
    ) -> Result<(), OrchestratorError> {
        self.record(Command::Complete {
            key: key.clone(),
            variables: variables.clone(),
        })
    }

    async fn fail_job(
        &self,
        key: &Key,
        retries: u32,
        error_message: &str,
    ) -> Result<(), OrchestratorError> {
        self.record(Command::Fail {
            key: key.clone(),
            retries,
            error_message: error_message.to_string(),
        })
    }

    async fn deploy_resource(&self, _path: &Path) -> Result<Deployment, OrchestratorError> {
        Ok(Deployment {
            deployment_key: Key::new("1"),
            deployments: Vec::new(),
        })
    }
}
