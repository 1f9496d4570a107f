use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::Instrument;

use super::handlers::JobHandler;
use crate::error::BridgeError;
use crate::orchestrator::{ActivateJobsRequest, Job, OrchestratorClient, VariableSet};
use crate::state_machine::{JobState, Outcome, OutcomeResolver};

/// Tuning for job subscriptions.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Name reported to the orchestrator when activating jobs.
    pub worker_name: String,
    /// How long an activated job stays locked to this worker, in milliseconds.
    pub job_timeout_ms: u64,
    /// Upper bound on jobs being handled at once, per job type.
    pub max_jobs_active: u32,
    /// Pause between activation attempts after an empty poll or an error.
    pub poll_interval_ms: u64,
    /// How long the gateway may hold an activation request open.
    pub activation_timeout_ms: u64,
}

impl WorkerConfig {
    pub fn new(worker_name: impl Into<String>) -> Self {
        Self {
            worker_name: worker_name.into(),
            ..Self::default()
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_name: "paybridge".to_string(),
            job_timeout_ms: 30_000,
            max_jobs_active: 32,
            poll_interval_ms: 100,
            activation_timeout_ms: 5_000,
        }
    }
}

struct Registration {
    handler: Arc<dyn JobHandler>,
    resolver: OutcomeResolver,
}

/// Routes dispatched jobs to their handlers and terminates each one with
/// exactly one complete or fail command.
pub struct JobWorker {
    client: Arc<dyn OrchestratorClient>,
    config: WorkerConfig,
    handlers: HashMap<String, Registration>,
}

impl JobWorker {
    pub fn new(client: Arc<dyn OrchestratorClient>, config: WorkerConfig) -> Self {
        Self {
            client,
            config,
            handlers: HashMap::new(),
        }
    }

    /// Route jobs of `job_type` to `handler`, resolving their outcomes with
    /// `resolver`. Each job type takes a single handler.
    pub fn register(
        &mut self,
        job_type: impl Into<String>,
        handler: impl JobHandler + 'static,
        resolver: OutcomeResolver,
    ) -> Result<&mut Self, BridgeError> {
        let job_type = job_type.into();
        if self.handlers.contains_key(&job_type) {
            return Err(BridgeError::DuplicateJobType(job_type));
        }
        self.handlers.insert(
            job_type,
            Registration {
                handler: Arc::new(handler),
                resolver,
            },
        );
        Ok(self)
    }

    /// Job types with a registered handler; `open` subscribes to each.
    pub fn job_types(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Handle one job end to end and return the state it ended in.
    ///
    /// A failed terminating command is logged and returned, never re-sent: the
    /// job stays locked until the orchestrator's job timeout redispatches it.
    pub async fn dispatch(&self, job: Job) -> Result<JobState, BridgeError> {
        let Some(registration) = self.handlers.get(&job.job_type) else {
            tracing::error!(
                key = %job.key,
                job_type = %job.job_type,
                "no handler registered for job type, job left to orchestrator timeout"
            );
            return Err(BridgeError::UnknownJobType(job.job_type.clone()));
        };

        let span = tracing::info_span!(
            "job",
            key = %job.key,
            job_type = %job.job_type,
            retries = job.retries,
        );

        async move {
            tracing::debug!(state = %JobState::Dispatched, "job received");

            let outcome = match decode_variables(&job.variables) {
                Ok(variables) => {
                    tracing::debug!(state = %JobState::Invoking, "invoking handler");
                    let result = registration.handler.handle(&job, variables).await;
                    registration.resolver.resolve(result, job.retries)
                }
                Err(err) => {
                    tracing::warn!(error = %err, "rejecting job");
                    registration.resolver.reject(err)
                }
            };

            self.terminate(&job, &outcome).await?;
            let state = outcome.final_state();
            tracing::info!(%state, "{outcome}");
            Ok::<_, BridgeError>(state)
        }
        .instrument(span)
        .await
    }

    async fn terminate(&self, job: &Job, outcome: &Outcome) -> Result<(), BridgeError> {
        let result = match outcome {
            Outcome::Completed(variables) | Outcome::Terminal { variables, .. } => {
                self.client.complete_job(&job.key, variables).await
            }
            Outcome::Retryable { error, retries } => {
                self.client.fail_job(&job.key, *retries, error).await
            }
        };

        if let Err(err) = &result {
            tracing::error!(
                error = %err,
                intended = %outcome.final_state(),
                "terminating command failed, job left to orchestrator timeout"
            );
        }
        Ok(result?)
    }

    fn activation_request(&self, job_type: &str, capacity: u32) -> ActivateJobsRequest {
        ActivateJobsRequest {
            job_type: job_type.to_string(),
            worker: self.config.worker_name.clone(),
            timeout: self.config.job_timeout_ms,
            max_jobs_to_activate: capacity,
            request_timeout: self.config.activation_timeout_ms,
        }
    }

    /// Start one long-poll subscription per registered job type.
    pub fn open(self: &Arc<Self>) -> Vec<Subscription> {
        self.handlers
            .keys()
            .map(|job_type| Subscription::spawn(Arc::clone(self), job_type.clone()))
            .collect()
    }
}

/// Accepts an object, `null` (no variables) or a JSON-encoded object string.
fn decode_variables(raw: &Value) -> Result<VariableSet, BridgeError> {
    match raw {
        Value::Object(map) => Ok(map.clone()),
        Value::Null => Ok(VariableSet::new()),
        Value::String(text) => Ok(serde_json::from_str(text)?),
        other => Err(BridgeError::Variables(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

/// A running subscription for one job type.
pub struct Subscription {
    job_type: String,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Subscription {
    fn spawn(worker: Arc<JobWorker>, job_type: String) -> Self {
        let (shutdown, signal) = watch::channel(false);
        let task = tokio::spawn(poll(worker, job_type.clone(), signal));
        tracing::info!(%job_type, "job subscription opened");
        Self {
            job_type,
            shutdown,
            task,
        }
    }

    pub fn job_type(&self) -> &str {
        &self.job_type
    }

    /// Stop activating new jobs and wait for the jobs already activated to
    /// be terminated.
    pub async fn close(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.task.await {
            tracing::warn!(job_type = %self.job_type, error = %err, "subscription task ended abnormally");
        }
        tracing::info!(job_type = %self.job_type, "job subscription closed");
    }
}

async fn poll(worker: Arc<JobWorker>, job_type: String, mut shutdown: watch::Receiver<bool>) {
    let max_active = worker.config.max_jobs_active.max(1);
    let slots = Arc::new(Semaphore::new(max_active as usize));
    let interval = Duration::from_millis(worker.config.poll_interval_ms);

    while !*shutdown.borrow() {
        // Never activate more jobs than there are free slots.
        let capacity = slots.available_permits();
        if capacity == 0 {
            tokio::select! {
                _ = shutdown.changed() => break,
                permit = Arc::clone(&slots).acquire_owned() => {
                    drop(permit);
                    continue;
                }
            }
        }

        let request = worker.activation_request(&job_type, capacity as u32);
        let activated = tokio::select! {
            _ = shutdown.changed() => break,
            activated = worker.client.activate_jobs(&request) => activated,
        };

        match activated {
            Ok(jobs) if !jobs.is_empty() => {
                tracing::debug!(%job_type, count = jobs.len(), "jobs activated");
                for job in jobs {
                    let Ok(permit) = Arc::clone(&slots).acquire_owned().await else {
                        return;
                    };
                    let worker = Arc::clone(&worker);
                    tokio::spawn(async move {
                        let _permit = permit;
                        // Every error path in `dispatch` logs before returning.
                        let _ = worker.dispatch(job).await;
                    });
                }
                continue;
            }
            Ok(_) => {}
            Err(err) => tracing::warn!(%job_type, error = %err, "job activation failed"),
        }

        tokio::select! {
            _ = shutdown.changed() => break,
            _ = sleep(interval) => {}
        }
    }

    // Every slot back means no job of this type is still in flight.
    if slots.acquire_many(max_active).await.is_err() {
        tracing::warn!(%job_type, "job slots closed before in-flight jobs drained");
    }
}
