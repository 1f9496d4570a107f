//! Wire types exchanged with the orchestrator's REST gateway.
//!
//! Requests serialize to the gateway's camelCase JSON; responses accept keys
//! encoded either as JSON strings or as JSON numbers, since gateway versions
//! disagree on the encoding of 64-bit keys.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Mapping of variable names to JSON values exchanged with process instances.
pub type VariableSet = serde_json::Map<String, Value>;

/// Opaque key assigned by the orchestrator (job, instance, deployment, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Key(String);

impl Key {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for Key {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for Key {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawKey {
            Text(String),
            Number(i64),
        }

        Ok(match RawKey::deserialize(deserializer)? {
            RawKey::Text(text) => Self(text),
            RawKey::Number(number) => Self(number.to_string()),
        })
    }
}

/// A unit of work handed to this worker by the orchestrator.
///
/// Jobs are never mutated locally: a retry is expressed only through the
/// retries count carried by the outgoing fail command.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    #[serde(rename = "jobKey")]
    pub key: Key,
    #[serde(rename = "type")]
    pub job_type: String,
    #[serde(default)]
    pub process_instance_key: Option<Key>,
    /// Raw variables as delivered; decoded into a [`VariableSet`] by the worker.
    #[serde(default)]
    pub variables: Value,
    pub retries: u32,
}

impl Job {
    pub fn new(key: impl Into<Key>, job_type: impl Into<String>, variables: Value, retries: u32) -> Self {
        Self {
            key: key.into(),
            job_type: job_type.into(),
            process_instance_key: None,
            variables,
            retries,
        }
    }
}

/// A process instance started through the gateway. The orchestrator owns it;
/// this is only the acknowledgement.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessInstance {
    pub process_instance_key: Key,
    #[serde(default)]
    pub process_definition_key: Option<Key>,
    #[serde(default)]
    pub process_definition_id: String,
    #[serde(default, rename = "processDefinitionVersion")]
    pub version: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub deployment_key: Key,
    #[serde(default)]
    pub deployments: Vec<DeploymentEntry>,
}

impl Deployment {
    /// Process definitions contained in this deployment.
    pub fn processes(&self) -> impl Iterator<Item = &ProcessDefinition> {
        self.deployments
            .iter()
            .filter_map(|entry| entry.process_definition.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentEntry {
    #[serde(default)]
    pub process_definition: Option<ProcessDefinition>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessDefinition {
    pub process_definition_id: String,
    pub process_definition_version: i64,
    pub process_definition_key: Key,
    #[serde(default)]
    pub resource_name: String,
}

/// Sentinel version meaning "latest deployed version".
pub const LATEST_VERSION: i64 = -1;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartInstanceRequest<'a> {
    pub process_definition_id: &'a str,
    pub process_definition_version: i64,
    pub variables: &'a VariableSet,
}

/// Long-poll request for jobs of one type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivateJobsRequest {
    #[serde(rename = "type")]
    pub job_type: String,
    pub worker: String,
    /// How long the orchestrator keeps the job locked for this worker, in ms.
    pub timeout: u64,
    pub max_jobs_to_activate: u32,
    /// How long the gateway may hold the request open waiting for jobs, in ms.
    pub request_timeout: u64,
}

/// Jobs are kept raw so that one unreadable job does not discard the batch.
#[derive(Debug, Clone, Deserialize)]
pub struct ActivateJobsResponse {
    #[serde(default)]
    pub jobs: Vec<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompleteJobRequest<'a> {
    pub variables: &'a VariableSet,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailJobRequest<'a> {
    pub retries: u32,
    pub error_message: &'a str,
    pub retry_back_off: u64,
}
