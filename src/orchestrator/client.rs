use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::error::OrchestratorError;
use super::types::{
    ActivateJobsRequest, ActivateJobsResponse, CompleteJobRequest, Deployment, FailJobRequest,
    Job, Key, LATEST_VERSION, ProcessInstance, StartInstanceRequest, VariableSet,
};

/// Commands this bridge issues to the orchestrator.
///
/// Implementations must be safe for concurrent use: every job handler and
/// every ingress request shares one client through an `Arc`.
#[async_trait]
pub trait OrchestratorClient: Send + Sync {
    /// Start a new instance of the latest version of `process_id`.
    async fn start_instance(
        &self,
        process_id: &str,
        variables: &VariableSet,
    ) -> Result<ProcessInstance, OrchestratorError>;

    /// Lock up to `request.max_jobs_to_activate` jobs of one type for this worker.
    async fn activate_jobs(&self, request: &ActivateJobsRequest)
    -> Result<Vec<Job>, OrchestratorError>;

    async fn complete_job(&self, key: &Key, variables: &VariableSet)
    -> Result<(), OrchestratorError>;

    /// Fail a job, leaving `retries` attempts for the orchestrator to redispatch.
    async fn fail_job(
        &self,
        key: &Key,
        retries: u32,
        error_message: &str,
    ) -> Result<(), OrchestratorError>;

    async fn deploy_resource(&self, path: &Path) -> Result<Deployment, OrchestratorError>;
}

/// [`OrchestratorClient`] over the orchestrator's `/v2` REST gateway.
pub struct RestOrchestratorClient {
    client: Client,
    base_url: String,
    retry_backoff_ms: u64,
}

impl RestOrchestratorClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, OrchestratorError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry_backoff_ms: 0,
        })
    }

    /// Delay the orchestrator should wait before redispatching a failed job.
    pub fn with_retry_backoff(mut self, retry_backoff_ms: u64) -> Self {
        self.retry_backoff_ms = retry_backoff_ms;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v2/{path}", self.base_url)
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Response, OrchestratorError> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        check_status(response).await
    }
}

/// Turn a non-2xx response into [`OrchestratorError::Rejected`].
async fn check_status(response: Response) -> Result<Response, OrchestratorError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string());
    Err(OrchestratorError::Rejected {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, OrchestratorError> {
    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

#[async_trait]
impl OrchestratorClient for RestOrchestratorClient {
    async fn start_instance(
        &self,
        process_id: &str,
        variables: &VariableSet,
    ) -> Result<ProcessInstance, OrchestratorError> {
        let req = StartInstanceRequest {
            process_definition_id: process_id,
            process_definition_version: LATEST_VERSION,
            variables,
        };
        let response = self.post("process-instances", &req).await?;
        decode(response).await
    }

    async fn activate_jobs(
        &self,
        request: &ActivateJobsRequest,
    ) -> Result<Vec<Job>, OrchestratorError> {
        let response = self.post("jobs/activation", request).await?;
        let body: ActivateJobsResponse = decode(response).await?;

        let mut jobs = Vec::with_capacity(body.jobs.len());
        for raw in body.jobs {
            let job_key = raw
                .get("jobKey")
                .map(|key| key.as_str().map_or_else(|| key.to_string(), str::to_owned));
            match serde_json::from_value::<Job>(raw) {
                Ok(job) => jobs.push(job),
                // Locked until the job timeout; nothing here can terminate it.
                Err(err) => tracing::error!(
                    job_key = job_key.as_deref().unwrap_or("<missing>"),
                    error = %err,
                    "dropping unreadable activated job"
                ),
            }
        }
        Ok(jobs)
    }

    async fn complete_job(
        &self,
        key: &Key,
        variables: &VariableSet,
    ) -> Result<(), OrchestratorError> {
        let req = CompleteJobRequest { variables };
        self.post(&format!("jobs/{key}/completion"), &req).await?;
        Ok(())
    }

    async fn fail_job(
        &self,
        key: &Key,
        retries: u32,
        error_message: &str,
    ) -> Result<(), OrchestratorError> {
        let req = FailJobRequest {
            retries,
            error_message,
            retry_back_off: self.retry_backoff_ms,
        };
        self.post(&format!("jobs/{key}/failure"), &req).await?;
        Ok(())
    }

    async fn deploy_resource(&self, path: &Path) -> Result<Deployment, OrchestratorError> {
        let contents =
            tokio::fs::read(path)
                .await
                .map_err(|source| OrchestratorError::Resource {
                    path: path.display().to_string(),
                    source,
                })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "process.bpmn".to_string());

        let form = Form::new().part("resources", Part::bytes(contents).file_name(file_name));
        let response = self
            .client
            .post(self.url("deployments"))
            .multipart(form)
            .send()
            .await?;
        decode(check_status(response).await?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> RestOrchestratorClient {
        RestOrchestratorClient::new(server.uri(), Duration::from_secs(5)).unwrap()
    }

    fn vars(value: serde_json::Value) -> VariableSet {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn start_instance_targets_latest_version() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/process-instances"))
            .and(body_json(json!({
                "processDefinitionId": "paymentV5",
                "processDefinitionVersion": -1,
                "variables": {"amount": 100}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "processInstanceKey": "2251799813685260",
                "processDefinitionKey": 2251799813685255_i64,
                "processDefinitionId": "paymentV5",
                "processDefinitionVersion": 2
            })))
            .expect(1)
            .mount(&server)
            .await;

        let instance = client_for(&server)
            .start_instance("paymentV5", &vars(json!({"amount": 100})))
            .await
            .unwrap();

        assert_eq!(instance.process_instance_key.as_str(), "2251799813685260");
        assert_eq!(instance.process_definition_id, "paymentV5");
        assert_eq!(instance.version, 2);
    }

    #[tokio::test]
    async fn start_instance_surfaces_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/process-instances"))
            .respond_with(ResponseTemplate::new(404).set_body_string("process not found"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .start_instance("unknown", &VariableSet::new())
            .await
            .unwrap_err();

        match err {
            OrchestratorError::Rejected { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "process not found");
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_gateway_is_transport_error() {
        // Nothing listens on port 1.
        let client = RestOrchestratorClient::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
        let err = client
            .start_instance("paymentV5", &VariableSet::new())
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::Transport(_)));
    }

    #[tokio::test]
    async fn activate_jobs_parses_jobs() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/jobs/activation"))
            .and(body_json(json!({
                "type": "charge-credit-card",
                "worker": "paybridge",
                "timeout": 30000,
                "maxJobsToActivate": 4,
                "requestTimeout": 1000
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jobs": [
                    {"jobKey": "11", "type": "charge-credit-card", "variables": {"amount": 5}, "retries": 3},
                    {"jobKey": 12, "type": "charge-credit-card", "variables": {}, "retries": 1}
                ]
            })))
            .mount(&server)
            .await;

        let jobs = client_for(&server)
            .activate_jobs(&ActivateJobsRequest {
                job_type: "charge-credit-card".into(),
                worker: "paybridge".into(),
                timeout: 30_000,
                max_jobs_to_activate: 4,
                request_timeout: 1_000,
            })
            .await
            .unwrap();

        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].key.as_str(), "11");
        assert_eq!(jobs[0].variables, json!({"amount": 5}));
        assert_eq!(jobs[1].key.as_str(), "12");
        assert_eq!(jobs[1].retries, 1);
    }

    #[tokio::test]
    async fn activate_jobs_keeps_readable_jobs_of_a_mixed_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/jobs/activation"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jobs": [
                    {"jobKey": "21", "type": "charge-credit-card", "variables": {}, "retries": 3},
                    {"jobKey": "22", "variables": {}, "retries": 3},
                    {"jobKey": "23", "type": "charge-credit-card", "variables": {}, "retries": 2}
                ]
            })))
            .mount(&server)
            .await;

        let jobs = client_for(&server)
            .activate_jobs(&ActivateJobsRequest {
                job_type: "charge-credit-card".into(),
                worker: "paybridge".into(),
                timeout: 30_000,
                max_jobs_to_activate: 3,
                request_timeout: 1_000,
            })
            .await
            .unwrap();

        let keys: Vec<_> = jobs.iter().map(|job| job.key.as_str()).collect();
        assert_eq!(keys, vec!["21", "23"]);
    }

    #[tokio::test]
    async fn activate_jobs_rejects_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/jobs/activation"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy error</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .activate_jobs(&ActivateJobsRequest {
                job_type: "t".into(),
                worker: "w".into(),
                timeout: 1,
                max_jobs_to_activate: 1,
                request_timeout: 1,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::Decode(_)));
    }

    #[tokio::test]
    async fn complete_job_posts_variables() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/jobs/77/completion"))
            .and(body_json(json!({"variables": {"chargeSuccess": true}})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .complete_job(&Key::new("77"), &vars(json!({"chargeSuccess": true})))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn fail_job_sends_retries_and_backoff() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/jobs/78/failure"))
            .and(body_json(json!({
                "retries": 2,
                "errorMessage": "service returned status 503: busy",
                "retryBackOff": 250
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .with_retry_backoff(250)
            .fail_job(&Key::new("78"), 2, "service returned status 503: busy")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn deploy_resource_uploads_file() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/deployments"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "deploymentKey": "5",
                "deployments": [{"processDefinition": {
                    "processDefinitionId": "paymentV5",
                    "processDefinitionVersion": 1,
                    "processDefinitionKey": "6",
                    "resourceName": "payment.bpmn"
                }}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let resource = dir.path().join("payment.bpmn");
        std::fs::write(&resource, "<definitions/>").unwrap();

        let deployment = client_for(&server).deploy_resource(&resource).await.unwrap();
        assert_eq!(deployment.deployment_key.as_str(), "5");
        assert_eq!(deployment.processes().count(), 1);

        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains("name=\"resources\""));
        assert!(body.contains("filename=\"payment.bpmn\""));
    }

    #[tokio::test]
    async fn deploy_missing_resource_fails_before_request() {
        let server = MockServer::start().await;
        let err = client_for(&server)
            .deploy_resource(Path::new("/nonexistent/payment.bpmn"))
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::Resource { .. }));
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
