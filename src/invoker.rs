//! Side-effect invoker: one outbound HTTP call per job attempt.
//!
//! Retries are never performed here; a failed call is reported once and the
//! retry decision is left to [`crate::state_machine::OutcomeResolver`].

use std::time::Duration;

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;

use crate::error::InvocationError;
use crate::orchestrator::VariableSet;

pub struct HttpInvoker {
    client: Client,
    url: String,
}

impl HttpInvoker {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// POST `variables` as a JSON object. Any 2xx counts as success.
    pub async fn invoke(&self, variables: &VariableSet) -> Result<(), InvocationError> {
        let payload = serde_json::to_vec(variables)?;
        tracing::debug!(url = %self.url, bytes = payload.len(), "invoking side effect");

        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(InvocationError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }
}
