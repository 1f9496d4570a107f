//! HTTP entry point that starts payment process instances.
//!
//! Fire-and-forget: `202 Accepted` only means the orchestrator accepted the
//! start command, not that the payment went through.

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::orchestrator::{OrchestratorClient, OrchestratorError, VariableSet};

pub const PAYMENT_PATH: &str = "/payment";

#[derive(Clone)]
pub struct IngressState {
    client: Arc<dyn OrchestratorClient>,
    process_id: Arc<str>,
}

impl IngressState {
    pub fn new(client: Arc<dyn OrchestratorClient>, process_id: impl Into<Arc<str>>) -> Self {
        Self {
            client,
            process_id: process_id.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum IngressError {
    #[error("malformed payment request: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("could not start process instance: {0}")]
    Start(#[from] OrchestratorError),
}

impl IntoResponse for IngressError {
    fn into_response(self) -> Response {
        tracing::warn!(error = %self, "payment request not accepted");
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}

/// `POST /payment` and `GET /health`, traced per request.
pub fn router(state: IngressState) -> Router {
    Router::new()
        .route(PAYMENT_PATH, post(start_payment))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the ingress on `listener` until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    state: IngressState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn start_payment(
    State(state): State<IngressState>,
    body: Bytes,
) -> Result<StatusCode, IngressError> {
    let variables = decode_body(&body)?;
    tracing::info!(variables = variables.len(), "payment request received");

    let instance = state
        .client
        .start_instance(&state.process_id, &variables)
        .await?;
    tracing::info!(
        instance = %instance.process_instance_key,
        process = %state.process_id,
        "process instance started"
    );
    Ok(StatusCode::ACCEPTED)
}

async fn health() -> &'static str {
    "ok"
}

/// An empty body starts the instance without variables.
fn decode_body(body: &[u8]) -> Result<VariableSet, serde_json::Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(VariableSet::new());
    }
    serde_json::from_slice(body)
}
