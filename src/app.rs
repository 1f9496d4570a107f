//! Composition: builds the worker and ingress from configuration around one
//! shared orchestrator client.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::BridgeConfig;
use crate::ingress::IngressState;
use crate::invoker::HttpInvoker;
use crate::orchestrator::{OrchestratorClient, RestOrchestratorClient};
use crate::state_machine::{OutcomeResolver, SuccessFlag};
use crate::worker::{
    CHARGE_CREDIT_CARD, ChargeCreditCard, DEDUCT_CUSTOMER_CREDIT, DeductCustomerCredit, JobWorker,
};

/// Build the orchestrator client shared by the worker and the ingress.
pub fn connect(config: &BridgeConfig) -> Result<Arc<dyn OrchestratorClient>> {
    let client = RestOrchestratorClient::new(&config.orchestrator_url, config.request_timeout())
        .context("failed to build orchestrator client")?
        .with_retry_backoff(config.retry_backoff_ms);
    Ok(Arc::new(client))
}

/// Register the payment job handlers on a new worker.
pub fn build_worker(config: &BridgeConfig, client: Arc<dyn OrchestratorClient>) -> Result<JobWorker> {
    let resolver = OutcomeResolver::new(SuccessFlag::new(&config.success_flag));
    let invoker = HttpInvoker::new(&config.charge_url, config.request_timeout())
        .context("failed to build charge client")?;

    let mut worker = JobWorker::new(client, config.worker());
    worker
        .register(CHARGE_CREDIT_CARD, ChargeCreditCard::new(invoker), resolver.clone())?
        .register(DEDUCT_CUSTOMER_CREDIT, DeductCustomerCredit::new(), resolver)?;
    Ok(worker)
}

/// State for the payment ingress, starting instances of the configured process.
pub fn ingress_state(config: &BridgeConfig, client: Arc<dyn OrchestratorClient>) -> IngressState {
    IngressState::new(client, config.process_id.as_str())
}
