//! Business bodies for the job types this bridge serves.

use async_trait::async_trait;
use rand::Rng;
use serde_json::Value;

use crate::error::InvocationError;
use crate::invoker::HttpInvoker;
use crate::orchestrator::{Job, VariableSet};

pub const CHARGE_CREDIT_CARD: &str = "charge-credit-card";
pub const DEDUCT_CUSTOMER_CREDIT: &str = "deduct-customer-credit";

/// Work performed for one job.
///
/// Returns the business result on success. Success flags and retry handling
/// are added afterwards by the worker's resolver.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &Job, variables: VariableSet)
    -> Result<VariableSet, InvocationError>;
}

/// Charges the card by forwarding the job's variables to the charge service.
pub struct ChargeCreditCard {
    invoker: HttpInvoker,
}

impl ChargeCreditCard {
    pub fn new(invoker: HttpInvoker) -> Self {
        Self { invoker }
    }
}

#[async_trait]
impl JobHandler for ChargeCreditCard {
    async fn handle(
        &self,
        _job: &Job,
        variables: VariableSet,
    ) -> Result<VariableSet, InvocationError> {
        self.invoker.invoke(&variables).await?;
        Ok(VariableSet::new())
    }
}

/// Decides what is left of the customer's credit after a deduction.
pub trait CreditDecision: Send + Sync {
    fn remaining_amount(&self, variables: &VariableSet) -> i64;
}

/// Leaves 5 units of credit 60% of the time and nothing otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomCredit;

impl CreditDecision for RandomCredit {
    fn remaining_amount(&self, _variables: &VariableSet) -> i64 {
        if rand::thread_rng().gen_range(0..10) > 3 { 5 } else { 0 }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedCredit(pub i64);

impl CreditDecision for FixedCredit {
    fn remaining_amount(&self, _variables: &VariableSet) -> i64 {
        self.0
    }
}

/// Deducts from the customer's account balance. Computed locally, no external call.
pub struct DeductCustomerCredit<D = RandomCredit> {
    decision: D,
}

impl DeductCustomerCredit {
    pub fn new() -> Self {
        Self::with_decision(RandomCredit)
    }
}

impl Default for DeductCustomerCredit {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: CreditDecision> DeductCustomerCredit<D> {
    pub fn with_decision(decision: D) -> Self {
        Self { decision }
    }
}

#[async_trait]
impl<D: CreditDecision> JobHandler for DeductCustomerCredit<D> {
    async fn handle(
        &self,
        job: &Job,
        variables: VariableSet,
    ) -> Result<VariableSet, InvocationError> {
        let remaining = self.decision.remaining_amount(&variables);
        tracing::info!(key = %job.key, remaining, "deducting from customer account");

        let mut result = VariableSet::new();
        result.insert("remainingAmount".into(), Value::from(remaining));
        Ok(result)
    }
}
