pub mod handlers;
pub mod registry;

pub use handlers::{
    CHARGE_CREDIT_CARD, ChargeCreditCard, CreditDecision, DEDUCT_CUSTOMER_CREDIT,
    DeductCustomerCredit, FixedCredit, JobHandler, RandomCredit,
};
pub use registry::{JobWorker, Subscription, WorkerConfig};
