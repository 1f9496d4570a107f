//! Paybridge: a job worker and ingress that connect a workflow orchestrator
//! to HTTP side-effect services.
//!
//! Payment requests arriving on the ingress start process instances; the
//! orchestrator then dispatches jobs which the [`worker`] executes, resolving
//! each into exactly one complete or fail command via the
//! [`state_machine::OutcomeResolver`].

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod ingress;
pub mod invoker;
pub mod observability;
pub mod orchestrator;
pub mod state_machine;
pub mod worker;

pub use error::{BridgeError, InvocationError};
