//! Deterministic simulation harness for KDC testing.
//!
//! A seeded [`Environment`](kdc_core::env::Environment) so key generation and
//! session keys replay exactly from a seed, plus a reference model of the KDC.
//!
//! # Model-Based Testing
//!
//! The `model` module provides a reference implementation for model-based
//! testing. Operations are applied to both the model and the real [`Kdc`]
//! (`kdc_server::Kdc`), and their results and observable states are compared.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod model;
pub mod sim_env;

pub use model::{
    IdentityId, LabelId, ModelKdc, ModelWorld, ObservableState, Operation, OperationResult,
    SmallMessage, identity_name, label_name,
};
pub use sim_env::SimEnv;
