//! Reference model for model-based testing.
//!
//! The model is a plain-data reference for the KDC's observable
//! behaviour: who is registered, which sessions exist and which messages each
//! identity has received. It ignores every cryptographic detail. Session keys
//! only matter to the real system, where both parties must recover the same
//! key for a message to read back as it was written.

mod kdc;
mod operation;
mod world;

pub use kdc::{ModelKdc, ModelMessage, ModelSession};
pub use operation::{
    IdentityId, LabelId, NUM_IDENTITIES, NUM_LABELS, Operation, OperationResult, SmallMessage,
    identity_name, label_name,
};
pub use world::{ModelWorld, ObservableState};
