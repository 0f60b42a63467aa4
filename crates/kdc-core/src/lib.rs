//! KDC protocol core.
//!
//! Domain types, the error taxonomy and the send/read flows of the key
//! distribution center. No I/O: storage and randomness are supplied by the
//! server crate through [`KeyCenter`] and [`env::Environment`].
//!
//! # Protocol
//!
//! ```text
//! register(name) ──> Identity { name, (e, n) } persisted, d returned once
//!
//! create_session(A, B, label)
//!     k ← uniform [0, 26)
//!     SessionKeyRecord { k^eA mod nA, k^eB mod nB } persisted
//!
//! send:  recover k = c^dA mod nA, store caesar(plaintext, k)
//! read:  recover k = c^dB mod nB, decrypt every (A → B, label) message
//! ```
//!
//! The KDC never stores a private exponent. Whoever supplies `d` proves
//! nothing beyond being able to unwrap the session key.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod env;
mod error;
pub mod flow;
pub mod model;
mod service;

pub use config::KdcConfig;
pub use error::{ErrorKind, ErrorReport, KdcError};
pub use flow::{
    FlowRequest, FlowStep, ReadFlow, ReadInput, ReadOutput, ReadState, SendFlow, SendInput, SendOutput,
    SendState,
};
pub use model::{
    EncryptedMessage, Identity, MessageQuery, MessageReceipt, ReadMessage, Registration, SessionKeyRecord,
    SessionKeys,
};
pub use service::KeyCenter;
