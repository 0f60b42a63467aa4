//! KDC server.
//!
//! Production glue around [`kdc_core`]: the storage-backed protocol logic
//! ([`Kdc`]), persistence backends and the OS-backed environment. The `kdc`
//! binary drives it from the command line.
//!
//! # Components
//!
//! - [`Kdc`]: Protocol logic, generic over environment and storage
//! - [`Storage`]: Directory, session ledger and message store
//! - [`RedbStorage`]: Durable backend (survives restarts)
//! - [`MemoryStorage`]: In-memory backend for tests and simulation
//! - [`ChaoticStorage`]: Fault-injecting wrapper for chaos tests
//! - [`SystemEnv`]: Production environment (OS RNG)

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod kdc;
pub mod storage;
mod system_env;

pub use kdc::Kdc;
pub use storage::{ChaoticStorage, InsertOutcome, MemoryStorage, RedbStorage, Storage, StorageError};
pub use system_env::SystemEnv;
