//! Chaotic storage wrapper for fault injection testing
//!
//! Storage wrapper that randomly fails operations before they reach the inner
//! backend. A failed operation writes nothing, so chaos tests can check that
//! the KDC never leaves partial state behind and stays usable afterwards.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use kdc_core::{EncryptedMessage, Identity, MessageQuery, SessionKeyRecord};

use super::{InsertOutcome, Storage, StorageError};

/// Seed used by [`ChaoticStorage::new`].
const DEFAULT_CHAOS_SEED: u64 = 0x4B44_435F_4348_414F;

/// Chaotic storage wrapper that randomly injects failures
///
/// Delegates to an underlying storage implementation but fails each operation
/// with probability `failure_rate`. The decision sequence comes from a seeded
/// LCG, so a run is reproducible from its seed.
#[derive(Clone)]
pub struct ChaoticStorage<S: Storage> {
    inner: S,
    /// Failure rate (0.0 = never fail, 1.0 = always fail)
    failure_rate: f64,
    rng: Arc<Mutex<ChaoticRng>>,
    operation_count: Arc<AtomicUsize>,
    failure_count: Arc<AtomicUsize>,
}

/// Linear congruential generator (Numerical Recipes constants).
struct ChaoticRng {
    state: u64,
}

impl ChaoticRng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Next value in [0.0, 1.0)
    fn next(&mut self) -> f64 {
        const A: u64 = 1_664_525;
        const C: u64 = 1_013_904_223;
        const M: u64 = 1u64 << 32;

        self.state = (A.wrapping_mul(self.state).wrapping_add(C)) % M;
        (self.state as f64) / (M as f64)
    }
}

impl<S: Storage> ChaoticStorage<S> {
    /// Wrap `inner` with the default seed.
    ///
    /// # Panics
    ///
    /// Panics if `failure_rate` is not in [0.0, 1.0]
    pub fn new(inner: S, failure_rate: f64) -> Self {
        Self::with_seed(inner, failure_rate, DEFAULT_CHAOS_SEED)
    }

    /// Wrap `inner` with an explicit seed for reproducible chaos.
    ///
    /// # Panics
    ///
    /// Panics if `failure_rate` is not in [0.0, 1.0]
    pub fn with_seed(inner: S, failure_rate: f64, seed: u64) -> Self {
        assert!(
            (0.0..=1.0).contains(&failure_rate),
            "failure_rate must be between 0.0 and 1.0, got {failure_rate}"
        );

        Self {
            inner,
            failure_rate,
            rng: Arc::new(Mutex::new(ChaoticRng::new(seed))),
            operation_count: Arc::new(AtomicUsize::new(0)),
            failure_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Underlying storage (for checking invariants after chaos).
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Total number of storage operations attempted.
    pub fn operation_count(&self) -> usize {
        self.operation_count.load(Ordering::Relaxed)
    }

    /// Number of operations that were failed on purpose.
    pub fn failure_count(&self) -> usize {
        self.failure_count.load(Ordering::Relaxed)
    }

    /// Count the operation and decide whether it fails.
    fn inject(&self) -> Result<(), StorageError> {
        self.operation_count.fetch_add(1, Ordering::Relaxed);

        let roll = self.rng.lock().map_err(|_| StorageError::Poisoned)?.next();
        if roll < self.failure_rate {
            self.failure_count.fetch_add(1, Ordering::Relaxed);
            return Err(StorageError::Io("chaotic failure injection".to_string()));
        }
        Ok(())
    }
}

impl<S: Storage> Storage for ChaoticStorage<S> {
    fn insert_identity(&self, identity: &Identity) -> Result<InsertOutcome, StorageError> {
        self.inject()?;
        self.inner.insert_identity(identity)
    }

    fn load_identity(&self, name: &str) -> Result<Option<Identity>, StorageError> {
        self.inject()?;
        self.inner.load_identity(name)
    }

    fn list_identities(&self) -> Result<Vec<Identity>, StorageError> {
        self.inject()?;
        self.inner.list_identities()
    }

    fn insert_session(&self, record: &SessionKeyRecord) -> Result<InsertOutcome, StorageError> {
        self.inject()?;
        self.inner.insert_session(record)
    }

    fn find_session(
        &self,
        a: &str,
        b: &str,
        label: &str,
    ) -> Result<Option<SessionKeyRecord>, StorageError> {
        self.inject()?;
        self.inner.find_session(a, b, label)
    }

    fn sessions_for(&self, name: &str) -> Result<Vec<SessionKeyRecord>, StorageError> {
        self.inject()?;
        self.inner.sessions_for(name)
    }

    fn append_message(&self, message: &EncryptedMessage) -> Result<u64, StorageError> {
        self.inject()?;
        self.inner.append_message(message)
    }

    fn load_messages(&self, query: &MessageQuery) -> Result<Vec<EncryptedMessage>, StorageError> {
        self.inject()?;
        self.inner.load_messages(query)
    }
}
