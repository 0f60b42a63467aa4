//! Storage abstraction for the KDC
//!
//! Directory, session ledger and message store behind one synchronous trait.
//! Every mutation is a single atomic operation: uniqueness checks happen in
//! the same critical section (lock or write transaction) as the insert.

mod chaotic;
mod error;
mod memory;
mod redb;

pub use chaotic::ChaoticStorage;
pub use error::StorageError;
use kdc_core::{EncryptedMessage, Identity, MessageQuery, SessionKeyRecord};
pub use memory::MemoryStorage;

pub use self::redb::RedbStorage;

/// Whether an insert stored its record or hit an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Record stored
    Inserted,
    /// A conflicting record already existed; nothing was written
    Duplicate,
}

/// Storage abstraction for identities, session keys and messages
///
/// Must be Clone (shared between request handlers), Send + Sync
/// (thread-safe), and synchronous (no async methods). Implementations share
/// internal state via Arc, so clones access the same underlying storage.
///
/// Nothing stored through this trait ever contains a private exponent.
pub trait Storage: Clone + Send + Sync + 'static {
    /// Insert an identity unless the name is taken.
    fn insert_identity(&self, identity: &Identity) -> Result<InsertOutcome, StorageError>;

    /// Identity by name. `None` if unregistered.
    fn load_identity(&self, name: &str) -> Result<Option<Identity>, StorageError>;

    /// All identities, ordered by name.
    fn list_identities(&self) -> Result<Vec<Identity>, StorageError>;

    /// Insert a session record unless the unordered pair already has its label.
    ///
    /// # Invariants
    ///
    /// - At most one record per `{from, to}` pair and label, regardless of
    ///   direction
    fn insert_session(&self, record: &SessionKeyRecord) -> Result<InsertOutcome, StorageError>;

    /// Session between `a` and `b` (either direction) under `label`.
    fn find_session(
        &self,
        a: &str,
        b: &str,
        label: &str,
    ) -> Result<Option<SessionKeyRecord>, StorageError>;

    /// Every session `name` takes part in, in either role. Order is not
    /// guaranteed.
    fn sessions_for(&self, name: &str) -> Result<Vec<SessionKeyRecord>, StorageError>;

    /// Append a message and return its sequence number.
    ///
    /// # Invariants
    ///
    /// - Sequence numbers start at 0 and increase by one per message
    fn append_message(&self, message: &EncryptedMessage) -> Result<u64, StorageError>;

    /// Messages matching `query`, in append order.
    fn load_messages(&self, query: &MessageQuery) -> Result<Vec<EncryptedMessage>, StorageError>;
}

/// Direction-independent key for a session: `lo \0 hi \0 label`.
///
/// Names and labels never contain control characters, so `\0` cannot be
/// forged from either component.
pub(crate) fn session_key(a: &str, b: &str, label: &str) -> String {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    format!("{lo}\0{hi}\0{label}")
}
