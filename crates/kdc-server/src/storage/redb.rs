//! Redb-backed durable storage implementation.
//!
//! Uses Redb's ACID transactions with Copy-on-Write for crash safety. Each
//! insert runs its uniqueness check inside the same write transaction, and
//! Redb serializes write transactions, so check-then-insert is atomic.

use std::{path::Path, sync::Arc};

use kdc_core::{EncryptedMessage, Identity, MessageQuery, SessionKeyRecord};
use redb::{Database, ReadableTable, TableDefinition};
use serde::{Serialize, de::DeserializeOwned};

use super::{InsertOutcome, Storage, StorageError, session_key};

/// Table: identities
/// Key: identity name
/// Value: CBOR-encoded Identity
const IDENTITIES: TableDefinition<&str, &[u8]> = TableDefinition::new("identities");

/// Table: sessions
/// Key: direction-free session key (`lo \0 hi \0 label`)
/// Value: CBOR-encoded SessionKeyRecord
const SESSIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("sessions");

/// Table: messages
/// Key: sequence number
/// Value: CBOR-encoded EncryptedMessage
const MESSAGES: TableDefinition<u64, &[u8]> = TableDefinition::new("messages");

/// Durable storage backed by Redb.
///
/// Thread-safe through Redb's internal locking. Clone is cheap (Arc).
#[derive(Clone)]
pub struct RedbStorage {
    db: Arc<Database>,
}

impl RedbStorage {
    /// Open or create a Redb database at the given path.
    ///
    /// Creates tables if they don't exist (IDENTITIES, SESSIONS, MESSAGES).
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the database cannot be opened or created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let db = Database::create(path.as_ref()).map_err(|e| StorageError::Io(e.to_string()))?;

        let txn = db.begin_write().map_err(|e| StorageError::Io(e.to_string()))?;
        {
            let _ = txn.open_table(IDENTITIES).map_err(|e| StorageError::Io(e.to_string()))?;
            let _ = txn.open_table(SESSIONS).map_err(|e| StorageError::Io(e.to_string()))?;
            let _ = txn.open_table(MESSAGES).map_err(|e| StorageError::Io(e.to_string()))?;
        }
        txn.commit().map_err(|e| StorageError::Io(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Insert `value` under `key` in `table` unless the key exists.
    fn insert_unique<T: Serialize>(
        &self,
        table: TableDefinition<'static, &'static str, &'static [u8]>,
        key: &str,
        value: &T,
    ) -> Result<InsertOutcome, StorageError> {
        let bytes = encode(value)?;

        let txn = self.db.begin_write().map_err(|e| StorageError::Io(e.to_string()))?;
        let outcome = {
            let mut table = txn.open_table(table).map_err(|e| StorageError::Io(e.to_string()))?;

            let exists = table.get(key).map_err(|e| StorageError::Io(e.to_string()))?.is_some();
            if exists {
                InsertOutcome::Duplicate
            } else {
                table.insert(key, bytes.as_slice()).map_err(|e| StorageError::Io(e.to_string()))?;
                InsertOutcome::Inserted
            }
        };

        match outcome {
            InsertOutcome::Inserted => txn.commit().map_err(|e| StorageError::Io(e.to_string()))?,
            InsertOutcome::Duplicate => txn.abort().map_err(|e| StorageError::Io(e.to_string()))?,
        }

        Ok(outcome)
    }

    /// Decode every value of a string-keyed table, in key order.
    fn load_all<T: DeserializeOwned>(
        &self,
        table: TableDefinition<'static, &'static str, &'static [u8]>,
    ) -> Result<Vec<T>, StorageError> {
        let txn = self.db.begin_read().map_err(|e| StorageError::Io(e.to_string()))?;
        let table = txn.open_table(table).map_err(|e| StorageError::Io(e.to_string()))?;

        let mut values = Vec::new();
        for result in table.iter().map_err(|e| StorageError::Io(e.to_string()))? {
            let (_, value) = result.map_err(|e| StorageError::Io(e.to_string()))?;
            values.push(decode(value.value())?);
        }

        Ok(values)
    }
}

impl Storage for RedbStorage {
    fn insert_identity(&self, identity: &Identity) -> Result<InsertOutcome, StorageError> {
        self.insert_unique(IDENTITIES, &identity.name, identity)
    }

    fn load_identity(&self, name: &str) -> Result<Option<Identity>, StorageError> {
        let txn = self.db.begin_read().map_err(|e| StorageError::Io(e.to_string()))?;
        let table = txn.open_table(IDENTITIES).map_err(|e| StorageError::Io(e.to_string()))?;

        match table.get(name).map_err(|e| StorageError::Io(e.to_string()))? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }

    fn list_identities(&self) -> Result<Vec<Identity>, StorageError> {
        self.load_all(IDENTITIES)
    }

    fn insert_session(&self, record: &SessionKeyRecord) -> Result<InsertOutcome, StorageError> {
        let key = session_key(&record.from, &record.to, &record.label);
        self.insert_unique(SESSIONS, &key, record)
    }

    fn find_session(
        &self,
        a: &str,
        b: &str,
        label: &str,
    ) -> Result<Option<SessionKeyRecord>, StorageError> {
        let txn = self.db.begin_read().map_err(|e| StorageError::Io(e.to_string()))?;
        let table = txn.open_table(SESSIONS).map_err(|e| StorageError::Io(e.to_string()))?;

        let key = session_key(a, b, label);
        match table.get(key.as_str()).map_err(|e| StorageError::Io(e.to_string()))? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }

    fn sessions_for(&self, name: &str) -> Result<Vec<SessionKeyRecord>, StorageError> {
        let sessions: Vec<SessionKeyRecord> = self.load_all(SESSIONS)?;
        Ok(sessions.into_iter().filter(|record| record.involves(name)).collect())
    }

    fn append_message(&self, message: &EncryptedMessage) -> Result<u64, StorageError> {
        let bytes = encode(message)?;

        let txn = self.db.begin_write().map_err(|e| StorageError::Io(e.to_string()))?;
        let sequence = {
            let mut table = txn.open_table(MESSAGES).map_err(|e| StorageError::Io(e.to_string()))?;

            let sequence = table
                .last()
                .map_err(|e| StorageError::Io(e.to_string()))?
                .map_or(0, |(key, _)| key.value() + 1);

            table.insert(sequence, bytes.as_slice()).map_err(|e| StorageError::Io(e.to_string()))?;
            sequence
        };
        txn.commit().map_err(|e| StorageError::Io(e.to_string()))?;

        Ok(sequence)
    }

    fn load_messages(&self, query: &MessageQuery) -> Result<Vec<EncryptedMessage>, StorageError> {
        let txn = self.db.begin_read().map_err(|e| StorageError::Io(e.to_string()))?;
        let table = txn.open_table(MESSAGES).map_err(|e| StorageError::Io(e.to_string()))?;

        let mut messages = Vec::new();
        for result in table.iter().map_err(|e| StorageError::Io(e.to_string()))? {
            let (_, value) = result.map_err(|e| StorageError::Io(e.to_string()))?;
            let message: EncryptedMessage = decode(value.value())?;
            if query.matches(&message) {
                messages.push(message);
            }
        }

        Ok(messages)
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StorageError> {
    let mut bytes = Vec::new();
    ciborium::into_writer(value, &mut bytes).map_err(|e| StorageError::Serialization(e.to_string()))?;
    Ok(bytes)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StorageError> {
    ciborium::from_reader(bytes).map_err(|e| StorageError::Serialization(e.to_string()))
}
