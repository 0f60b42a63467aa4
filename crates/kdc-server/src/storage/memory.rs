use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard},
};

use kdc_core::{EncryptedMessage, Identity, MessageQuery, SessionKeyRecord};

use super::{InsertOutcome, Storage, StorageError, session_key};

/// In-memory storage implementation for testing and simulation
///
/// `BTreeMap`s keyed by name and by direction-free session key, plus a `Vec`
/// for the append-only message log. All state sits behind one
/// `Arc<Mutex<>>`, so every operation is atomic and clones share state. A
/// poisoned lock surfaces as [`StorageError::Poisoned`].
#[derive(Clone)]
pub struct MemoryStorage {
    inner: Arc<Mutex<MemoryStorageInner>>,
}

#[derive(Default)]
struct MemoryStorageInner {
    identities: BTreeMap<String, Identity>,

    /// Keyed by [`session_key`]
    sessions: BTreeMap<String, SessionKeyRecord>,

    /// Index is the sequence number
    messages: Vec<EncryptedMessage>,
}

impl MemoryStorage {
    /// Create a new empty `MemoryStorage`
    pub fn new() -> Self {
        Self { inner: Arc::new(Mutex::new(MemoryStorageInner::default())) }
    }

    /// Number of stored session records.
    ///
    /// # Errors
    ///
    /// - `Poisoned` if a thread panicked while holding the lock
    pub fn session_count(&self) -> Result<usize, StorageError> {
        Ok(self.lock()?.sessions.len())
    }

    /// Number of stored messages.
    ///
    /// # Errors
    ///
    /// - `Poisoned` if a thread panicked while holding the lock
    pub fn message_count(&self) -> Result<usize, StorageError> {
        Ok(self.lock()?.messages.len())
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryStorageInner>, StorageError> {
        self.inner.lock().map_err(|_| StorageError::Poisoned)
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for MemoryStorage {
    fn insert_identity(&self, identity: &Identity) -> Result<InsertOutcome, StorageError> {
        let mut inner = self.lock()?;

        if inner.identities.contains_key(&identity.name) {
            return Ok(InsertOutcome::Duplicate);
        }
        inner.identities.insert(identity.name.clone(), identity.clone());

        Ok(InsertOutcome::Inserted)
    }

    fn load_identity(&self, name: &str) -> Result<Option<Identity>, StorageError> {
        Ok(self.lock()?.identities.get(name).cloned())
    }

    fn list_identities(&self) -> Result<Vec<Identity>, StorageError> {
        Ok(self.lock()?.identities.values().cloned().collect())
    }

    fn insert_session(&self, record: &SessionKeyRecord) -> Result<InsertOutcome, StorageError> {
        let mut inner = self.lock()?;

        let key = session_key(&record.from, &record.to, &record.label);
        if inner.sessions.contains_key(&key) {
            return Ok(InsertOutcome::Duplicate);
        }
        inner.sessions.insert(key, record.clone());

        Ok(InsertOutcome::Inserted)
    }

    fn find_session(
        &self,
        a: &str,
        b: &str,
        label: &str,
    ) -> Result<Option<SessionKeyRecord>, StorageError> {
        Ok(self.lock()?.sessions.get(&session_key(a, b, label)).cloned())
    }

    fn sessions_for(&self, name: &str) -> Result<Vec<SessionKeyRecord>, StorageError> {
        let inner = self.lock()?;
        Ok(inner.sessions.values().filter(|record| record.involves(name)).cloned().collect())
    }

    fn append_message(&self, message: &EncryptedMessage) -> Result<u64, StorageError> {
        let mut inner = self.lock()?;

        let sequence = inner.messages.len() as u64;
        inner.messages.push(message.clone());

        debug_assert_eq!(inner.messages.len() as u64, sequence + 1);
        Ok(sequence)
    }

    fn load_messages(&self, query: &MessageQuery) -> Result<Vec<EncryptedMessage>, StorageError> {
        let inner = self.lock()?;
        Ok(inner.messages.iter().filter(|message| query.matches(message)).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use kdc_crypto::PublicKey;

    use super::*;

    fn identity(name: &str) -> Identity {
        Identity { name: name.into(), public_key: PublicKey { e: 7, n: 3233 } }
    }

    fn session(from: &str, to: &str, label: &str) -> SessionKeyRecord {
        SessionKeyRecord {
            from: from.into(),
            to: to.into(),
            label: label.into(),
            encrypted_for_from: 1,
            encrypted_for_to: 2,
        }
    }

    fn message(sender: &str, receiver: &str, text: &str) -> EncryptedMessage {
        EncryptedMessage {
            sender: sender.into(),
            receiver: receiver.into(),
            label: Some("chat1".into()),
            ciphertext: text.into(),
        }
    }

    #[test]
    fn identity_names_are_unique() {
        let storage = MemoryStorage::new();

        assert_eq!(storage.insert_identity(&identity("alice")).unwrap(), InsertOutcome::Inserted);
        assert_eq!(storage.insert_identity(&identity("alice")).unwrap(), InsertOutcome::Duplicate);
        assert_eq!(storage.load_identity("alice").unwrap(), Some(identity("alice")));
        assert_eq!(storage.load_identity("bob").unwrap(), None);
    }

    #[test]
    fn identities_listed_by_name() {
        let storage = MemoryStorage::new();
        for name in ["carol", "alice", "bob"] {
            storage.insert_identity(&identity(name)).unwrap();
        }

        let names: Vec<String> =
            storage.list_identities().unwrap().into_iter().map(|i| i.name).collect();
        assert_eq!(names, ["alice", "bob", "carol"]);
    }

    #[test]
    fn reverse_session_is_duplicate() {
        let storage = MemoryStorage::new();

        assert_eq!(storage.insert_session(&session("alice", "bob", "L")).unwrap(), InsertOutcome::Inserted);
        assert_eq!(storage.insert_session(&session("bob", "alice", "L")).unwrap(), InsertOutcome::Duplicate);
        assert_eq!(storage.insert_session(&session("bob", "alice", "M")).unwrap(), InsertOutcome::Inserted);
        assert_eq!(storage.session_count().unwrap(), 2);

        let found = storage.find_session("bob", "alice", "L").unwrap().unwrap();
        assert_eq!(found.from, "alice");
    }

    #[test]
    fn sessions_for_either_role() {
        let storage = MemoryStorage::new();
        storage.insert_session(&session("alice", "bob", "L")).unwrap();
        storage.insert_session(&session("carol", "alice", "M")).unwrap();
        storage.insert_session(&session("bob", "carol", "N")).unwrap();

        assert_eq!(storage.sessions_for("alice").unwrap().len(), 2);
        assert_eq!(storage.sessions_for("dave").unwrap().len(), 0);
    }

    #[test]
    fn messages_keep_append_order() {
        let storage = MemoryStorage::new();

        assert_eq!(storage.append_message(&message("alice", "bob", "one")).unwrap(), 0);
        assert_eq!(storage.append_message(&message("carol", "bob", "two")).unwrap(), 1);
        assert_eq!(storage.append_message(&message("alice", "bob", "three")).unwrap(), 2);

        let from_alice = storage.load_messages(&MessageQuery::to("bob").sent_by("alice")).unwrap();
        let texts: Vec<&str> = from_alice.iter().map(|m| m.ciphertext.as_str()).collect();
        assert_eq!(texts, ["one", "three"]);
        assert_eq!(storage.message_count().unwrap(), 3);
    }

    #[test]
    fn clones_share_state() {
        let storage = MemoryStorage::new();
        let clone = storage.clone();

        clone.insert_identity(&identity("alice")).unwrap();
        assert!(storage.load_identity("alice").unwrap().is_some());
    }

    #[test]
    fn poisoned_lock_is_an_error() {
        let storage = MemoryStorage::new();
        let clone = storage.clone();

        let _ = std::thread::spawn(move || {
            let _guard = clone.inner.lock();
            panic!("poison the lock");
        })
        .join();

        assert_eq!(storage.load_identity("alice"), Err(StorageError::Poisoned));
    }
}
