//! The KDC service interface.
//!
//! Implemented by the storage-backed server. Flows are written against this
//! trait, so they run unchanged over any backend.

use std::collections::BTreeSet;

use kdc_crypto::{CaesarKey, PrivateExponent};

use crate::{
    error::KdcError,
    model::{Identity, MessageQuery, MessageReceipt, ReadMessage, Registration, SessionKeys},
};

/// Operations of a key distribution center.
///
/// Every operation is stateless: it depends only on its arguments and the
/// persisted records. Private exponents are accepted as input and never
/// retained.
pub trait KeyCenter {
    /// Generate a keypair for `name`, persist the public half and hand back
    /// the private exponent.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if the name fails validation
    /// - `IdentityAlreadyExists` if the name is taken
    fn register(&self, name: &str) -> Result<Registration, KdcError>;

    /// Issue a fresh Caesar key for `from` and `to` under `label`, wrapped
    /// once for each party.
    ///
    /// # Errors
    ///
    /// - `SelfSession` if `from == to`
    /// - `IdentityNotFound` if either party is unregistered
    /// - `DuplicateLabel` if the pair already has `label`, in either direction
    fn create_session(&self, from: &str, to: &str, label: &str) -> Result<SessionKeys, KdcError>;

    /// Unwrap the session key `identity` shares with `partner` under `label`.
    ///
    /// # Errors
    ///
    /// - `IdentityNotFound` if either party is unregistered
    /// - `SessionNotFound` if the pair has no session under `label`
    /// - `SessionKeyRecovery` if `d` does not yield a valid Caesar key
    fn recover_session_key(
        &self,
        identity: &str,
        partner: &str,
        label: &str,
        private_exponent: &PrivateExponent,
    ) -> Result<CaesarKey, KdcError>;

    /// Caesar-encrypt `plaintext` with `key` and append it to the store.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if a field fails validation
    /// - `IdentityNotFound` if either party is unregistered
    /// - `SessionNotFound` if `label` is given but no such session exists
    fn send_message(
        &self,
        sender: &str,
        receiver: &str,
        label: Option<&str>,
        plaintext: &str,
        key: CaesarKey,
    ) -> Result<MessageReceipt, KdcError>;

    /// Messages matching `query` in send order, each decrypted with `key`.
    ///
    /// # Errors
    ///
    /// - `IdentityNotFound` if the receiver is unregistered
    fn list_messages(&self, query: &MessageQuery, key: CaesarKey) -> Result<Vec<ReadMessage>, KdcError>;

    /// Identities sharing at least one session with `identity`.
    ///
    /// # Errors
    ///
    /// - `IdentityNotFound` if `identity` is unregistered
    fn list_partners(&self, identity: &str) -> Result<BTreeSet<String>, KdcError>;

    /// Labels of sessions between `identity` and `partner`, either direction.
    ///
    /// # Errors
    ///
    /// - `IdentityNotFound` if either party is unregistered
    fn list_labels(&self, identity: &str, partner: &str) -> Result<BTreeSet<String>, KdcError>;

    /// Identities that have sent at least one message to `receiver`.
    ///
    /// # Errors
    ///
    /// - `IdentityNotFound` if `receiver` is unregistered
    fn list_senders(&self, receiver: &str) -> Result<BTreeSet<String>, KdcError>;

    /// Every registered identity, ordered by name.
    ///
    /// # Errors
    ///
    /// - `Storage` on backend failure
    fn list_identities(&self) -> Result<Vec<Identity>, KdcError>;

    /// Recover the key for `(receiver, sender, label)` and decrypt every
    /// matching message. All or nothing: a bad exponent yields no messages.
    ///
    /// # Errors
    ///
    /// - Any error of [`KeyCenter::recover_session_key`]
    fn read_messages(
        &self,
        receiver: &str,
        sender: &str,
        label: &str,
        private_exponent: &PrivateExponent,
    ) -> Result<Vec<ReadMessage>, KdcError> {
        let key = self.recover_session_key(receiver, sender, label, private_exponent)?;
        let query = MessageQuery::to(receiver).sent_by(sender).labelled(label);
        self.list_messages(&query, key)
    }
}
