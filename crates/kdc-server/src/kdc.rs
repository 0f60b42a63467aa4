//! KDC protocol logic over a storage backend.
//!
//! [`Kdc`] validates requests, draws randomness from its [`Environment`] and
//! persists through its [`Storage`]. It holds no per-request state: every
//! call is reconstructed from its arguments plus what the storage holds.
//!
//! Records are written only after every check has passed, and each write is a
//! single atomic storage operation, so a failed request leaves no trace.

use std::collections::BTreeSet;

use kdc_core::{
    EncryptedMessage, Identity, KdcConfig, KdcError, KeyCenter, MessageQuery, MessageReceipt,
    ReadMessage, Registration, SessionKeyRecord, SessionKeys, config::validate_plaintext,
    env::Environment,
};
use kdc_crypto::{CaesarKey, PrivateExponent, generate_keypair};

use crate::storage::{InsertOutcome, Storage};

/// Key distribution center.
///
/// Generic over the environment (randomness) and storage so the same logic
/// runs against `SystemEnv` + `RedbStorage` in production and a seeded
/// environment + `MemoryStorage` in simulation.
#[derive(Clone)]
pub struct Kdc<E: Environment, S: Storage> {
    env: E,
    storage: S,
    config: KdcConfig,
}

impl<E: Environment, S: Storage> Kdc<E, S> {
    /// Create a KDC over `storage`.
    pub fn new(env: E, storage: S, config: KdcConfig) -> Self {
        Self { env, storage, config }
    }

    /// Underlying storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Active configuration.
    pub fn config(&self) -> &KdcConfig {
        &self.config
    }

    fn require_identity(&self, name: &str) -> Result<Identity, KdcError> {
        self.storage
            .load_identity(name)?
            .ok_or_else(|| reject(KdcError::IdentityNotFound(name.to_string())))
    }
}

impl<E: Environment, S: Storage> KeyCenter for Kdc<E, S> {
    fn register(&self, name: &str) -> Result<Registration, KdcError> {
        self.config.validate_name("name", name).map_err(reject)?;

        let keys = generate_keypair(&mut self.env.rng(), &self.config.prime_range)?;
        let (public_key, private_exponent) = keys.into_parts();
        let identity = Identity { name: name.to_string(), public_key };

        match self.storage.insert_identity(&identity)? {
            InsertOutcome::Inserted => {
                tracing::info!(
                    identity = %name,
                    e = public_key.e,
                    n = public_key.n,
                    "Registered identity"
                );
                Ok(Registration { identity, private_exponent })
            },
            InsertOutcome::Duplicate => Err(reject(KdcError::IdentityAlreadyExists(name.to_string()))),
        }
    }

    fn create_session(&self, from: &str, to: &str, label: &str) -> Result<SessionKeys, KdcError> {
        self.config.validate_name("from", from).map_err(reject)?;
        self.config.validate_name("to", to).map_err(reject)?;
        self.config.validate_label(label).map_err(reject)?;

        if from == to {
            return Err(reject(KdcError::SelfSession(from.to_string())));
        }

        let initiator = self.require_identity(from)?;
        let partner = self.require_identity(to)?;

        let key = CaesarKey::random(&mut self.env.rng());
        let record = SessionKeyRecord {
            from: from.to_string(),
            to: to.to_string(),
            label: label.to_string(),
            encrypted_for_from: initiator.public_key.encrypt(u64::from(key.value())),
            encrypted_for_to: partner.public_key.encrypt(u64::from(key.value())),
        };

        match self.storage.insert_session(&record)? {
            InsertOutcome::Inserted => {
                tracing::info!(from = %from, to = %to, label = %label, "Created session");
                Ok(record.keys())
            },
            InsertOutcome::Duplicate => Err(reject(KdcError::DuplicateLabel {
                from: from.to_string(),
                to: to.to_string(),
                label: label.to_string(),
            })),
        }
    }

    fn recover_session_key(
        &self,
        identity: &str,
        partner: &str,
        label: &str,
        private_exponent: &PrivateExponent,
    ) -> Result<CaesarKey, KdcError> {
        let owner = self.require_identity(identity)?;
        self.require_identity(partner)?;

        let not_found = || KdcError::SessionNotFound {
            identity: identity.to_string(),
            partner: partner.to_string(),
            label: label.to_string(),
        };
        let record = self.storage.find_session(identity, partner, label)?.ok_or_else(|| reject(not_found()))?;
        let ciphertext = record.ciphertext_for(identity).ok_or_else(|| reject(not_found()))?;

        // RSA is a bijection on Z_n, so re-encrypting pins the exact plaintext.
        let value = private_exponent.decrypt(ciphertext, owner.public_key.n);
        if owner.public_key.encrypt(value) != ciphertext {
            return Err(reject(KdcError::SessionKeyRecovery {
                reason: "private exponent does not unwrap the session key".to_string(),
            }));
        }
        let key = CaesarKey::try_from(value).map_err(|err| reject(err.into()))?;

        tracing::debug!(identity = %identity, partner = %partner, label = %label, "Recovered session key");
        Ok(key)
    }

    fn send_message(
        &self,
        sender: &str,
        receiver: &str,
        label: Option<&str>,
        plaintext: &str,
        key: CaesarKey,
    ) -> Result<MessageReceipt, KdcError> {
        validate_plaintext(plaintext).map_err(reject)?;
        if let Some(label) = label {
            self.config.validate_label(label).map_err(reject)?;
        }

        self.require_identity(sender)?;
        self.require_identity(receiver)?;

        if let Some(label) = label
            && self.storage.find_session(sender, receiver, label)?.is_none()
        {
            return Err(reject(KdcError::SessionNotFound {
                identity: sender.to_string(),
                partner: receiver.to_string(),
                label: label.to_string(),
            }));
        }

        let message = EncryptedMessage {
            sender: sender.to_string(),
            receiver: receiver.to_string(),
            label: label.map(str::to_string),
            ciphertext: key.encrypt(plaintext),
        };
        let sequence = self.storage.append_message(&message)?;

        tracing::info!(
            sender = %sender,
            receiver = %receiver,
            label = ?label,
            sequence,
            "Stored message"
        );
        Ok(MessageReceipt { sequence })
    }

    fn list_messages(&self, query: &MessageQuery, key: CaesarKey) -> Result<Vec<ReadMessage>, KdcError> {
        self.require_identity(&query.receiver)?;

        let messages = self.storage.load_messages(query)?;
        tracing::debug!(
            receiver = %query.receiver,
            sender = ?query.sender,
            label = ?query.label,
            count = messages.len(),
            "Loaded messages"
        );

        Ok(messages
            .into_iter()
            .map(|message| ReadMessage {
                plaintext: key.decrypt(&message.ciphertext),
                sender: message.sender,
                label: message.label,
                ciphertext: message.ciphertext,
            })
            .collect())
    }

    fn list_partners(&self, identity: &str) -> Result<BTreeSet<String>, KdcError> {
        self.require_identity(identity)?;

        let partners: BTreeSet<String> = self
            .storage
            .sessions_for(identity)?
            .iter()
            .filter_map(|record| record.partner_of(identity).map(str::to_string))
            .collect();

        tracing::debug!(identity = %identity, count = partners.len(), "Listed partners");
        Ok(partners)
    }

    fn list_labels(&self, identity: &str, partner: &str) -> Result<BTreeSet<String>, KdcError> {
        self.require_identity(identity)?;
        self.require_identity(partner)?;

        let labels: BTreeSet<String> = self
            .storage
            .sessions_for(identity)?
            .into_iter()
            .filter(|record| record.matches_pair(identity, partner))
            .map(|record| record.label)
            .collect();

        tracing::debug!(identity = %identity, partner = %partner, count = labels.len(), "Listed labels");
        Ok(labels)
    }

    fn list_senders(&self, receiver: &str) -> Result<BTreeSet<String>, KdcError> {
        self.require_identity(receiver)?;

        let senders: BTreeSet<String> = self
            .storage
            .load_messages(&MessageQuery::to(receiver))?
            .into_iter()
            .map(|message| message.sender)
            .collect();

        tracing::debug!(receiver = %receiver, count = senders.len(), "Listed senders");
        Ok(senders)
    }

    fn list_identities(&self) -> Result<Vec<Identity>, KdcError> {
        Ok(self.storage.list_identities()?)
    }
}

/// Log a rejected request and pass the error through.
fn reject(err: KdcError) -> KdcError {
    tracing::warn!(kind = %err.kind(), error = %err, "Rejected request");
    err
}
