//! Persisted records and request/response types.
//!
//! Records reference each other by identity name only. Nothing here carries a
//! private exponent except [`Registration`], which is handed to the registrant
//! once and never stored.

use kdc_crypto::{PrivateExponent, PublicKey};
use serde::{Deserialize, Serialize};

/// A registered identity and its public key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// Unique name
    pub name: String,
    /// RSA public key `(e, n)`
    pub public_key: PublicKey,
}

/// Result of a registration: the stored identity plus its private exponent.
///
/// The only place `d` leaves the KDC. Not serializable.
#[derive(Debug)]
pub struct Registration {
    /// Identity as persisted
    pub identity: Identity,
    /// Private exponent for the registrant to keep
    pub private_exponent: PrivateExponent,
}

/// One session key, wrapped once for each party.
///
/// `from` is the initiator. Direction is kept for the record but lookups
/// treat the pair as unordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionKeyRecord {
    /// Initiator
    pub from: String,
    /// Other party
    pub to: String,
    /// Caller-chosen label
    pub label: String,
    /// Session key encrypted under `from`'s public key
    pub encrypted_for_from: u64,
    /// Session key encrypted under `to`'s public key
    pub encrypted_for_to: u64,
}

impl SessionKeyRecord {
    /// True if `name` is either party.
    pub fn involves(&self, name: &str) -> bool {
        self.from == name || self.to == name
    }

    /// The other party, if `name` is one of the two.
    pub fn partner_of(&self, name: &str) -> Option<&str> {
        if self.from == name {
            Some(&self.to)
        } else if self.to == name {
            Some(&self.from)
        } else {
            None
        }
    }

    /// Ciphertext wrapped for `name`'s public key.
    pub fn ciphertext_for(&self, name: &str) -> Option<u64> {
        if self.from == name {
            Some(self.encrypted_for_from)
        } else if self.to == name {
            Some(self.encrypted_for_to)
        } else {
            None
        }
    }

    /// True if the record is between `a` and `b` in either direction.
    pub fn matches_pair(&self, a: &str, b: &str) -> bool {
        (self.from == a && self.to == b) || (self.from == b && self.to == a)
    }

    /// Both ciphertexts.
    pub fn keys(&self) -> SessionKeys {
        SessionKeys {
            encrypted_for_from: self.encrypted_for_from,
            encrypted_for_to: self.encrypted_for_to,
        }
    }
}

/// Ciphertexts returned when a session is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionKeys {
    /// Session key encrypted for the initiator
    pub encrypted_for_from: u64,
    /// Session key encrypted for the other party
    pub encrypted_for_to: u64,
}

/// A stored message. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedMessage {
    /// Author
    pub sender: String,
    /// Recipient
    pub receiver: String,
    /// Session label, if the message was sent within a session
    pub label: Option<String>,
    /// Caesar ciphertext
    pub ciphertext: String,
}

/// Acknowledgement of a stored message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReceipt {
    /// Position in the global append order
    pub sequence: u64,
}

/// Filter over the message store.
///
/// `None` for `sender` or `label` matches any value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MessageQuery {
    /// Recipient
    pub receiver: String,
    /// Restrict to one sender
    pub sender: Option<String>,
    /// Restrict to one session label
    pub label: Option<String>,
}

impl MessageQuery {
    /// Every message addressed to `receiver`.
    pub fn to(receiver: impl Into<String>) -> Self {
        Self { receiver: receiver.into(), sender: None, label: None }
    }

    /// Restrict to messages from `sender`.
    #[must_use]
    pub fn sent_by(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    /// Restrict to messages under `label`.
    #[must_use]
    pub fn labelled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// True if `message` passes the filter.
    pub fn matches(&self, message: &EncryptedMessage) -> bool {
        message.receiver == self.receiver
            && self.sender.as_ref().is_none_or(|sender| *sender == message.sender)
            && self.label.as_ref().is_none_or(|label| message.label.as_ref() == Some(label))
    }
}

/// A retrieved message with its decryption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadMessage {
    /// Author
    pub sender: String,
    /// Session label
    pub label: Option<String>,
    /// Stored ciphertext
    pub ciphertext: String,
    /// Ciphertext decrypted with the caller's session key
    pub plaintext: String,
}
