//! Operations for model-based testing.
//!
//! Operations are generated randomly (by proptest or from fuzzer bytes) and
//! applied to both the model and the real implementation.

use std::collections::BTreeSet;

use arbitrary::Arbitrary;
use kdc_core::ErrorKind;

/// Identity index. Any value maps onto a small pool of names.
pub type IdentityId = u8;

/// Session label index. Any value maps onto a small pool of labels.
pub type LabelId = u8;

/// Size of the identity name pool.
pub const NUM_IDENTITIES: u8 = 4;

/// Size of the label pool.
pub const NUM_LABELS: u8 = 3;

/// Name for an identity index.
///
/// The pool is kept small so generated sequences hit duplicates and
/// existing sessions often.
pub fn identity_name(id: IdentityId) -> String {
    format!("user{}", id % NUM_IDENTITIES)
}

/// Label for a label index.
pub fn label_name(id: LabelId) -> String {
    format!("label{}", id % NUM_LABELS)
}

/// Operations that can be applied to the system.
#[derive(Debug, Clone, Arbitrary)]
pub enum Operation {
    /// Register an identity.
    Register {
        /// Identity to register.
        identity: IdentityId,
    },

    /// Issue a session key between two identities.
    CreateSession {
        /// Initiator.
        from: IdentityId,
        /// Other party.
        to: IdentityId,
        /// Session label.
        label: LabelId,
    },

    /// Send a message.
    ///
    /// Labelled messages are encrypted under the session key the sender
    /// recovers. Unlabelled messages use a key derived from the content.
    SendMessage {
        /// Sending identity.
        sender: IdentityId,
        /// Receiving identity.
        receiver: IdentityId,
        /// Session the message belongs to, if any.
        label: Option<LabelId>,
        /// Message content.
        content: SmallMessage,
    },

    /// Receiver recovers the session key and decrypts its messages.
    ReadMessages {
        /// Receiving identity (unlocks with its private exponent).
        receiver: IdentityId,
        /// Sending identity.
        sender: IdentityId,
        /// Session label.
        label: LabelId,
    },

    /// List the identities sharing a session with `identity`.
    ListPartners {
        /// Identity to look up.
        identity: IdentityId,
    },

    /// List session labels between two identities.
    ListLabels {
        /// Identity to look up.
        identity: IdentityId,
        /// Other party.
        partner: IdentityId,
    },

    /// List the identities that have sent messages to `receiver`.
    ListSenders {
        /// Receiving identity.
        receiver: IdentityId,
    },
}

/// Small message content for testing.
#[derive(Debug, Clone, Copy, Arbitrary)]
pub struct SmallMessage {
    /// Content seed. Also the shift for unlabelled messages.
    pub seed: u8,
    /// Length hint (0-3 maps to tiny/short/medium/long).
    pub size_class: u8,
}

impl SmallMessage {
    const CHARSET: &'static [u8] = b"abcxyzABCXYZ ,.!?09";

    /// Expand to message text. Never empty.
    pub fn to_text(&self) -> String {
        let len = match self.size_class % 4 {
            0 => 1,
            1 => 5,
            2 => 13,
            _ => 40,
        };

        (0..len)
            .map(|i| {
                let index = (usize::from(self.seed) + i) % Self::CHARSET.len();
                char::from(Self::CHARSET[index])
            })
            .collect()
    }
}

/// Result of applying an operation.
///
/// Compared in full between model and real system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResult {
    /// Operation succeeded with nothing to report.
    Ok,

    /// A listing of names (partners, labels or senders).
    Names(BTreeSet<String>),

    /// Decrypted message texts, oldest first.
    Messages(Vec<String>),

    /// Operation failed.
    Error(ErrorKind),
}

impl OperationResult {
    /// Returns true unless the operation failed.
    pub fn is_ok(&self) -> bool {
        !matches!(self, Self::Error(_))
    }

    /// Build a result from a real operation's outcome.
    pub fn from_result<T>(
        result: Result<T, kdc_core::KdcError>,
        map: impl FnOnce(T) -> Self,
    ) -> Self {
        match result {
            Ok(value) => map(value),
            Err(err) => Self::Error(err.kind()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_wrap_into_pool() {
        assert_eq!(identity_name(1), identity_name(1 + NUM_IDENTITIES));
        assert_eq!(label_name(0), "label0");
        assert_eq!(label_name(NUM_LABELS), "label0");
    }

    #[test]
    fn messages_are_never_empty() {
        for seed in 0..=u8::MAX {
            for size_class in 0..4 {
                assert!(!SmallMessage { seed, size_class }.to_text().is_empty());
            }
        }
    }
}
