//! Model KDC - the reference state.

use std::collections::BTreeSet;

use kdc_core::ErrorKind;

/// A session as the model tracks it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ModelSession {
    /// Initiator.
    pub from: String,
    /// Other party.
    pub to: String,
    /// Session label.
    pub label: String,
}

impl ModelSession {
    fn matches_pair(&self, a: &str, b: &str) -> bool {
        (self.from == a && self.to == b) || (self.from == b && self.to == a)
    }

    fn partner_of(&self, name: &str) -> Option<&str> {
        if self.from == name {
            Some(&self.to)
        } else if self.to == name {
            Some(&self.from)
        } else {
            None
        }
    }
}

/// A stored message, kept in plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelMessage {
    /// Sending identity.
    pub sender: String,
    /// Receiving identity.
    pub receiver: String,
    /// Session label, if any.
    pub label: Option<String>,
    /// Message text.
    pub plaintext: String,
}

/// Reference KDC.
///
/// Checks run in the same order as the real KDC, so both report the same
/// error kind for a request that is wrong in several ways at once.
#[derive(Debug, Clone, Default)]
pub struct ModelKdc {
    identities: BTreeSet<String>,
    sessions: Vec<ModelSession>,
    messages: Vec<ModelMessage>,
}

impl ModelKdc {
    /// Create an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered names, sorted.
    pub fn identities(&self) -> &BTreeSet<String> {
        &self.identities
    }

    /// Sessions in creation order.
    pub fn sessions(&self) -> &[ModelSession] {
        &self.sessions
    }

    /// Messages in append order.
    pub fn messages(&self) -> &[ModelMessage] {
        &self.messages
    }

    /// Register `name`.
    pub fn register(&mut self, name: &str) -> Result<(), ErrorKind> {
        if !self.identities.insert(name.to_string()) {
            return Err(ErrorKind::IdentityAlreadyExists);
        }
        Ok(())
    }

    /// Create a session between `from` and `to`.
    pub fn create_session(&mut self, from: &str, to: &str, label: &str) -> Result<(), ErrorKind> {
        if from == to {
            return Err(ErrorKind::SelfSession);
        }
        self.require(from)?;
        self.require(to)?;
        if self.has_session(from, to, label) {
            return Err(ErrorKind::DuplicateLabel);
        }

        self.sessions.push(ModelSession {
            from: from.to_string(),
            to: to.to_string(),
            label: label.to_string(),
        });
        Ok(())
    }

    /// Store a message.
    pub fn send(
        &mut self,
        sender: &str,
        receiver: &str,
        label: Option<&str>,
        plaintext: &str,
    ) -> Result<(), ErrorKind> {
        self.require(sender)?;
        self.require(receiver)?;
        if let Some(label) = label
            && !self.has_session(sender, receiver, label)
        {
            return Err(ErrorKind::SessionNotFound);
        }

        self.messages.push(ModelMessage {
            sender: sender.to_string(),
            receiver: receiver.to_string(),
            label: label.map(str::to_string),
            plaintext: plaintext.to_string(),
        });
        Ok(())
    }

    /// Messages `sender` sent to `receiver` within a session, oldest first.
    pub fn read(&self, receiver: &str, sender: &str, label: &str) -> Result<Vec<String>, ErrorKind> {
        self.require(receiver)?;
        self.require(sender)?;
        if !self.has_session(receiver, sender, label) {
            return Err(ErrorKind::SessionNotFound);
        }

        Ok(self
            .messages
            .iter()
            .filter(|m| m.receiver == receiver && m.sender == sender)
            .filter(|m| m.label.as_deref() == Some(label))
            .map(|m| m.plaintext.clone())
            .collect())
    }

    /// Identities sharing at least one session with `name`.
    pub fn partners(&self, name: &str) -> Result<BTreeSet<String>, ErrorKind> {
        self.require(name)?;
        Ok(self.sessions.iter().filter_map(|s| s.partner_of(name)).map(str::to_string).collect())
    }

    /// Labels of sessions between `name` and `partner`, in either direction.
    pub fn labels(&self, name: &str, partner: &str) -> Result<BTreeSet<String>, ErrorKind> {
        self.require(name)?;
        self.require(partner)?;
        Ok(self
            .sessions
            .iter()
            .filter(|s| s.matches_pair(name, partner))
            .map(|s| s.label.clone())
            .collect())
    }

    /// Identities that have sent anything to `receiver`.
    pub fn senders(&self, receiver: &str) -> Result<BTreeSet<String>, ErrorKind> {
        self.require(receiver)?;
        Ok(self
            .messages
            .iter()
            .filter(|m| m.receiver == receiver)
            .map(|m| m.sender.clone())
            .collect())
    }

    fn require(&self, name: &str) -> Result<(), ErrorKind> {
        if self.identities.contains(name) { Ok(()) } else { Err(ErrorKind::IdentityNotFound) }
    }

    fn has_session(&self, a: &str, b: &str, label: &str) -> bool {
        self.sessions.iter().any(|s| s.label == label && s.matches_pair(a, b))
    }
}
