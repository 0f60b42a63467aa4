//! Model world - applies operations to the model KDC.
//!
//! The world is the oracle against which the real implementation is
//! verified.

use std::collections::{BTreeMap, BTreeSet};

use kdc_core::{KdcError, KeyCenter, MessageQuery, env::Environment};
use kdc_server::{Kdc, Storage};

use super::{
    kdc::ModelKdc,
    operation::{Operation, OperationResult, identity_name, label_name},
};

/// Observable state for oracle comparison.
///
/// The subset of KDC state that can be read back from both the model and
/// the real implementation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservableState {
    /// Registered names, sorted.
    pub identities: Vec<String>,
    /// Sessions as (from, to, label).
    pub sessions: BTreeSet<(String, String, String)>,
    /// Per receiver, (sender, label) of each message in append order.
    pub inboxes: BTreeMap<String, Vec<(String, Option<String>)>>,
}

impl ObservableState {
    /// Read the observable state of a real KDC.
    pub fn capture<E: Environment, S: Storage>(kdc: &Kdc<E, S>) -> Result<Self, KdcError> {
        let mut state = Self::default();

        for identity in kdc.list_identities()? {
            let name = identity.name;

            for record in kdc.storage().sessions_for(&name)? {
                state.sessions.insert((record.from, record.to, record.label));
            }

            let inbox = kdc
                .storage()
                .load_messages(&MessageQuery::to(&name))?
                .into_iter()
                .map(|message| (message.sender, message.label))
                .collect();
            state.inboxes.insert(name.clone(), inbox);
            state.identities.push(name);
        }

        Ok(state)
    }
}

/// Model world - the reference implementation.
#[derive(Debug, Clone, Default)]
pub struct ModelWorld {
    kdc: ModelKdc,
}

impl ModelWorld {
    /// Create an empty world.
    pub fn new() -> Self {
        Self::default()
    }

    /// The model KDC.
    pub fn kdc(&self) -> &ModelKdc {
        &self.kdc
    }

    /// Apply an operation and return the result.
    ///
    /// The result should match the real implementation's result exactly.
    pub fn apply(&mut self, op: &Operation) -> OperationResult {
        let result = match op {
            Operation::Register { identity } => {
                self.kdc.register(&identity_name(*identity)).map(|()| OperationResult::Ok)
            },
            Operation::CreateSession { from, to, label } => self
                .kdc
                .create_session(&identity_name(*from), &identity_name(*to), &label_name(*label))
                .map(|()| OperationResult::Ok),
            Operation::SendMessage { sender, receiver, label, content } => self
                .kdc
                .send(
                    &identity_name(*sender),
                    &identity_name(*receiver),
                    label.map(label_name).as_deref(),
                    &content.to_text(),
                )
                .map(|()| OperationResult::Ok),
            Operation::ReadMessages { receiver, sender, label } => self
                .kdc
                .read(&identity_name(*receiver), &identity_name(*sender), &label_name(*label))
                .map(OperationResult::Messages),
            Operation::ListPartners { identity } => {
                self.kdc.partners(&identity_name(*identity)).map(OperationResult::Names)
            },
            Operation::ListLabels { identity, partner } => self
                .kdc
                .labels(&identity_name(*identity), &identity_name(*partner))
                .map(OperationResult::Names),
            Operation::ListSenders { receiver } => {
                self.kdc.senders(&identity_name(*receiver)).map(OperationResult::Names)
            },
        };

        result.unwrap_or_else(OperationResult::Error)
    }

    /// Extract observable state for comparison.
    pub fn observable_state(&self) -> ObservableState {
        let mut inboxes: BTreeMap<String, Vec<(String, Option<String>)>> =
            self.kdc.identities().iter().map(|name| (name.clone(), Vec::new())).collect();
        for message in self.kdc.messages() {
            if let Some(inbox) = inboxes.get_mut(&message.receiver) {
                inbox.push((message.sender.clone(), message.label.clone()));
            }
        }

        ObservableState {
            identities: self.kdc.identities().iter().cloned().collect(),
            sessions: self
                .kdc
                .sessions()
                .iter()
                .map(|s| (s.from.clone(), s.to.clone(), s.label.clone()))
                .collect(),
            inboxes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SmallMessage;

    #[test]
    fn unregistered_sender_fails() {
        let mut world = ModelWorld::new();
        world.apply(&Operation::Register { identity: 1 });

        let result = world.apply(&Operation::SendMessage {
            sender: 0,
            receiver: 1,
            label: None,
            content: SmallMessage { seed: 0, size_class: 1 },
        });
        assert_eq!(result, OperationResult::Error(kdc_core::ErrorKind::IdentityNotFound));
        assert!(world.observable_state().inboxes["user1"].is_empty());
    }

    #[test]
    fn session_round_trip() {
        let mut world = ModelWorld::new();
        world.apply(&Operation::Register { identity: 0 });
        world.apply(&Operation::Register { identity: 1 });
        assert!(world.apply(&Operation::CreateSession { from: 0, to: 1, label: 2 }).is_ok());

        let content = SmallMessage { seed: 3, size_class: 2 };
        world.apply(&Operation::SendMessage { sender: 1, receiver: 0, label: Some(2), content });

        let read = world.apply(&Operation::ReadMessages { receiver: 0, sender: 1, label: 2 });
        assert_eq!(read, OperationResult::Messages(vec![content.to_text()]));
    }
}
