//! Model-based property tests.
//!
//! These tests generate random operation sequences and verify that the real
//! KDC behaves identically to the reference model.
//!
//! # Architecture
//!
//! ```text
//! proptest generates: Vec<Operation>
//!                          │
//!           ┌──────────────┼──────────────┐
//!           ▼              ▼              ▼
//!      ModelWorld    RealWorld      Compare
//!      (reference)   (Kdc + memory) Results
//! ```

use std::collections::HashMap;

use kdc_core::{KdcConfig, KeyCenter, MessageQuery};
use kdc_crypto::{CaesarKey, PrivateExponent};
use kdc_harness::{
    ModelWorld, ObservableState, Operation, OperationResult, SimEnv, SmallMessage, identity_name,
    label_name,
};
use kdc_server::{Kdc, MemoryStorage};
use proptest::prelude::*;

/// Real system wrapper that mirrors ModelWorld's interface.
///
/// Holds the private exponent handed out at each registration, the way a
/// user would keep it.
struct RealWorld {
    kdc: Kdc<SimEnv, MemoryStorage>,
    exponents: HashMap<String, PrivateExponent>,
}

impl RealWorld {
    fn new(seed: u64) -> Self {
        let kdc = Kdc::new(SimEnv::with_seed(seed), MemoryStorage::new(), KdcConfig::default());
        Self { kdc, exponents: HashMap::new() }
    }

    /// Exponent of `name`, or a placeholder for names that never registered.
    fn exponent(&self, name: &str) -> PrivateExponent {
        PrivateExponent::new(self.exponents.get(name).map_or(1, PrivateExponent::expose))
    }

    fn apply(&mut self, op: &Operation) -> OperationResult {
        match op {
            Operation::Register { identity } => {
                let name = identity_name(*identity);
                match self.kdc.register(&name) {
                    Ok(registration) => {
                        self.exponents.insert(name, registration.private_exponent);
                        OperationResult::Ok
                    },
                    Err(err) => OperationResult::Error(err.kind()),
                }
            },
            Operation::CreateSession { from, to, label } => OperationResult::from_result(
                self.kdc.create_session(&identity_name(*from), &identity_name(*to), &label_name(*label)),
                |_| OperationResult::Ok,
            ),
            Operation::SendMessage { sender, receiver, label, content } => {
                self.apply_send(&identity_name(*sender), &identity_name(*receiver), *label, *content)
            },
            Operation::ReadMessages { receiver, sender, label } => {
                let receiver = identity_name(*receiver);
                let d = self.exponent(&receiver);
                OperationResult::from_result(
                    self.kdc.read_messages(&receiver, &identity_name(*sender), &label_name(*label), &d),
                    |messages| {
                        OperationResult::Messages(messages.into_iter().map(|m| m.plaintext).collect())
                    },
                )
            },
            Operation::ListPartners { identity } => OperationResult::from_result(
                self.kdc.list_partners(&identity_name(*identity)),
                OperationResult::Names,
            ),
            Operation::ListLabels { identity, partner } => OperationResult::from_result(
                self.kdc.list_labels(&identity_name(*identity), &identity_name(*partner)),
                OperationResult::Names,
            ),
            Operation::ListSenders { receiver } => OperationResult::from_result(
                self.kdc.list_senders(&identity_name(*receiver)),
                OperationResult::Names,
            ),
        }
    }

    fn apply_send(
        &mut self,
        sender: &str,
        receiver: &str,
        label: Option<u8>,
        content: SmallMessage,
    ) -> OperationResult {
        let label = label.map(label_name);
        let key = match &label {
            Some(label) => {
                let d = self.exponent(sender);
                match self.kdc.recover_session_key(sender, receiver, label, &d) {
                    Ok(key) => key,
                    Err(err) => return OperationResult::Error(err.kind()),
                }
            },
            None => CaesarKey::from_shift(i64::from(content.seed)),
        };

        OperationResult::from_result(
            self.kdc.send_message(sender, receiver, label.as_deref(), &content.to_text(), key),
            |_| OperationResult::Ok,
        )
    }

    fn observable_state(&self) -> ObservableState {
        ObservableState::capture(&self.kdc).unwrap()
    }
}

/// Strategy for generating operations.
///
/// Registrations are weighted up so most sequences get past the
/// identity checks.
fn operation_strategy() -> impl Strategy<Value = Operation> {
    let id = any::<u8>();
    let label = any::<u8>();
    let content = (any::<u8>(), any::<u8>())
        .prop_map(|(seed, size_class)| SmallMessage { seed, size_class });

    prop_oneof![
        4 => id.clone().prop_map(|identity| Operation::Register { identity }),
        4 => (id.clone(), id.clone(), label.clone())
            .prop_map(|(from, to, label)| Operation::CreateSession { from, to, label }),
        5 => (id.clone(), id.clone(), prop::option::of(label.clone()), content).prop_map(
            |(sender, receiver, label, content)| Operation::SendMessage {
                sender,
                receiver,
                label,
                content
            }
        ),
        3 => (id.clone(), id.clone(), label)
            .prop_map(|(receiver, sender, label)| Operation::ReadMessages { receiver, sender, label }),
        1 => id.clone().prop_map(|identity| Operation::ListPartners { identity }),
        1 => (id.clone(), id.clone())
            .prop_map(|(identity, partner)| Operation::ListLabels { identity, partner }),
        1 => id.prop_map(|receiver| Operation::ListSenders { receiver }),
    ]
}

proptest! {
    /// Operation results and final state match between model and real KDC.
    #[test]
    fn prop_model_matches_real(
        seed in any::<u64>(),
        ops in prop::collection::vec(operation_strategy(), 0..60)
    ) {
        let mut model = ModelWorld::new();
        let mut real = RealWorld::new(seed);

        for (i, op) in ops.iter().enumerate() {
            let model_result = model.apply(op);
            let real_result = real.apply(op);

            prop_assert_eq!(
                &model_result,
                &real_result,
                "Divergence at operation {}: {:?}",
                i, op
            );
        }

        prop_assert_eq!(model.observable_state(), real.observable_state());
    }

    /// Every stored message is readable by its receiver, in send order.
    #[test]
    fn prop_labelled_messages_read_back(
        seed in any::<u64>(),
        contents in prop::collection::vec((any::<u8>(), any::<u8>()), 1..10)
    ) {
        let mut real = RealWorld::new(seed);
        real.apply(&Operation::Register { identity: 0 });
        real.apply(&Operation::Register { identity: 1 });
        let created = real.apply(&Operation::CreateSession { from: 0, to: 1, label: 0 });
        prop_assert!(created.is_ok());

        let mut expected = Vec::new();
        for (seed, size_class) in contents {
            let content = SmallMessage { seed, size_class };
            let sent = real.apply(&Operation::SendMessage {
                sender: 0,
                receiver: 1,
                label: Some(0),
                content,
            });
            prop_assert!(sent.is_ok());
            expected.push(content.to_text());
        }

        let read = real.apply(&Operation::ReadMessages { receiver: 1, sender: 0, label: 0 });
        prop_assert_eq!(read, OperationResult::Messages(expected));

        // the sender's own inbox stays empty
        let inbox = real.kdc.list_messages(&MessageQuery::to("user0"), CaesarKey::from_shift(0)).unwrap();
        prop_assert!(inbox.is_empty());
    }
}

#[cfg(test)]
mod smoke_tests {
    use kdc_core::ErrorKind;

    use super::*;

    #[test]
    fn model_and_real_agree_on_basic_flow() {
        let ops = [
            Operation::Register { identity: 0 },
            Operation::Register { identity: 1 },
            Operation::Register { identity: 0 },
            Operation::CreateSession { from: 0, to: 1, label: 0 },
            Operation::CreateSession { from: 1, to: 0, label: 0 },
            Operation::CreateSession { from: 2, to: 2, label: 0 },
            Operation::SendMessage {
                sender: 0,
                receiver: 1,
                label: Some(0),
                content: SmallMessage { seed: 9, size_class: 2 },
            },
            Operation::SendMessage {
                sender: 0,
                receiver: 1,
                label: Some(1),
                content: SmallMessage { seed: 9, size_class: 2 },
            },
            Operation::ReadMessages { receiver: 1, sender: 0, label: 0 },
            Operation::ListSenders { receiver: 1 },
        ];

        let mut model = ModelWorld::new();
        let mut real = RealWorld::new(17);
        let results: Vec<_> = ops.iter().map(|op| (model.apply(op), real.apply(op))).collect();

        for (model_result, real_result) in &results {
            assert_eq!(model_result, real_result);
        }
        assert_eq!(results[2].0, OperationResult::Error(ErrorKind::IdentityAlreadyExists));
        assert_eq!(results[4].0, OperationResult::Error(ErrorKind::DuplicateLabel));
        assert_eq!(results[5].0, OperationResult::Error(ErrorKind::SelfSession));
        assert_eq!(results[7].0, OperationResult::Error(ErrorKind::SessionNotFound));
        assert_eq!(model.observable_state(), real.observable_state());
    }
}
