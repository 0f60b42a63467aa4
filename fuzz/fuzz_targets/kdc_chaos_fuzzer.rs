//! Fuzz target for the KDC under storage failures
//!
//! Applies arbitrary operation sequences to the reference model and to a real
//! KDC whose storage fails at a fuzzer-chosen rate.
//!
//! # Invariants
//!
//! - The KDC NEVER panics on storage errors
//! - Storage errors surface as transient errors
//! - With failures disabled, real and model results agree exactly
//! - No partial state: every operation that succeeded on the real KDC was
//!   applied to the model, and the stored state matches the model's

#![no_main]

use arbitrary::Arbitrary;
use kdc_core::{ErrorKind, KdcConfig, KeyCenter};
use kdc_harness::{ModelWorld, ObservableState, Operation, SimEnv, identity_name, label_name};
use kdc_server::{ChaoticStorage, Kdc, MemoryStorage};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct ChaosScenario {
    /// Seed for key generation
    seed: u64,
    /// Seed for ChaoticStorage RNG (deterministic failures)
    chaos_seed: u64,
    /// Failure rate 0-9 maps to 0%-90%
    failure_rate_tenth: u8,
    /// Operations to apply
    operations: Vec<Operation>,
}

fuzz_target!(|scenario: ChaosScenario| {
    let failure_rate = f64::from(scenario.failure_rate_tenth % 10) / 10.0;
    let inner = MemoryStorage::new();
    let storage = ChaoticStorage::with_seed(inner, failure_rate, scenario.chaos_seed);
    let kdc = Kdc::new(SimEnv::with_seed(scenario.seed), storage, KdcConfig::default());
    let mut model = ModelWorld::new();

    for op in scenario.operations.iter().take(64) {
        // Only mutating operations are mirrored; reads have no effect on state
        let real = match op {
            Operation::Register { identity } => kdc.register(&identity_name(*identity)).map(|_| ()),
            Operation::CreateSession { from, to, label } => kdc
                .create_session(&identity_name(*from), &identity_name(*to), &label_name(*label))
                .map(|_| ()),
            Operation::SendMessage { sender, receiver, label, content } => kdc
                .send_message(
                    &identity_name(*sender),
                    &identity_name(*receiver),
                    label.map(label_name).as_deref(),
                    &content.to_text(),
                    kdc_crypto::CaesarKey::from_shift(i64::from(content.seed)),
                )
                .map(|_| ()),
            _ => continue,
        };

        match real {
            Ok(()) => assert!(model.apply(op).is_ok(), "real succeeded where model failed: {op:?}"),
            Err(err) if err.kind() == ErrorKind::Storage => assert!(err.is_transient()),
            Err(err) => {
                let expected = model.apply(op);
                assert_eq!(expected, kdc_harness::OperationResult::Error(err.kind()), "{op:?}");
            },
        }
    }

    let real_state = ObservableState::capture(&Kdc::new(
        SimEnv::with_seed(0),
        kdc.storage().inner().clone(),
        KdcConfig::default(),
    ))
    .unwrap();
    assert_eq!(real_state, model.observable_state());
});
