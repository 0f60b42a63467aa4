//! Chaos property tests for the KDC over `ChaoticStorage`.
//!
//! These tests verify that injected storage failures:
//! - Surface as transient `Storage` errors
//! - Never leave a partial record behind
//! - Leave the KDC usable once failures stop

use kdc_core::{ErrorKind, KdcConfig, KeyCenter};
use kdc_harness::SimEnv;
use kdc_server::{ChaoticStorage, Kdc, MemoryStorage, RedbStorage, Storage};
use proptest::prelude::*;
use tempfile::tempdir;

#[test]
fn prop_failed_registrations_write_nothing() {
    proptest!(|(
        failure_rate in 0.0..0.8,
        seed in any::<u64>(),
        count in 1usize..30,
    )| {
        let storage = ChaoticStorage::with_seed(MemoryStorage::new(), failure_rate, seed);
        let kdc = Kdc::new(SimEnv::with_seed(seed), storage, KdcConfig::default());

        let mut registered = Vec::new();
        for i in 0..count {
            let name = format!("user{i}");
            match kdc.register(&name) {
                Ok(_) => registered.push(name),
                Err(err) => {
                    prop_assert_eq!(err.kind(), ErrorKind::Storage);
                    prop_assert!(err.is_transient());
                },
            }
        }

        // ORACLE: exactly the successful registrations are stored
        let stored: Vec<String> =
            kdc.storage().inner().list_identities()?.into_iter().map(|i| i.name).collect();
        registered.sort();
        prop_assert_eq!(stored, registered);
    });
}

#[test]
fn prop_failed_sessions_and_sends_write_nothing() {
    proptest!(|(
        failure_rate in 0.0..0.6,
        seed in any::<u64>(),
        attempts in 1usize..20,
    )| {
        let inner = MemoryStorage::new();
        let setup = Kdc::new(SimEnv::with_seed(seed), inner.clone(), KdcConfig::default());
        let alice = setup.register("alice")?;
        setup.register("bob")?;

        let storage = ChaoticStorage::with_seed(inner.clone(), failure_rate, seed);
        let kdc = Kdc::new(SimEnv::with_seed(seed), storage, KdcConfig::default());

        let mut sessions = 0;
        let mut sent = 0;
        for i in 0..attempts {
            let label = format!("label{i}");
            if kdc.create_session("alice", "bob", &label).is_ok() {
                sessions += 1;

                let key = setup.recover_session_key("alice", "bob", &label, &alice.private_exponent)?;
                if kdc.send_message("alice", "bob", Some(&label), "payload", key).is_ok() {
                    sent += 1;
                }
            }
        }

        // ORACLE: counts match successes, and every stored message reads back
        prop_assert_eq!(inner.session_count()?, sessions);
        prop_assert_eq!(inner.message_count()?, sent);
        for record in inner.sessions_for("alice")? {
            let key = setup.recover_session_key("alice", "bob", &record.label, &alice.private_exponent)?;
            for message in setup.list_messages(&kdc_core::MessageQuery::to("bob").labelled(&record.label), key)? {
                prop_assert_eq!(message.plaintext, "payload");
            }
        }
    });
}

#[test]
fn kdc_usable_after_failures() {
    let inner = MemoryStorage::new();
    let always = Kdc::new(SimEnv::with_seed(1), ChaoticStorage::new(inner.clone(), 1.0), KdcConfig::default());

    let err = always.register("alice").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);
    assert!(inner.list_identities().unwrap().is_empty());

    // same backing store, failures stopped
    let kdc = Kdc::new(SimEnv::with_seed(1), ChaoticStorage::new(inner.clone(), 0.0), KdcConfig::default());
    kdc.register("alice").unwrap();
    kdc.register("bob").unwrap();
    kdc.create_session("alice", "bob", "chat1").unwrap();
    assert_eq!(inner.session_count().unwrap(), 1);
}

#[test]
fn chaos_over_redb_keeps_database_consistent() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("chaos.redb");

    let mut registered = 0;
    {
        let storage = ChaoticStorage::with_seed(RedbStorage::open(&db_path).unwrap(), 0.5, 7);
        let kdc = Kdc::new(SimEnv::with_seed(7), storage, KdcConfig::default());
        for i in 0..40 {
            if kdc.register(&format!("user{i:02}")).is_ok() {
                registered += 1;
            }
        }
        assert!(kdc.storage().failure_count() > 0);
    }

    let storage = RedbStorage::open(&db_path).unwrap();
    assert_eq!(storage.list_identities().unwrap().len(), registered);
}
