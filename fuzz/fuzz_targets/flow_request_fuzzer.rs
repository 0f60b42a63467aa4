//! Fuzz target for stateless flow requests
//!
//! Feeds arbitrary bytes through JSON decoding of `FlowRequest` and replays
//! the result against a seeded KDC with a fixed population.
//!
//! # Invariants
//!
//! - Decoding and replay NEVER panic
//! - A failed replay is a structured error with a stable kind
//! - Replay never registers identities or creates sessions

#![no_main]

use kdc_core::{ErrorReport, FlowRequest, KdcConfig, KeyCenter, ReadFlow, SendFlow};
use kdc_harness::SimEnv;
use kdc_server::{Kdc, MemoryStorage};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(request) = serde_json::from_slice::<FlowRequest>(data) else {
        return;
    };

    let kdc = Kdc::new(SimEnv::with_seed(0), MemoryStorage::new(), KdcConfig::default());
    let setup = kdc
        .register("alice")
        .and_then(|_| kdc.register("bob"))
        .and_then(|_| kdc.create_session("alice", "bob", "chat1"));
    if setup.is_err() {
        return;
    }

    for result in [
        SendFlow::replay(&kdc, &request).map(|_| ()),
        ReadFlow::replay(&kdc, &request).map(|_| ()),
    ] {
        if let Err(err) = result {
            let report = ErrorReport::from(&err);
            assert_eq!(report.kind, err.kind());
            assert!(serde_json::to_string(&report).is_ok());
        }
    }

    assert_eq!(kdc.list_identities().map(|ids| ids.len()).ok(), Some(2));
    assert_eq!(kdc.storage().session_count().ok(), Some(1));
});
