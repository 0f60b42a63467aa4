//! Property tests for request validation and flow request expansion.

use kdc_core::{ErrorKind, FlowRequest, FlowStep, KdcConfig, ReadInput, SendInput};
use proptest::prelude::*;

fn step_strategy() -> impl Strategy<Value = FlowStep> {
    prop_oneof![
        Just(FlowStep::Identify),
        Just(FlowStep::SelectPartner),
        Just(FlowStep::SelectLabel),
        Just(FlowStep::Finish),
    ]
}

fn full_request(step: FlowStep, d: u64) -> FlowRequest {
    FlowRequest {
        step,
        username: Some("alice".into()),
        private_exponent: Some(d.to_string()),
        partner: Some("bob".into()),
        label: Some("chat1".into()),
        plaintext: Some("Hello, World!".into()),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: A complete request expands to one input per step reached
    #[test]
    fn prop_inputs_match_step(step in step_strategy(), d in any::<u64>()) {
        let request = full_request(step, d);
        let expected = step as usize + 1;

        prop_assert_eq!(request.send_inputs()?.len(), expected);
        prop_assert_eq!(request.read_inputs()?.len(), expected);
    }

    /// Property: Fields beyond the requested step are never required
    #[test]
    fn prop_later_fields_ignored(d in any::<u64>()) {
        let request = FlowRequest {
            step: FlowStep::Identify,
            username: Some("alice".into()),
            private_exponent: Some(d.to_string()),
            ..FlowRequest::default()
        };

        let inputs = request.send_inputs()?;
        let matched = matches!(&inputs[0], SendInput::Identify { private_exponent, .. } if private_exponent.expose() == d);
        prop_assert!(matched);
        prop_assert_eq!(request.read_inputs()?, vec![ReadInput::Identify { username: "alice".into() }]);
    }

    /// Property: The first missing field is named in the error
    #[test]
    fn prop_missing_field_named(step in step_strategy(), d in any::<u64>(), drop in 0usize..3) {
        prop_assume!(step > FlowStep::Identify);
        let mut request = full_request(step, d);
        let field = match drop {
            0 => { request.partner = None; "partner" },
            1 => { request.label = None; "label" },
            _ => { request.plaintext = None; "plaintext" },
        };

        let needed = match field {
            "partner" => FlowStep::SelectPartner,
            "label" => FlowStep::SelectLabel,
            _ => FlowStep::Finish,
        };
        match request.send_inputs() {
            Ok(_) => prop_assert!(step < needed),
            Err(err) => {
                prop_assert!(step >= needed);
                prop_assert_eq!(err.kind(), ErrorKind::InvalidInput);
                prop_assert!(err.to_string().contains(field));
            },
        }
    }

    /// Property: Any name within the length limit and free of control
    /// characters is accepted
    #[test]
    fn prop_valid_names_accepted(name in "[^\\p{Cc}]{1,50}") {
        let config = KdcConfig::default();
        prop_assert!(config.validate_name("name", &name).is_ok());
    }

    /// Property: Names over the limit are rejected whatever they contain
    #[test]
    fn prop_long_names_rejected(name in "[a-z]{51,80}") {
        let config = KdcConfig::default();
        let err = config.validate_name("name", &name).unwrap_err();
        prop_assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}

#[test]
fn request_deserializes_from_partial_json() {
    let request: FlowRequest =
        serde_json::from_str(r#"{"step":"select_partner","username":"bob","private_exponent":"7","partner":"alice"}"#)
            .unwrap();

    assert_eq!(request.step, FlowStep::SelectPartner);
    assert_eq!(request.label, None);
    assert_eq!(request.read_inputs().unwrap().len(), 2);

    // the exponent never shows in debug output
    assert!(!format!("{request:?}").contains('7'));
}
