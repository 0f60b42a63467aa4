//! Send and read flows as explicit state machines.
//!
//! Each flow consumes typed inputs one step at a time and calls into a
//! [`KeyCenter`]. Any error resets the flow to its first step. A stateless
//! front end rebuilds a flow from a [`FlowRequest`] with `replay`, feeding it
//! every input up to the requested step.
//!
//! # Send flow
//!
//! ```text
//! ┌──────────────────┐ Identify  ┌─────────────────┐ SelectPartner ┌───────────────┐
//! │ AwaitingIdentity │──────────>│ AwaitingPartner │──────────────>│ AwaitingLabel │
//! └──────────────────┘           └─────────────────┘               └───────────────┘
//!          ↑                                                               │ SelectLabel
//!          │ any error                                                     ↓ (key recovered)
//!          │                      ┌──────┐          Compose            ┌───────┐
//!          └──────────────────────│ Sent │<────────────────────────────│ Ready │
//!                                 └──────┘  (Compose again from Sent)  └───────┘
//! ```
//!
//! # Read flow
//!
//! ```text
//! AwaitingIdentity ─Identify─> AwaitingSender ─SelectSender─> AwaitingLabel
//!     ─SelectLabel─> AwaitingKey ─Unlock─> Messages
//! ```

use std::{collections::BTreeSet, fmt, mem};

use kdc_crypto::{CaesarKey, PrivateExponent};
use serde::{Deserialize, Serialize};

use crate::{
    error::KdcError,
    model::{MessageReceipt, ReadMessage},
    service::KeyCenter,
};

/// Send flow state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SendState {
    /// Waiting for the sender to identify
    #[default]
    AwaitingIdentity,
    /// Sender known, waiting for a partner
    AwaitingPartner {
        /// Sender
        username: String,
        /// Sender's private exponent, held until the key is recovered
        private_exponent: PrivateExponent,
    },
    /// Partner chosen, waiting for a session label
    AwaitingLabel {
        /// Sender
        username: String,
        /// Sender's private exponent
        private_exponent: PrivateExponent,
        /// Receiver
        partner: String,
    },
    /// Session key recovered, ready to encrypt
    Ready {
        /// Sender
        username: String,
        /// Receiver
        partner: String,
        /// Session label
        label: String,
        /// Recovered session key
        key: CaesarKey,
    },
    /// At least one message sent in this session
    Sent {
        /// Sender
        username: String,
        /// Receiver
        partner: String,
        /// Session label
        label: String,
        /// Recovered session key
        key: CaesarKey,
        /// Receipt of the latest message
        receipt: MessageReceipt,
    },
}

impl SendState {
    fn name(&self) -> &'static str {
        match self {
            Self::AwaitingIdentity => "awaiting identity",
            Self::AwaitingPartner { .. } => "awaiting partner",
            Self::AwaitingLabel { .. } => "awaiting label",
            Self::Ready { .. } => "ready",
            Self::Sent { .. } => "sent",
        }
    }
}

/// Inputs accepted by [`SendFlow`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendInput {
    /// Sender name and private exponent. Accepted in any state; restarts the flow.
    Identify {
        /// Sender
        username: String,
        /// Sender's private exponent
        private_exponent: PrivateExponent,
    },
    /// Receiver
    SelectPartner(String),
    /// Session label
    SelectLabel(String),
    /// Message text to encrypt and store
    Compose(String),
}

impl fmt::Display for SendInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Identify { .. } => "identify",
            Self::SelectPartner(_) => "select partner",
            Self::SelectLabel(_) => "select label",
            Self::Compose(_) => "compose",
        })
    }
}

/// What a send step produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutput {
    /// Identities the sender shares a session with
    Partners(BTreeSet<String>),
    /// Labels of sessions with the chosen partner
    Labels(BTreeSet<String>),
    /// Session key recovered; ready to compose
    KeyRecovered,
    /// Message stored
    Sent(MessageReceipt),
}

/// Session-aware message sending.
#[derive(Debug, Clone, Default)]
pub struct SendFlow {
    state: SendState,
}

impl SendFlow {
    /// A flow at its first step.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn state(&self) -> &SendState {
        &self.state
    }

    /// Apply one input.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if the input is not accepted in the current state
    /// - Any error from the [`KeyCenter`] call the step makes
    ///
    /// On error the flow is back at [`SendState::AwaitingIdentity`].
    pub fn handle<K: KeyCenter + ?Sized>(
        &mut self,
        center: &K,
        input: SendInput,
    ) -> Result<SendOutput, KdcError> {
        let state = mem::take(&mut self.state);
        let (next, output) = Self::transition(center, state, input)?;
        self.state = next;
        Ok(output)
    }

    /// Rebuild a flow from a stateless request and run it to `request.step`.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if a field required by the step is missing
    /// - Any error from the steps replayed
    pub fn replay<K: KeyCenter + ?Sized>(
        center: &K,
        request: &FlowRequest,
    ) -> Result<(Self, SendOutput), KdcError> {
        let mut flow = Self::new();
        let mut last = None;
        for input in request.send_inputs()? {
            last = Some(flow.handle(center, input)?);
        }
        let output = last.ok_or_else(|| KdcError::invalid("step", "nothing to replay"))?;
        Ok((flow, output))
    }

    fn transition<K: KeyCenter + ?Sized>(
        center: &K,
        state: SendState,
        input: SendInput,
    ) -> Result<(SendState, SendOutput), KdcError> {
        match (state, input) {
            (_, SendInput::Identify { username, private_exponent }) => {
                let partners = center.list_partners(&username)?;
                Ok((SendState::AwaitingPartner { username, private_exponent }, SendOutput::Partners(partners)))
            },
            (SendState::AwaitingPartner { username, private_exponent }, SendInput::SelectPartner(partner)) => {
                let labels = center.list_labels(&username, &partner)?;
                Ok((
                    SendState::AwaitingLabel { username, private_exponent, partner },
                    SendOutput::Labels(labels),
                ))
            },
            (
                SendState::AwaitingLabel { username, private_exponent, partner },
                SendInput::SelectLabel(label),
            ) => {
                let key = center.recover_session_key(&username, &partner, &label, &private_exponent)?;
                Ok((SendState::Ready { username, partner, label, key }, SendOutput::KeyRecovered))
            },
            (
                SendState::Ready { username, partner, label, key }
                | SendState::Sent { username, partner, label, key, .. },
                SendInput::Compose(plaintext),
            ) => {
                let receipt = center.send_message(&username, &partner, Some(&label), &plaintext, key)?;
                Ok((SendState::Sent { username, partner, label, key, receipt }, SendOutput::Sent(receipt)))
            },
            (state, input) => {
                Err(KdcError::invalid("step", format!("cannot {input} while {}", state.name())))
            },
        }
    }
}

/// Read flow state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ReadState {
    /// Waiting for the receiver to identify
    #[default]
    AwaitingIdentity,
    /// Receiver known, waiting for a sender
    AwaitingSender {
        /// Receiver
        username: String,
    },
    /// Sender chosen, waiting for a label
    AwaitingLabel {
        /// Receiver
        username: String,
        /// Sender
        sender: String,
        /// Labels of sessions between the two
        labels: BTreeSet<String>,
    },
    /// Label chosen, waiting for the private exponent
    AwaitingKey {
        /// Receiver
        username: String,
        /// Sender
        sender: String,
        /// Session label
        label: String,
    },
    /// Messages decrypted
    Messages {
        /// Receiver
        username: String,
        /// Sender
        sender: String,
        /// Session label
        label: String,
    },
}

impl ReadState {
    fn name(&self) -> &'static str {
        match self {
            Self::AwaitingIdentity => "awaiting identity",
            Self::AwaitingSender { .. } => "awaiting sender",
            Self::AwaitingLabel { .. } => "awaiting label",
            Self::AwaitingKey { .. } => "awaiting key",
            Self::Messages { .. } => "showing messages",
        }
    }
}

/// Inputs accepted by [`ReadFlow`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadInput {
    /// Receiver name. Accepted in any state; restarts the flow.
    Identify {
        /// Receiver
        username: String,
    },
    /// Sender whose messages to read
    SelectSender(String),
    /// Session label
    SelectLabel(String),
    /// Receiver's private exponent
    Unlock(PrivateExponent),
}

impl fmt::Display for ReadInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Identify { .. } => "identify",
            Self::SelectSender(_) => "select sender",
            Self::SelectLabel(_) => "select label",
            Self::Unlock(_) => "unlock",
        })
    }
}

/// What a read step produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutput {
    /// Identities that have messaged the receiver
    Senders(BTreeSet<String>),
    /// Labels of sessions with the chosen sender
    Labels(BTreeSet<String>),
    /// Label accepted; supply the private exponent next
    LabelSelected,
    /// Decrypted messages in send order
    Messages(Vec<ReadMessage>),
}

/// Session-aware message retrieval.
#[derive(Debug, Clone, Default)]
pub struct ReadFlow {
    state: ReadState,
}

impl ReadFlow {
    /// A flow at its first step.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn state(&self) -> &ReadState {
        &self.state
    }

    /// Apply one input. On error the flow is back at
    /// [`ReadState::AwaitingIdentity`].
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if the input is not accepted in the current state
    /// - `SessionNotFound` if the label is not one of the listed labels
    /// - Any error from the [`KeyCenter`] call the step makes
    pub fn handle<K: KeyCenter + ?Sized>(
        &mut self,
        center: &K,
        input: ReadInput,
    ) -> Result<ReadOutput, KdcError> {
        let state = mem::take(&mut self.state);
        let (next, output) = Self::transition(center, state, input)?;
        self.state = next;
        Ok(output)
    }

    /// Rebuild a flow from a stateless request and run it to `request.step`.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if a field required by the step is missing
    /// - Any error from the steps replayed
    pub fn replay<K: KeyCenter + ?Sized>(
        center: &K,
        request: &FlowRequest,
    ) -> Result<(Self, ReadOutput), KdcError> {
        let mut flow = Self::new();
        let mut last = None;
        for input in request.read_inputs()? {
            last = Some(flow.handle(center, input)?);
        }
        let output = last.ok_or_else(|| KdcError::invalid("step", "nothing to replay"))?;
        Ok((flow, output))
    }

    fn transition<K: KeyCenter + ?Sized>(
        center: &K,
        state: ReadState,
        input: ReadInput,
    ) -> Result<(ReadState, ReadOutput), KdcError> {
        match (state, input) {
            (_, ReadInput::Identify { username }) => {
                let senders = center.list_senders(&username)?;
                Ok((ReadState::AwaitingSender { username }, ReadOutput::Senders(senders)))
            },
            (ReadState::AwaitingSender { username }, ReadInput::SelectSender(sender)) => {
                let labels = center.list_labels(&username, &sender)?;
                Ok((
                    ReadState::AwaitingLabel { username, sender, labels: labels.clone() },
                    ReadOutput::Labels(labels),
                ))
            },
            (ReadState::AwaitingLabel { username, sender, labels }, ReadInput::SelectLabel(label)) => {
                if !labels.contains(&label) {
                    return Err(KdcError::SessionNotFound { identity: username, partner: sender, label });
                }
                Ok((ReadState::AwaitingKey { username, sender, label }, ReadOutput::LabelSelected))
            },
            (
                ReadState::AwaitingKey { username, sender, label }
                | ReadState::Messages { username, sender, label },
                ReadInput::Unlock(private_exponent),
            ) => {
                let messages = center.read_messages(&username, &sender, &label, &private_exponent)?;
                Ok((ReadState::Messages { username, sender, label }, ReadOutput::Messages(messages)))
            },
            (state, input) => {
                Err(KdcError::invalid("step", format!("cannot {input} while {}", state.name())))
            },
        }
    }
}

/// How far a [`FlowRequest`] wants to go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStep {
    /// Identify only
    #[default]
    Identify,
    /// Also choose the partner (the sender, when reading)
    SelectPartner,
    /// Also choose the label
    SelectLabel,
    /// Compose the message, or unlock the messages when reading
    Finish,
}

/// Stateless request: every field the flow has collected so far.
///
/// Fields beyond `step` are ignored. `private_exponent` is the textual form
/// a user types; it is parsed only when the step needs it.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowRequest {
    /// Last step to run
    pub step: FlowStep,
    /// Acting identity
    pub username: Option<String>,
    /// Acting identity's private exponent
    pub private_exponent: Option<String>,
    /// Receiver when sending, sender when reading
    pub partner: Option<String>,
    /// Session label
    pub label: Option<String>,
    /// Message text, when sending
    pub plaintext: Option<String>,
}

impl fmt::Debug for FlowRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowRequest")
            .field("step", &self.step)
            .field("username", &self.username)
            .field("private_exponent", &self.private_exponent.as_ref().map(|_| "<redacted>"))
            .field("partner", &self.partner)
            .field("label", &self.label)
            .field("plaintext", &self.plaintext)
            .finish()
    }
}

impl FlowRequest {
    /// Inputs that drive a [`SendFlow`] to `step`.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` naming the first missing field
    /// - `SessionKeyRecovery` if the private exponent does not parse
    pub fn send_inputs(&self) -> Result<Vec<SendInput>, KdcError> {
        let mut inputs = vec![SendInput::Identify {
            username: required("username", self.username.as_ref())?,
            private_exponent: self.parse_private_exponent()?,
        }];
        if self.step >= FlowStep::SelectPartner {
            inputs.push(SendInput::SelectPartner(required("partner", self.partner.as_ref())?));
        }
        if self.step >= FlowStep::SelectLabel {
            inputs.push(SendInput::SelectLabel(required("label", self.label.as_ref())?));
        }
        if self.step >= FlowStep::Finish {
            inputs.push(SendInput::Compose(required("plaintext", self.plaintext.as_ref())?));
        }
        Ok(inputs)
    }

    /// Inputs that drive a [`ReadFlow`] to `step`.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` naming the first missing field
    /// - `SessionKeyRecovery` if the private exponent does not parse
    pub fn read_inputs(&self) -> Result<Vec<ReadInput>, KdcError> {
        let mut inputs =
            vec![ReadInput::Identify { username: required("username", self.username.as_ref())? }];
        if self.step >= FlowStep::SelectPartner {
            inputs.push(ReadInput::SelectSender(required("partner", self.partner.as_ref())?));
        }
        if self.step >= FlowStep::SelectLabel {
            inputs.push(ReadInput::SelectLabel(required("label", self.label.as_ref())?));
        }
        if self.step >= FlowStep::Finish {
            inputs.push(ReadInput::Unlock(self.parse_private_exponent()?));
        }
        Ok(inputs)
    }

    fn parse_private_exponent(&self) -> Result<PrivateExponent, KdcError> {
        let raw = required("private_exponent", self.private_exponent.as_ref())?;
        Ok(raw.parse::<PrivateExponent>()?)
    }
}

fn required(field: &'static str, value: Option<&String>) -> Result<String, KdcError> {
    value.cloned().ok_or_else(|| KdcError::invalid(field, "missing"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn request(step: FlowStep) -> FlowRequest {
        FlowRequest {
            step,
            username: Some("alice".into()),
            private_exponent: Some("2753".into()),
            partner: Some("bob".into()),
            label: Some("chat1".into()),
            plaintext: Some("Hello, World!".into()),
        }
    }

    #[test]
    fn send_inputs_stop_at_step() {
        let inputs = request(FlowStep::SelectPartner).send_inputs().unwrap();
        assert_eq!(
            inputs,
            vec![
                SendInput::Identify {
                    username: "alice".into(),
                    private_exponent: PrivateExponent::new(2753),
                },
                SendInput::SelectPartner("bob".into()),
            ]
        );

        assert_eq!(request(FlowStep::Finish).send_inputs().unwrap().len(), 4);
    }

    #[test]
    fn read_inputs_unlock_last() {
        let inputs = request(FlowStep::Finish).read_inputs().unwrap();
        assert_eq!(inputs.len(), 4);
        assert_eq!(inputs[0], ReadInput::Identify { username: "alice".into() });
        assert_eq!(inputs[3], ReadInput::Unlock(PrivateExponent::new(2753)));
    }

    #[test]
    fn read_identify_does_not_need_exponent() {
        let mut req = request(FlowStep::SelectLabel);
        req.private_exponent = None;
        assert_eq!(req.read_inputs().unwrap().len(), 3);
        assert!(req.send_inputs().is_err());
    }

    #[test]
    fn fields_beyond_step_are_ignored() {
        let req = FlowRequest {
            step: FlowStep::Identify,
            username: Some("alice".into()),
            private_exponent: Some("17".into()),
            ..FlowRequest::default()
        };
        assert_eq!(req.send_inputs().unwrap().len(), 1);
    }

    #[test]
    fn missing_field_is_named() {
        let mut req = request(FlowStep::SelectLabel);
        req.label = None;
        assert_eq!(req.send_inputs(), Err(KdcError::invalid("label", "missing")));

        let mut req = request(FlowStep::Identify);
        req.username = None;
        assert_eq!(req.read_inputs(), Err(KdcError::invalid("username", "missing")));
    }

    #[test]
    fn garbage_exponent_is_a_recovery_error() {
        let mut req = request(FlowStep::Identify);
        req.private_exponent = Some("not a number".into());
        let err = req.send_inputs().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SessionKeyRecovery);
    }

    #[test]
    fn request_decodes_from_json() {
        let req: FlowRequest = serde_json::from_str(
            r#"{"step":"select_label","username":"bob","partner":"alice","label":"chat1"}"#,
        )
        .unwrap();
        assert_eq!(req.step, FlowStep::SelectLabel);
        assert_eq!(req.plaintext, None);
        assert_eq!(req.read_inputs().unwrap().len(), 3);
    }

    #[test]
    fn debug_redacts_exponent() {
        let debug = format!("{:?}", request(FlowStep::Finish));
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("2753"));
    }

    #[test]
    fn steps_are_ordered() {
        assert!(FlowStep::Identify < FlowStep::SelectPartner);
        assert!(FlowStep::SelectPartner < FlowStep::SelectLabel);
        assert!(FlowStep::SelectLabel < FlowStep::Finish);
    }
}
