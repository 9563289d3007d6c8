//! Push events sent by the worker outside of any call.

use serde::{Deserialize, Serialize};

use super::{frame, nil};
use crate::types::Value;

/// Discriminator for single-payload events.
pub const SENT_EVENT: &str = "worker-sent-event";

/// Discriminator for positional-argument events.
pub const SEND_EVENT: &str = "worker-send-event";

/// An unsolicited event pushed by the worker.
///
/// Carries no correlation identifier. The `type` field is the
/// discriminator that separates events from call responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventMessage {
    /// Single-subject form: `{ type: "worker-sent-event", name, payload }`.
    #[serde(rename = "worker-sent-event")]
    Sent {
        name: String,
        #[serde(default = "nil")]
        payload: Value,
    },
    /// Positional form: `{ type: "worker-send-event", name, payload: [..] }`.
    #[serde(rename = "worker-send-event")]
    Send {
        name: String,
        #[serde(default)]
        payload: Vec<Value>,
    },
}

/// Payload of an event, preserving which wire form it arrived in.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    Subject(Value),
    Args(Vec<Value>),
}

impl EventPayload {
    /// Returns the single subject value, or the first positional argument.
    #[must_use]
    pub fn first(&self) -> Option<&Value> {
        match self {
            EventPayload::Subject(value) => Some(value),
            EventPayload::Args(args) => args.first(),
        }
    }

    /// Returns the payload as a positional list (a subject becomes a one-element slice).
    #[must_use]
    pub fn as_slice(&self) -> &[Value] {
        match self {
            EventPayload::Subject(value) => std::slice::from_ref(value),
            EventPayload::Args(args) => args,
        }
    }
}

impl EventMessage {
    /// Builds a single-subject event.
    #[must_use]
    pub fn sent(name: impl Into<String>, payload: Value) -> Self {
        EventMessage::Sent {
            name: name.into(),
            payload,
        }
    }

    /// Builds a positional-argument event.
    #[must_use]
    pub fn send(name: impl Into<String>, payload: Vec<Value>) -> Self {
        EventMessage::Send {
            name: name.into(),
            payload,
        }
    }

    /// Returns the event name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            EventMessage::Sent { name, .. } | EventMessage::Send { name, .. } => name,
        }
    }

    /// Splits the event into its name and payload.
    #[must_use]
    pub fn into_parts(self) -> (String, EventPayload) {
        match self {
            EventMessage::Sent { name, payload } => (name, EventPayload::Subject(payload)),
            EventMessage::Send { name, payload } => (name, EventPayload::Args(payload)),
        }
    }

    /// Converts the event into a structured `MsgPack` map frame.
    #[must_use]
    pub fn into_frame(self) -> Value {
        match self {
            EventMessage::Sent { name, payload } => frame([
                ("type", Value::from(SENT_EVENT)),
                ("name", Value::from(name)),
                ("payload", payload),
            ]),
            EventMessage::Send { name, payload } => frame([
                ("type", Value::from(SEND_EVENT)),
                ("name", Value::from(name)),
                ("payload", Value::Array(payload)),
            ]),
        }
    }
}
