//! Inbound frame classification.
//!
//! Every frame arriving from the worker is either a call response or a push
//! event. The split is made exactly once, here, by inspecting the `type`
//! discriminator: the two event discriminators select an event, anything
//! else is read as a response.

use serde::de::DeserializeOwned;

use crate::messages::{EventMessage, ResponseMessage, SEND_EVENT, SENT_EVENT};
use crate::types::Value;

/// A classified inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Response(ResponseMessage),
    Event(EventMessage),
}

/// Errors from classifying an inbound frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassifyError {
    #[error("inbound frame is not a map")]
    NotAMap,
    #[error("malformed {kind} frame: {reason}")]
    Malformed { kind: &'static str, reason: String },
}

/// Classifies a structured frame as a response or an event.
///
/// Only the `type` discriminator is inspected here; the frame is then
/// deserialized through the [`EventMessage`] or [`ResponseMessage`] schema.
///
/// # Errors
///
/// Returns `ClassifyError` if the frame is not a map or does not fit the
/// schema it was routed to. Callers treat this as a decode failure of the
/// channel.
pub fn classify(frame: Value) -> Result<Inbound, ClassifyError> {
    let Value::Map(entries) = &frame else {
        return Err(ClassifyError::NotAMap);
    };
    let discriminator = entries
        .iter()
        .find(|(key, _)| key.as_str() == Some("type"))
        .and_then(|(_, value)| value.as_str());

    if matches!(discriminator, Some(SENT_EVENT | SEND_EVENT)) {
        from_frame(frame, "event").map(Inbound::Event)
    } else {
        from_frame(frame, "response").map(Inbound::Response)
    }
}

fn from_frame<T: DeserializeOwned>(frame: Value, kind: &'static str) -> Result<T, ClassifyError> {
    rmpv::ext::from_value(frame).map_err(|err| ClassifyError::Malformed {
        kind,
        reason: err.to_string(),
    })
}
