//! Request and response messages for correlated calls.

use serde::{Deserialize, Deserializer, Serialize};

use super::{frame, nil};
use crate::types::{CallId, Value};

/// Reads the `error` flag, treating an explicit nil like an absent flag.
fn flag_or_false<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

/// A correlated call request sent from the caller to the worker.
///
/// Maps to `{ id: integer, name: string, args: [any] }` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestMessage {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

impl RequestMessage {
    /// Creates a request for the given operation.
    #[must_use]
    pub fn new(id: CallId, name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            id: id.get(),
            name: name.into(),
            args,
        }
    }

    /// Returns the correlation identifier.
    #[must_use]
    pub fn call_id(&self) -> CallId {
        CallId(self.id)
    }

    /// Converts the request into a structured `MsgPack` map frame.
    #[must_use]
    pub fn into_frame(self) -> Value {
        frame([
            ("id", Value::from(self.id)),
            ("name", Value::from(self.name)),
            ("args", Value::Array(self.args)),
        ])
    }
}

/// The worker's reply to a [`RequestMessage`].
///
/// `error` distinguishes a success payload from a failure description and
/// defaults to `false` when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMessage {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default = "nil")]
    pub payload: Value,
    #[serde(default, deserialize_with = "flag_or_false")]
    pub error: bool,
}

impl ResponseMessage {
    /// A successful response carrying `payload`.
    #[must_use]
    pub fn success(id: CallId, name: impl Into<String>, payload: Value) -> Self {
        Self {
            id: id.get(),
            name: name.into(),
            payload,
            error: false,
        }
    }

    /// A failed response whose payload describes the failure.
    #[must_use]
    pub fn failure(id: CallId, name: impl Into<String>, payload: Value) -> Self {
        Self {
            id: id.get(),
            name: name.into(),
            payload,
            error: true,
        }
    }

    /// Returns the correlation identifier.
    #[must_use]
    pub fn call_id(&self) -> CallId {
        CallId(self.id)
    }

    /// Converts the response into a structured `MsgPack` map frame.
    #[must_use]
    pub fn into_frame(self) -> Value {
        frame([
            ("id", Value::from(self.id)),
            ("name", Value::from(self.name)),
            ("payload", self.payload),
            ("error", Value::from(self.error)),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;

    #[test]
    fn response_error_flag_defaults_to_false() {
        // A map without the `error` key must decode as a success.
        let bytes = codec::encode_frame(&frame([
            ("id", Value::from(1)),
            ("name", Value::from("add")),
            ("payload", Value::from(5)),
        ]))
        .unwrap();

        let response: ResponseMessage = codec::decode(&bytes).unwrap();
        assert_eq!(response.call_id(), CallId(1));
        assert!(!response.error);
        assert_eq!(response.payload, Value::from(5));
    }

    #[test]
    fn nil_error_flag_means_success() {
        let bytes = codec::encode_frame(&frame([
            ("id", Value::from(1)),
            ("payload", Value::from(5)),
            ("error", Value::Nil),
        ]))
        .unwrap();

        let response: ResponseMessage = codec::decode(&bytes).unwrap();
        assert!(!response.error);
        assert_eq!(response.name, "");
    }

    #[test]
    fn request_survives_named_msgpack() {
        let request = RequestMessage::new(
            CallId(9),
            "concat",
            vec![Value::from("a"), Value::Binary(vec![1, 2, 3])],
        );
        let bytes = codec::encode(&request).unwrap();
        let decoded: RequestMessage = codec::decode(&bytes).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn failure_constructor_sets_error_flag() {
        let response = ResponseMessage::failure(CallId(2), "throwError", Value::from("boom"));
        assert!(response.error);
        assert_eq!(response.name, "throwError");
    }

    #[test]
    fn request_frame_has_named_fields() {
        let frame = RequestMessage::new(CallId(3), "ping", vec![]).into_frame();
        let Value::Map(entries) = frame else {
            panic!("request frame must be a map");
        };
        let keys: Vec<_> = entries.iter().filter_map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["id", "name", "args"]);
    }
}
