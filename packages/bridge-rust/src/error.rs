//! Error types for calls, the bridge surface, and channel transports.

use workerlink_core::types::describe;
use workerlink_core::{ClassifyError, CodecError, TransferError, Value};

/// Fixed message for calls refused while the channel drains.
pub const SHUTTING_DOWN_MESSAGE: &str = "channel is shutting down, cannot accept new tasks";

/// Failure of a single remote call.
///
/// Operation-level failures (`Remote`) reach only the caller awaiting that
/// call. `Transport` is broadcast to every call pending when the channel
/// reported the fault.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CallError {
    /// The worker answered with `error: true`. Covers both unknown operation
    /// names and handler failures; the payload is the worker's description.
    #[error("{}", describe(.payload))]
    Remote { payload: Value },
    /// The call was attempted after shutdown began.
    #[error("{}", SHUTTING_DOWN_MESSAGE)]
    ShuttingDown,
    /// The channel failed to deliver or decode messages.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    /// The transfer list did not fit the argument list.
    #[error("invalid transfer list: {0}")]
    InvalidTransfer(#[from] TransferError),
    /// A typed argument or result could not be converted.
    #[error("codec error: {0}")]
    Codec(String),
    /// The bridge was dropped before the call settled.
    #[error("bridge dropped before the call settled")]
    Dropped,
}

impl CallError {
    /// Returns the remote failure payload, if this is an operation-level error.
    #[must_use]
    pub fn remote_payload(&self) -> Option<&Value> {
        match self {
            CallError::Remote { payload } => Some(payload),
            _ => None,
        }
    }
}

/// Errors surfaced by the bridge outside of an individual call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    /// The channel could not be opened.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    /// Properties of the remote surface cannot be assigned.
    #[error("remote surface is read-only: cannot assign `{property}`")]
    ReadOnlySurface { property: String },
}

/// Faults reported by a channel provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The channel has been closed or its peer is gone.
    #[error("channel closed")]
    Closed,
    /// An outbound message could not be encoded.
    #[error("encode failed: {0}")]
    Encode(String),
    /// An inbound message could not be decoded or classified.
    #[error("decode failed: {0}")]
    Decode(String),
    /// Any other provider-specific failure.
    #[error("{0}")]
    Other(String),
}

impl From<CodecError> for TransportError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Encode(msg) => TransportError::Encode(msg),
            other => TransportError::Decode(other.to_string()),
        }
    }
}

impl From<ClassifyError> for TransportError {
    fn from(err: ClassifyError) -> Self {
        TransportError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_displays_payload_text() {
        let err = CallError::Remote {
            payload: Value::from("boom"),
        };
        assert_eq!(err.to_string(), "boom");
        assert_eq!(err.remote_payload(), Some(&Value::from("boom")));
    }

    #[test]
    fn shutting_down_has_fixed_message() {
        assert_eq!(
            CallError::ShuttingDown.to_string(),
            "channel is shutting down, cannot accept new tasks"
        );
    }

    #[test]
    fn codec_errors_map_to_transport_direction() {
        assert_eq!(
            TransportError::from(CodecError::Encode("x".into())),
            TransportError::Encode("x".into())
        );
        assert!(matches!(
            TransportError::from(CodecError::TrailingBytes { remaining: 2 }),
            TransportError::Decode(_)
        ));
    }

    #[test]
    fn classify_error_is_a_decode_failure() {
        let err = TransportError::from(ClassifyError::NotAMap);
        assert_eq!(err, TransportError::Decode("inbound frame is not a map".into()));
    }
}
