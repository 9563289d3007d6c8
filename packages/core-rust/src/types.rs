use std::fmt;

use serde::{Deserialize, Serialize};

/// Dynamic payload value carried by requests, responses, and events.
///
/// This is the `MsgPack` value model: arguments and results cross the
/// channel as untyped values and are converted to concrete Rust types at
/// the edges with `rmpv::ext::{to_value, from_value}`.
pub use rmpv::Value;

/// Correlation identifier for an in-flight call.
///
/// Unique among the calls outstanding on one channel instance and strictly
/// increasing for the lifetime of that instance. Identifiers start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(pub u64);

impl CallId {
    /// The first identifier issued by a fresh channel.
    pub const FIRST: CallId = CallId(1);

    /// Returns the raw integer used on the wire.
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for CallId {
    fn from(raw: u64) -> Self {
        CallId(raw)
    }
}

/// Renders a payload as human-readable text.
///
/// String payloads are returned verbatim (without quotes); everything else
/// uses the `MsgPack` value's display form.
#[must_use]
pub fn describe(payload: &Value) -> String {
    match payload.as_str() {
        Some(text) => text.to_string(),
        None => payload.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_id_display_and_ordering() {
        assert_eq!(CallId::FIRST.to_string(), "1");
        assert!(CallId(2) > CallId::FIRST);
        assert_eq!(CallId::from(7).get(), 7);
    }

    #[test]
    fn describe_strips_quotes_from_strings() {
        assert_eq!(describe(&Value::from("boom")), "boom");
        assert_eq!(describe(&Value::from(42)), "42");
    }
}
