//! Wire schemas for the bridge protocol.
//!
//! Three message shapes cross the channel:
//!
//! - [`RequestMessage`]: caller -> worker, `{ id, name, args }`
//! - [`ResponseMessage`]: worker -> caller, `{ id, name, payload, error }`
//! - [`EventMessage`]: worker -> caller, `{ type, name, payload }`, where
//!   `type` is one of the two event discriminators
//!
//! All types serialize as named `MsgPack` maps via `rmp_serde::to_vec_named()`.
//! Structured channel providers that hand frames over as [`Value`](crate::Value)
//! trees use the `into_frame` builders instead.

pub mod call;
pub mod event;

pub use call::{RequestMessage, ResponseMessage};
pub use event::{EventMessage, EventPayload, SEND_EVENT, SENT_EVENT};

use crate::types::Value;

/// Builds a `MsgPack` map frame from string keys.
pub(crate) fn frame<const N: usize>(fields: [(&str, Value); N]) -> Value {
    Value::Map(
        fields
            .into_iter()
            .map(|(key, value)| (Value::from(key), value))
            .collect(),
    )
}

/// Serde default for absent payload fields.
pub(crate) fn nil() -> Value {
    Value::Nil
}
