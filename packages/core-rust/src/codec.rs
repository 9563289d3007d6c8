//! `MsgPack` codec for bridge frames.
//!
//! Typed messages use named maps (`rmp_serde::to_vec_named()`) so field
//! names survive on the wire. Untyped frames are read and written with
//! `rmpv` directly, which is what byte-oriented channel providers use before
//! handing a frame to [`classify`](crate::classify).

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::types::Value;

/// Errors from encoding or decoding a frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("failed to encode frame: {0}")]
    Encode(String),
    #[error("failed to decode frame: {0}")]
    Decode(String),
    #[error("frame has {remaining} trailing bytes")]
    TrailingBytes { remaining: usize },
}

/// Encodes a typed message as a named `MsgPack` map.
///
/// # Errors
///
/// Returns `CodecError::Encode` if the message cannot be serialized.
pub fn encode<T: Serialize + ?Sized>(message: &T) -> Result<Vec<u8>, CodecError> {
    rmp_serde::to_vec_named(message).map_err(|e| CodecError::Encode(e.to_string()))
}

/// Decodes a typed message.
///
/// # Errors
///
/// Returns `CodecError::Decode` if the bytes are not valid `MsgPack` or do
/// not match the shape of `T`.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    rmp_serde::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
}

/// Encodes an untyped frame.
///
/// # Errors
///
/// Returns `CodecError::Encode` if writing fails.
pub fn encode_frame(frame: &Value) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();
    rmpv::encode::write_value(&mut buf, frame).map_err(|e| CodecError::Encode(e.to_string()))?;
    Ok(buf)
}

/// Decodes exactly one untyped frame.
///
/// # Errors
///
/// Returns `CodecError::Decode` for malformed input and
/// `CodecError::TrailingBytes` when bytes remain after the first value.
pub fn decode_frame(bytes: &[u8]) -> Result<Value, CodecError> {
    let mut cursor = bytes;
    let frame =
        rmpv::decode::read_value(&mut cursor).map_err(|e| CodecError::Decode(e.to_string()))?;
    if !cursor.is_empty() {
        return Err(CodecError::TrailingBytes {
            remaining: cursor.len(),
        });
    }
    Ok(frame)
}
