//! Ownership transfer of binary arguments.
//!
//! A [`TransferList`] names argument positions whose bytes should be handed
//! to the worker instead of copied. When the envelope is built, each named
//! argument's buffer is moved into the envelope's side band and the argument
//! itself is left as an empty binary: the sender's view of the region is gone.
//! The receiving side calls [`Envelope::reassemble`] to put the buffers back.

use std::collections::HashSet;

use bytes::Bytes;

use crate::messages::RequestMessage;
use crate::types::Value;

/// Argument positions whose binary contents are transferred, not copied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferList(Vec<usize>);

impl TransferList {
    #[must_use]
    pub fn new(indices: Vec<usize>) -> Self {
        Self(indices)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.0
    }
}

impl From<Vec<usize>> for TransferList {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

impl FromIterator<usize> for TransferList {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Errors from applying a transfer list to a request's arguments.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferError {
    #[error("transfer index {index} is out of range for {len} arguments")]
    OutOfRange { index: usize, len: usize },
    #[error("argument {index} is listed for transfer more than once")]
    Duplicate { index: usize },
    #[error("argument {index} is not a binary value and cannot be transferred")]
    NotBinary { index: usize },
}

/// A buffer moved out of argument `index`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferredBuffer {
    pub index: usize,
    pub bytes: Bytes,
}

/// An outbound request plus the buffers whose ownership travels with it.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub message: RequestMessage,
    pub transfer: Vec<TransferredBuffer>,
}

impl Envelope {
    /// Wraps a request with nothing to transfer.
    #[must_use]
    pub fn new(message: RequestMessage) -> Self {
        Self {
            message,
            transfer: Vec::new(),
        }
    }

    /// Wraps a request, moving the listed binary arguments into the side band.
    ///
    /// The list is validated in full before any argument is touched, so a
    /// rejected list leaves the request unchanged.
    ///
    /// # Errors
    ///
    /// Returns `TransferError` if an index is out of range, repeated, or
    /// names a non-binary argument.
    pub fn with_transfer(
        mut message: RequestMessage,
        list: &TransferList,
    ) -> Result<Self, TransferError> {
        let len = message.args.len();
        let mut seen = HashSet::with_capacity(list.indices().len());
        for &index in list.indices() {
            if index >= len {
                return Err(TransferError::OutOfRange { index, len });
            }
            if !seen.insert(index) {
                return Err(TransferError::Duplicate { index });
            }
            if !matches!(message.args[index], Value::Binary(_)) {
                return Err(TransferError::NotBinary { index });
            }
        }

        let mut transfer = Vec::with_capacity(list.indices().len());
        for &index in list.indices() {
            if let Value::Binary(buf) = &mut message.args[index] {
                transfer.push(TransferredBuffer {
                    index,
                    bytes: Bytes::from(std::mem::take(buf)),
                });
            }
        }
        Ok(Self { message, transfer })
    }

    /// Restores transferred buffers into their argument positions.
    ///
    /// A buffer that is no longer shared is handed back without copying.
    ///
    /// Buffers whose index no longer fits the argument list are dropped.
    #[must_use]
    pub fn reassemble(self) -> RequestMessage {
        let mut message = self.message;
        for buffer in self.transfer {
            if let Some(slot) = message.args.get_mut(buffer.index) {
                *slot = Value::Binary(Vec::from(buffer.bytes));
            }
        }
        message
    }
}
