//! Registry of in-flight calls awaiting a response.

use std::collections::HashMap;

use tokio::sync::oneshot;
use workerlink_core::{CallId, Value};

use crate::error::CallError;

/// Continuation for a pending call: settled exactly once with the outcome.
pub(crate) type Settle = oneshot::Sender<Result<Value, CallError>>;

/// Maps call identifiers to their continuations.
///
/// Owned by a single bridge; every access happens under that bridge's core
/// lock. Settling an identifier that is not present is a no-op: it is either
/// a duplicate delivery or belongs to a call already failed by `fail_all`.
#[derive(Debug, Default)]
pub(crate) struct PendingCalls {
    calls: HashMap<CallId, Settle>,
}

impl PendingCalls {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Stores the continuation for `id`.
    ///
    /// Identifiers come from `CallIdGenerator`, so `id` is never present.
    pub(crate) fn register(&mut self, id: CallId, settle: Settle) {
        debug_assert!(!self.calls.contains_key(&id), "call id {id} reused");
        self.calls.insert(id, settle);
    }

    /// Completes `id` successfully. Returns `false` if `id` was not pending.
    pub(crate) fn resolve(&mut self, id: CallId, payload: Value) -> bool {
        self.settle(id, Ok(payload))
    }

    /// Fails `id`. Returns `false` if `id` was not pending.
    pub(crate) fn reject(&mut self, id: CallId, reason: CallError) -> bool {
        self.settle(id, Err(reason))
    }

    /// Fails every pending call with `reason` and leaves the registry empty.
    ///
    /// The entries are detached before any continuation runs. Returns the
    /// number of calls failed.
    pub(crate) fn fail_all(&mut self, reason: &CallError) -> usize {
        let drained = std::mem::take(&mut self.calls);
        let count = drained.len();
        for (_, settle) in drained {
            // The caller may have dropped its future; nothing to deliver then.
            let _ = settle.send(Err(reason.clone()));
        }
        count
    }

    pub(crate) fn len(&self) -> usize {
        self.calls.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    fn settle(&mut self, id: CallId, outcome: Result<Value, CallError>) -> bool {
        match self.calls.remove(&id) {
            Some(settle) => {
                let _ = settle.send(outcome);
                true
            }
            None => false,
        }
    }
}
