//! Correlation identifier allocation.

use workerlink_core::CallId;

/// Issues strictly increasing call identifiers for one channel instance.
///
/// Reset only when the channel is torn down, at which point no call from
/// the old instance is pending, so identifiers are never reused while live.
#[derive(Debug)]
pub(crate) struct CallIdGenerator {
    next: u64,
}

impl CallIdGenerator {
    pub(crate) fn new() -> Self {
        Self {
            next: CallId::FIRST.get(),
        }
    }

    pub(crate) fn next(&mut self) -> CallId {
        let id = CallId(self.next);
        self.next += 1;
        id
    }

    pub(crate) fn reset(&mut self) {
        self.next = CallId::FIRST.get();
    }
}
