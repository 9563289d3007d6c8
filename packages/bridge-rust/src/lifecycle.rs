//! Lazy creation and teardown of the underlying worker channel.

use std::sync::Arc;

use crate::channel::{ChannelProvider, InboundListener, WorkerChannel};
use crate::error::TransportError;

/// Holds the live channel, if any, and the generation it was opened under.
///
/// Each `open` bumps the generation. Listeners are bound to the generation
/// they were created for, which lets the router drop frames that a torn-down
/// channel delivers late.
#[derive(Default)]
pub(crate) struct ChannelSlot {
    current: Option<Arc<dyn WorkerChannel>>,
    generation: u64,
}

impl ChannelSlot {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns the live channel, opening one through `provider` if needed.
    ///
    /// `listener_for` builds the inbound listener for the new generation.
    /// The boolean is `true` when a new channel was opened by this call.
    pub(crate) fn ensure<F>(
        &mut self,
        provider: &dyn ChannelProvider,
        listener_for: F,
    ) -> Result<(Arc<dyn WorkerChannel>, bool), TransportError>
    where
        F: FnOnce(u64) -> Arc<dyn InboundListener>,
    {
        if let Some(channel) = &self.current {
            return Ok((Arc::clone(channel), false));
        }
        let generation = self.generation + 1;
        let channel = provider.open(listener_for(generation))?;
        self.generation = generation;
        self.current = Some(Arc::clone(&channel));
        Ok((channel, true))
    }

    /// Generation of the most recently opened channel.
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether frames tagged with `generation` belong to the live channel.
    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.current.is_some() && self.generation == generation
    }

    #[cfg(test)]
    pub(crate) fn is_open(&self) -> bool {
        self.current.is_some()
    }

    /// Detaches the live channel. The caller closes it outside the core lock.
    pub(crate) fn take(&mut self) -> Option<Arc<dyn WorkerChannel>> {
        self.current.take()
    }
}

impl std::fmt::Debug for ChannelSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelSlot")
            .field("open", &self.current.is_some())
            .field("generation", &self.generation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use workerlink_core::Value;

    use super::*;
    use crate::testing::ScriptedProvider;

    struct NullListener;

    impl InboundListener for NullListener {
        fn on_frame(&self, _frame: Value) {}
        fn on_error(&self, _error: TransportError) {}
    }

    fn null_listener(_generation: u64) -> Arc<dyn InboundListener> {
        Arc::new(NullListener)
    }

    #[test]
    fn ensure_opens_once_and_reuses() {
        let provider = ScriptedProvider::new();
        let mut slot = ChannelSlot::new();

        let (_, opened) = slot.ensure(&provider, null_listener).unwrap();
        assert!(opened);
        let (_, opened) = slot.ensure(&provider, null_listener).unwrap();
        assert!(!opened);
        assert_eq!(provider.open_count(), 1);
        assert!(slot.is_current(1));
    }

    #[test]
    fn take_then_ensure_bumps_generation() {
        let provider = ScriptedProvider::new();
        let mut slot = ChannelSlot::new();
        slot.ensure(&provider, null_listener).unwrap();

        assert!(slot.take().is_some());
        assert!(!slot.is_open());
        assert!(!slot.is_current(1));

        slot.ensure(&provider, null_listener).unwrap();
        assert!(slot.is_current(2));
        assert!(!slot.is_current(1));
        assert_eq!(provider.open_count(), 2);
    }

    #[test]
    fn failed_open_leaves_slot_empty() {
        let provider = ScriptedProvider::new();
        provider.fail_open(true);
        let mut slot = ChannelSlot::new();

        assert!(slot.ensure(&provider, null_listener).is_err());
        assert!(!slot.is_open());
        assert!(!slot.is_current(1));
    }
}
