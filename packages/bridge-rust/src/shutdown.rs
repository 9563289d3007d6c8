//! Graceful shutdown state machine for a bridge's channel.
//!
//! Uses `ArcSwap` to publish the channel state for lock-free reads and a
//! `watch` channel as the single completion signal shared by every
//! concurrent `terminate()` caller.

use std::future::IntoFuture;
use std::sync::Arc;

use arc_swap::ArcSwap;
use futures_util::future::BoxFuture;
use tokio::sync::watch;

/// Lifecycle state of a bridge's channel.
///
/// State machine: Uninitialized -> Active -> (ShuttingDown ->) Terminated,
/// and Terminated -> Active when a later call or subscription reopens it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// No channel has been opened yet.
    Uninitialized,
    /// A channel is open and accepting calls.
    Active,
    /// Shutdown was requested while calls were pending; new calls are refused.
    ShuttingDown,
    /// The channel was torn down; the next call reopens a fresh one.
    Terminated,
}

/// What the bridge must do in response to a shutdown request.
#[derive(Debug)]
pub(crate) enum ShutdownStep {
    /// There is no live channel; the request is already satisfied.
    Complete,
    /// No calls are pending; the channel must be torn down now.
    TearDown,
    /// Calls are pending; teardown happens when the registry drains.
    Drain(ShutdownSignal),
}

/// Tracks the channel state and the drain completion signal.
///
/// Lives inside the bridge core lock alongside the pending-call registry,
/// so admission checks and state transitions observe a consistent count.
#[derive(Debug)]
pub(crate) struct ShutdownCoordinator {
    state: ChannelState,
    drained: Option<watch::Sender<bool>>,
    published: Arc<ArcSwap<ChannelState>>,
}

impl ShutdownCoordinator {
    pub(crate) fn new() -> Self {
        Self {
            state: ChannelState::Uninitialized,
            drained: None,
            published: Arc::new(ArcSwap::from_pointee(ChannelState::Uninitialized)),
        }
    }

    pub(crate) fn state(&self) -> ChannelState {
        self.state
    }

    /// Returns a shared handle for lock-free state reads.
    pub(crate) fn state_handle(&self) -> Arc<ArcSwap<ChannelState>> {
        Arc::clone(&self.published)
    }

    /// Whether a new call may be admitted.
    pub(crate) fn admits_calls(&self) -> bool {
        self.state != ChannelState::ShuttingDown
    }

    /// Records that a fresh channel was opened.
    pub(crate) fn activate(&mut self) {
        self.transition(ChannelState::Active);
    }

    /// Handles a shutdown request given the current pending-call count.
    pub(crate) fn request(&mut self, pending: usize) -> ShutdownStep {
        match self.state {
            ChannelState::Uninitialized | ChannelState::Terminated => ShutdownStep::Complete,
            ChannelState::ShuttingDown => match &self.drained {
                Some(tx) => ShutdownStep::Drain(ShutdownSignal::waiting(tx.subscribe())),
                None => ShutdownStep::Complete,
            },
            ChannelState::Active if pending == 0 => {
                self.transition(ChannelState::Terminated);
                ShutdownStep::TearDown
            }
            ChannelState::Active => {
                let (tx, rx) = watch::channel(false);
                self.drained = Some(tx);
                self.transition(ChannelState::ShuttingDown);
                ShutdownStep::Drain(ShutdownSignal::waiting(rx))
            }
        }
    }

    /// Called after every settle; completes a drain once nothing is pending.
    ///
    /// Returns the completion sender when the channel must now be torn down.
    /// The caller fires it after closing the channel.
    pub(crate) fn on_registry_settled(&mut self, pending: usize) -> Option<watch::Sender<bool>> {
        if self.state != ChannelState::ShuttingDown || pending > 0 {
            return None;
        }
        self.transition(ChannelState::Terminated);
        self.drained.take()
    }

    fn transition(&mut self, next: ChannelState) {
        self.state = next;
        self.published.store(Arc::new(next));
    }
}

/// Completion handle returned by `terminate()`.
///
/// Every concurrent `terminate()` issued during one drain receives a handle
/// to the same outcome. Await it directly or via [`ShutdownSignal::wait`].
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: Option<watch::Receiver<bool>>,
}

impl ShutdownSignal {
    pub(crate) fn complete() -> Self {
        Self { rx: None }
    }

    pub(crate) fn waiting(rx: watch::Receiver<bool>) -> Self {
        Self { rx: Some(rx) }
    }

    /// Returns `true` once the channel has been torn down.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        match &self.rx {
            Some(rx) => *rx.borrow(),
            None => true,
        }
    }

    /// Waits until the channel has been torn down.
    ///
    /// Also returns if the owning bridge is dropped mid-drain. There is no
    /// timeout: a pending call that never settles keeps this waiting.
    pub async fn wait(self) {
        if let Some(mut rx) = self.rx {
            let _ = rx.wait_for(|done| *done).await;
        }
    }
}

impl IntoFuture for ShutdownSignal {
    type Output = ();
    type IntoFuture = BoxFuture<'static, ()>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.wait())
    }
}
