//! The worker bridge: correlated calls, graceful shutdown, and event
//! subscriptions over a lazily opened channel.
//!
//! All mutable call state (identifier generator, pending registry, shutdown
//! coordinator, channel slot) lives in one `BridgeCore` behind a
//! `parking_lot::Mutex`. Channel I/O and teardown side effects run after the
//! lock is released, so providers and listeners never observe it held.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};
use workerlink_core::{CallId, Envelope, RequestMessage, TransferList, Value};

use crate::channel::{ChannelProvider, InboundListener, WorkerChannel};
use crate::config::BridgeConfig;
use crate::error::{BridgeError, CallError, TransportError};
use crate::events::{EventListener, EventRegistry, Subscription};
use crate::ids::CallIdGenerator;
use crate::lifecycle::ChannelSlot;
use crate::pending::PendingCalls;
use crate::router::BridgeListener;
use crate::shutdown::{ChannelState, ShutdownCoordinator, ShutdownSignal, ShutdownStep};
use crate::surface::{RemoteMethod, RemoteSurface};
use crate::telemetry;

// ---------------------------------------------------------------------------
// WorkerBridge
// ---------------------------------------------------------------------------

/// Typed request/response and push-event interface to one worker.
///
/// Cloning is cheap and every clone drives the same channel. Independent
/// bridges share no state.
///
/// ```rust,no_run
/// # async fn example(provider: workerlink::transport::MemoryProvider) -> Result<(), workerlink::CallError> {
/// use workerlink::{BridgeConfig, Value, WorkerBridge};
///
/// let bridge = WorkerBridge::new(provider, BridgeConfig::named("math"));
/// let sum = bridge.call("add", vec![Value::from(2), Value::from(3)]).await?;
/// assert_eq!(sum, Value::from(5));
/// bridge.terminate().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct WorkerBridge {
    inner: Arc<BridgeInner>,
}

impl WorkerBridge {
    /// Creates a bridge. No channel is opened until the first call or
    /// subscription.
    #[must_use]
    pub fn new<P>(provider: P, config: BridgeConfig) -> Self
    where
        P: ChannelProvider + 'static,
    {
        let shutdown = ShutdownCoordinator::new();
        let state = shutdown.state_handle();
        Self {
            inner: Arc::new(BridgeInner {
                events: Arc::new(EventRegistry::new(config.name.clone())),
                name: config.name,
                provider: Box::new(provider),
                core: Mutex::new(BridgeCore {
                    ids: CallIdGenerator::new(),
                    pending: PendingCalls::new(),
                    shutdown,
                    channel: ChannelSlot::new(),
                }),
                state,
            }),
        }
    }

    /// The name this bridge logs and reports metrics under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Current channel state, read without taking the core lock.
    #[must_use]
    pub fn state(&self) -> ChannelState {
        **self.inner.state.load()
    }

    /// Number of calls awaiting a response.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.core.lock().pending.len()
    }

    /// Invokes `name` with `args`.
    ///
    /// The request is sent before this returns; the returned future only
    /// waits for the outcome. There is no timeout: the call stays pending
    /// until the worker answers or the channel reports a transport error.
    pub fn call(&self, name: impl Into<String>, args: Vec<Value>) -> PendingCall {
        self.inner.start_call(name.into(), args, None)
    }

    /// Invokes `name`, transferring the listed binary arguments to the worker.
    pub fn call_with_transfer(
        &self,
        name: impl Into<String>,
        args: Vec<Value>,
        transfer: &TransferList,
    ) -> PendingCall {
        self.inner.start_call(name.into(), args, Some(transfer))
    }

    /// Returns a reusable callable for `name`, optionally with a transfer list.
    #[must_use]
    pub fn operation(&self, name: impl Into<String>, transfer: Option<TransferList>) -> RemoteMethod {
        RemoteMethod::new(self.clone(), name.into(), transfer)
    }

    /// Returns the dynamic method surface for this bridge.
    #[must_use]
    pub fn surface(&self) -> RemoteSurface {
        RemoteSurface::new(self.clone())
    }

    /// Begins graceful shutdown.
    ///
    /// With no pending calls the channel is torn down before this returns.
    /// Otherwise new calls are refused with [`CallError::ShuttingDown`] and
    /// the channel is torn down once every pending call has settled.
    /// Concurrent callers share one completion signal.
    pub fn terminate(&self) -> ShutdownSignal {
        self.inner.terminate()
    }

    /// Registers `listener` for `event`, opening the channel if necessary.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Transport` if the channel cannot be opened; the
    /// listener is not registered in that case.
    pub fn subscribe(
        &self,
        event: impl Into<String>,
        listener: Arc<dyn EventListener>,
    ) -> Result<Subscription, BridgeError> {
        let event = event.into();
        {
            let mut core = self.inner.core.lock();
            self.inner.ensure_channel(&mut core)?;
        }
        self.inner.events.add(&event, Arc::clone(&listener));
        debug!(bridge = %self.inner.name, event = %event, "listener subscribed");
        Ok(Subscription::new(Arc::clone(&self.inner.events), event, listener))
    }

    /// Removes `listener` from `event`. Unknown listeners are ignored.
    pub fn unsubscribe(&self, event: &str, listener: &Arc<dyn EventListener>) {
        self.inner.events.remove(event, listener);
    }

    /// Removes all listeners for `event`, or for every event when `None`.
    pub fn clear_listeners(&self, event: Option<&str>) {
        self.inner.events.clear(event);
    }

    /// Number of listeners registered for `event`.
    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.inner.events.listener_count(event)
    }
}

impl std::fmt::Debug for WorkerBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerBridge")
            .field("name", &self.inner.name)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// BridgeInner / BridgeCore
// ---------------------------------------------------------------------------

pub(crate) struct BridgeInner {
    pub(crate) name: String,
    provider: Box<dyn ChannelProvider>,
    core: Mutex<BridgeCore>,
    pub(crate) events: Arc<EventRegistry>,
    state: Arc<ArcSwap<ChannelState>>,
}

struct BridgeCore {
    ids: CallIdGenerator,
    pending: PendingCalls,
    shutdown: ShutdownCoordinator,
    channel: ChannelSlot,
}

impl BridgeCore {
    /// Runs after every resolve, reject, or fail-all.
    fn after_settle(&mut self) -> Teardown {
        match self.shutdown.on_registry_settled(self.pending.len()) {
            Some(drained) => Teardown {
                channel: self.detach_channel(),
                drained: Some(drained),
            },
            None => Teardown::default(),
        }
    }

    fn detach_channel(&mut self) -> Option<Arc<dyn WorkerChannel>> {
        self.ids.reset();
        self.channel.take()
    }
}

/// Side effects of a teardown, applied once the core lock is released.
#[derive(Default)]
#[must_use]
struct Teardown {
    channel: Option<Arc<dyn WorkerChannel>>,
    drained: Option<watch::Sender<bool>>,
}

impl Teardown {
    fn finish(self, bridge: &str) {
        if let Some(channel) = self.channel {
            channel.close();
            info!(bridge, "channel torn down");
        }
        if let Some(drained) = self.drained {
            // Receivers may all have been dropped; nobody is waiting then.
            let _ = drained.send(true);
        }
    }
}

impl BridgeInner {
    fn ensure_channel(
        self: &Arc<Self>,
        core: &mut BridgeCore,
    ) -> Result<Arc<dyn WorkerChannel>, TransportError> {
        let bridge: Weak<BridgeInner> = Arc::downgrade(self);
        let (channel, opened) = core.channel.ensure(self.provider.as_ref(), |generation| {
            Arc::new(BridgeListener::new(bridge, generation)) as Arc<dyn InboundListener>
        })?;
        if opened {
            core.shutdown.activate();
            info!(bridge = %self.name, "channel opened");
        }
        Ok(channel)
    }

    fn start_call(
        self: &Arc<Self>,
        name: String,
        args: Vec<Value>,
        transfer: Option<&TransferList>,
    ) -> PendingCall {
        let (tx, rx) = oneshot::channel();

        let (id, generation, channel, envelope) = {
            let mut core = self.core.lock();
            if !core.shutdown.admits_calls() {
                debug!(
                    bridge = %self.name,
                    operation = %name,
                    state = ?core.shutdown.state(),
                    "call refused during shutdown"
                );
                return PendingCall::failed(CallError::ShuttingDown);
            }

            // The identifier is assigned below, once the call is admitted.
            let message = RequestMessage::new(CallId(0), name, args);
            let mut envelope = match transfer {
                Some(list) => match Envelope::with_transfer(message, list) {
                    Ok(envelope) => envelope,
                    Err(err) => return PendingCall::failed(err.into()),
                },
                None => Envelope::new(message),
            };

            let channel = match self.ensure_channel(&mut core) {
                Ok(channel) => channel,
                Err(err) => {
                    warn!(bridge = %self.name, error = %err, "failed to open channel");
                    return PendingCall::failed(err.into());
                }
            };

            let id = core.ids.next();
            envelope.message.id = id.get();
            core.pending.register(id, tx);
            telemetry::pending_calls(&self.name, core.pending.len());
            (id, core.channel.generation(), channel, envelope)
        };

        debug!(
            bridge = %self.name,
            call_id = %id,
            operation = %envelope.message.name,
            transferred = envelope.transfer.len(),
            "sending call"
        );
        telemetry::call_sent(&self.name);

        if let Err(err) = channel.post(envelope) {
            warn!(bridge = %self.name, call_id = %id, error = %err, "failed to post call");
            // The channel may have been replaced meanwhile and `id` reissued.
            self.settle(generation, id, Err(err.into()));
        }

        PendingCall::waiting(id, rx)
    }

    /// Settles one call and re-checks whether a drain can complete.
    ///
    /// The outcome is dropped unless `generation` is the live channel.
    /// Unknown identifiers are a benign race and only traced.
    pub(crate) fn settle(&self, generation: u64, id: CallId, outcome: Result<Value, CallError>) {
        let teardown = {
            let mut core = self.core.lock();
            if !core.channel.is_current(generation) {
                debug!(bridge = %self.name, call_id = %id, "outcome from closed channel ignored");
                return;
            }
            let found = match outcome {
                Ok(payload) => core.pending.resolve(id, payload),
                Err(reason) => core.pending.reject(id, reason),
            };
            if !found {
                debug!(bridge = %self.name, call_id = %id, "response for unknown call ignored");
                return;
            }
            telemetry::pending_calls(&self.name, core.pending.len());
            core.after_settle()
        };
        teardown.finish(&self.name);
    }

    /// Fails every pending call after a channel-level fault.
    ///
    /// The channel itself stays open; later calls reuse it.
    pub(crate) fn fail_pending(&self, generation: u64, error: TransportError) {
        let teardown = {
            let mut core = self.core.lock();
            if !core.channel.is_current(generation) {
                debug!(bridge = %self.name, error = %error, "transport error from closed channel ignored");
                return;
            }
            let failed = core.pending.fail_all(&CallError::Transport(error.clone()));
            warn!(bridge = %self.name, error = %error, failed, "transport error, pending calls failed");
            telemetry::transport_failure(&self.name);
            telemetry::pending_calls(&self.name, 0);
            core.after_settle()
        };
        teardown.finish(&self.name);
    }

    /// Whether frames tagged with `generation` belong to the live channel.
    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.core.lock().channel.is_current(generation)
    }

    fn terminate(&self) -> ShutdownSignal {
        let (signal, teardown) = {
            let mut core = self.core.lock();
            let pending = core.pending.len();
            match core.shutdown.request(pending) {
                ShutdownStep::Complete => (ShutdownSignal::complete(), Teardown::default()),
                ShutdownStep::TearDown => (
                    ShutdownSignal::complete(),
                    Teardown {
                        channel: core.detach_channel(),
                        drained: None,
                    },
                ),
                ShutdownStep::Drain(signal) => {
                    info!(bridge = %self.name, pending, "shutdown requested, draining pending calls");
                    (signal, Teardown::default())
                }
            }
        };
        teardown.finish(&self.name);
        signal
    }
}

impl Drop for BridgeInner {
    fn drop(&mut self) {
        if let Some(channel) = self.core.get_mut().channel.take() {
            channel.close();
        }
    }
}

// ---------------------------------------------------------------------------
// PendingCall
// ---------------------------------------------------------------------------

/// Future returned by a call; resolves to the worker's success payload.
///
/// The request has already been sent when this value exists. Dropping it
/// does not cancel the call: the worker still runs it and the pending entry
/// is only cleared when the response arrives.
#[must_use = "the call is already sent; await the PendingCall to observe its outcome"]
#[derive(Debug)]
pub struct PendingCall {
    id: Option<CallId>,
    state: PendingState,
}

#[derive(Debug)]
enum PendingState {
    Waiting(oneshot::Receiver<Result<Value, CallError>>),
    Failed(Option<CallError>),
}

impl PendingCall {
    fn waiting(id: CallId, rx: oneshot::Receiver<Result<Value, CallError>>) -> Self {
        Self {
            id: Some(id),
            state: PendingState::Waiting(rx),
        }
    }

    fn failed(err: CallError) -> Self {
        Self {
            id: None,
            state: PendingState::Failed(Some(err)),
        }
    }

    /// The call's correlation identifier, or `None` if it was refused
    /// before one was assigned.
    #[must_use]
    pub fn id(&self) -> Option<CallId> {
        self.id
    }
}

impl Future for PendingCall {
    type Output = Result<Value, CallError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().state {
            PendingState::Waiting(rx) => Pin::new(rx)
                .poll(cx)
                .map(|received| received.unwrap_or_else(|_| Err(CallError::Dropped))),
            PendingState::Failed(err) => {
                Poll::Ready(Err(err.take().unwrap_or(CallError::Dropped)))
            }
        }
    }
}
