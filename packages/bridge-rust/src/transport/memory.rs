//! In-process channel provider.
//!
//! Each opened channel spawns a worker task running [`serve`] over a fresh
//! [`HandlerRouter`] and a pump task that decodes the worker's output and
//! feeds the bridge's listener. Messages cross as `MsgPack` bytes over
//! `mpsc` channels, so codec failures surface exactly as they would on an
//! out-of-process transport.
//!
//! The request queue is unbounded: `post` is synchronous and never rejects
//! a call for lack of capacity. Worker output is bounded and applies
//! backpressure to handlers instead.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;
use workerlink_core::{codec, Envelope};

use crate::channel::{ChannelProvider, InboundListener, WorkerChannel};
use crate::config::MemoryConfig;
use crate::error::TransportError;
use crate::worker::{serve, HandlerRouter, WireRequest};

type RouterFactory = dyn Fn() -> HandlerRouter + Send + Sync;

// ---------------------------------------------------------------------------
// MemoryProvider
// ---------------------------------------------------------------------------

/// Opens in-process worker channels on the current tokio runtime.
#[derive(Clone)]
pub struct MemoryProvider {
    factory: Arc<RouterFactory>,
    config: MemoryConfig,
}

impl MemoryProvider {
    /// `factory` builds the handler set for every new worker, so a channel
    /// recreated after shutdown starts from fresh worker state.
    pub fn new<F>(factory: F, config: MemoryConfig) -> Self
    where
        F: Fn() -> HandlerRouter + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(factory),
            config,
        }
    }
}

impl std::fmt::Debug for MemoryProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryProvider")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ChannelProvider for MemoryProvider {
    fn open(
        &self,
        listener: Arc<dyn InboundListener>,
    ) -> Result<Arc<dyn WorkerChannel>, TransportError> {
        let runtime = Handle::try_current().map_err(|e| TransportError::Other(e.to_string()))?;
        let capacity = self.config.channel_capacity.max(1);

        let (requests_tx, requests_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::channel(capacity);

        let worker = runtime.spawn(serve((self.factory)(), requests_rx, outbound_tx));
        let pump = runtime.spawn(pump(outbound_rx, listener));
        debug!(capacity, "in-process worker started");

        Ok(Arc::new(MemoryChannel {
            requests: requests_tx,
            tasks: Mutex::new(vec![worker, pump]),
            closed: AtomicBool::new(false),
        }))
    }
}

/// Decodes worker output and hands it to the listener until the worker side
/// goes away.
async fn pump(mut outbound: mpsc::Receiver<Vec<u8>>, listener: Arc<dyn InboundListener>) {
    while let Some(bytes) = outbound.recv().await {
        match codec::decode_frame(&bytes) {
            Ok(frame) => listener.on_frame(frame),
            Err(err) => listener.on_error(err.into()),
        }
    }
    // Every sender is gone: the worker stopped without the channel being
    // closed from this side.
    listener.on_error(TransportError::Closed);
}

// ---------------------------------------------------------------------------
// MemoryChannel
// ---------------------------------------------------------------------------

/// Caller half of an in-process channel.
pub struct MemoryChannel {
    requests: mpsc::UnboundedSender<WireRequest>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl WorkerChannel for MemoryChannel {
    fn post(&self, envelope: Envelope) -> Result<(), TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        let wire = WireRequest {
            bytes: codec::encode(&envelope.message)?,
            transfer: envelope.transfer,
        };
        self.requests.send(wire).map_err(|_| TransportError::Closed)
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
        debug!("in-process worker stopped");
    }
}

impl Drop for MemoryChannel {
    fn drop(&mut self) {
        for task in self.tasks.get_mut().drain(..) {
            task.abort();
        }
    }
}

impl std::fmt::Debug for MemoryChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryChannel")
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc::UnboundedSender;
    use workerlink_core::{CallId, RequestMessage, Value};

    use super::*;
    use crate::worker::WorkerRequest;

    struct Recorder {
        frames: UnboundedSender<Result<Value, TransportError>>,
    }

    impl InboundListener for Recorder {
        fn on_frame(&self, frame: Value) {
            let _ = self.frames.send(Ok(frame));
        }

        fn on_error(&self, error: TransportError) {
            let _ = self.frames.send(Err(error));
        }
    }

    fn provider() -> MemoryProvider {
        MemoryProvider::new(
            || {
                HandlerRouter::new()
                    .handle("echo", |req: WorkerRequest| async move {
                        Ok(req.args.into_iter().next().unwrap_or(Value::Nil))
                    })
                    .handle("corrupt", |req: WorkerRequest| async move {
                        req.events.send_raw(vec![0xc1]).await?;
                        Ok(Value::Nil)
                    })
                    .handle("hang", |_req: WorkerRequest| async move {
                        tokio::time::sleep(Duration::from_secs(3600)).await;
                        Ok(Value::Nil)
                    })
            },
            MemoryConfig { channel_capacity: 1 },
        )
    }

    fn open() -> (
        Arc<dyn WorkerChannel>,
        mpsc::UnboundedReceiver<Result<Value, TransportError>>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let channel = provider().open(Arc::new(Recorder { frames: tx })).unwrap();
        (channel, rx)
    }

    fn request(id: u64, name: &str) -> Envelope {
        Envelope::new(RequestMessage::new(CallId(id), name, vec![Value::from(id)]))
    }

    #[tokio::test]
    async fn round_trip_through_worker() {
        let (channel, mut frames) = open();
        channel.post(request(1, "echo")).unwrap();
        let frame = frames.recv().await.unwrap().unwrap();
        let Value::Map(fields) = frame else {
            panic!("expected map frame");
        };
        assert!(fields.contains(&(Value::from("id"), Value::from(1))));
    }

    #[tokio::test]
    async fn corrupt_output_surfaces_as_decode_error() {
        let (channel, mut frames) = open();
        channel.post(request(1, "corrupt")).unwrap();
        assert!(matches!(
            frames.recv().await.unwrap(),
            Err(TransportError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn burst_beyond_capacity_is_accepted() {
        let (channel, mut frames) = open();
        // Capacity is 1 and the worker has not been scheduled yet.
        for id in 0..300 {
            channel.post(request(id, "echo")).unwrap();
        }
        for _ in 0..300 {
            assert!(frames.recv().await.unwrap().is_ok());
        }
    }

    #[tokio::test]
    async fn post_after_close_fails_and_close_is_idempotent() {
        let (channel, _frames) = open();
        channel.close();
        channel.close();
        assert_eq!(channel.post(request(1, "echo")), Err(TransportError::Closed));
    }

    #[test]
    fn open_without_runtime_fails() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let result = provider().open(Arc::new(Recorder { frames: tx }));
        assert!(matches!(result, Err(TransportError::Other(_))));
    }
}
