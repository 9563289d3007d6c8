//! Worker side of the channel: handler routing and the dispatch loop.
//!
//! A worker owns a [`HandlerRouter`] mapping operation names to
//! `tower::Service` handlers. [`serve`] decodes each request, runs its
//! handler concurrently with all others, and writes one response per
//! request. Handlers push events at any time through the request's
//! [`EventEmitter`].

mod router;
mod serve;

pub use router::{HandlerRouter, HandlerService};
pub use serve::{serve, WireRequest};

use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use workerlink_core::{codec, CallId, EventMessage, Value};

use crate::error::TransportError;

// ---------------------------------------------------------------------------
// WorkerRequest
// ---------------------------------------------------------------------------

/// One decoded call as seen by a handler.
#[derive(Debug, Clone)]
pub struct WorkerRequest {
    pub id: CallId,
    pub name: String,
    pub args: Vec<Value>,
    pub events: EventEmitter,
}

impl WorkerRequest {
    /// Deserializes argument `index` into `T`.
    ///
    /// # Errors
    ///
    /// Fails if the argument is missing or does not match `T`.
    pub fn arg<T: DeserializeOwned>(&self, index: usize) -> anyhow::Result<T> {
        let value = self
            .args
            .get(index)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("missing argument {index} for '{}'", self.name))?;
        Ok(rmpv::ext::from_value(value)?)
    }
}

// ---------------------------------------------------------------------------
// EventEmitter
// ---------------------------------------------------------------------------

/// Pushes unsolicited events back to the bridge.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    tx: mpsc::Sender<Vec<u8>>,
}

impl EventEmitter {
    pub(crate) fn new(tx: mpsc::Sender<Vec<u8>>) -> Self {
        Self { tx }
    }

    /// Emits a single-payload event.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Closed` once the channel is gone.
    pub async fn emit(&self, name: impl Into<String>, payload: Value) -> Result<(), TransportError> {
        self.send(&EventMessage::sent(name, payload)).await
    }

    /// Emits an event carrying a positional argument list.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Closed` once the channel is gone.
    pub async fn emit_args(
        &self,
        name: impl Into<String>,
        args: Vec<Value>,
    ) -> Result<(), TransportError> {
        self.send(&EventMessage::send(name, args)).await
    }

    /// Writes bytes to the channel unmodified. Anything that is not a valid
    /// frame surfaces on the bridge as a decode failure.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Closed` once the channel is gone.
    pub async fn send_raw(&self, bytes: Vec<u8>) -> Result<(), TransportError> {
        self.tx.send(bytes).await.map_err(|_| TransportError::Closed)
    }

    async fn send(&self, event: &EventMessage) -> Result<(), TransportError> {
        let bytes = codec::encode(event)?;
        self.send_raw(bytes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(args: Vec<Value>) -> (WorkerRequest, mpsc::Receiver<Vec<u8>>) {
        let (tx, rx) = mpsc::channel(8);
        let request = WorkerRequest {
            id: CallId(1),
            name: "add".into(),
            args,
            events: EventEmitter::new(tx),
        };
        (request, rx)
    }

    #[test]
    fn typed_argument_access() {
        let (req, _rx) = request(vec![Value::from(2), Value::from("x")]);
        assert_eq!(req.arg::<i64>(0).unwrap(), 2);
        assert_eq!(req.arg::<String>(1).unwrap(), "x");
        assert!(req.arg::<i64>(1).is_err());
        let missing = req.arg::<i64>(5).unwrap_err();
        assert!(missing.to_string().contains("missing argument 5"));
    }

    #[tokio::test]
    async fn emitted_events_classify_as_events() {
        let (req, mut rx) = request(vec![]);
        req.events.emit("ping", Value::from(1)).await.unwrap();
        req.events
            .emit_args("progress", vec![Value::from(1), Value::from(2)])
            .await
            .unwrap();

        for expected in ["ping", "progress"] {
            let bytes = rx.recv().await.unwrap();
            let frame = codec::decode_frame(&bytes).unwrap();
            match workerlink_core::classify(frame).unwrap() {
                workerlink_core::Inbound::Event(event) => assert_eq!(event.name(), expected),
                other @ workerlink_core::Inbound::Response(_) => {
                    panic!("expected event, got {other:?}")
                }
            }
        }
    }

    #[tokio::test]
    async fn emit_after_close_fails() {
        let (req, rx) = request(vec![]);
        drop(rx);
        assert_eq!(
            req.events.emit("ping", Value::Nil).await,
            Err(TransportError::Closed)
        );
    }
}
