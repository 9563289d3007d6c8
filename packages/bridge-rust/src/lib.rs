//! `workerlink`: request/response correlation, graceful shutdown, and push
//! event fan-out over a message-passing worker channel.
//!
//! A [`WorkerBridge`] turns a fire-and-forget channel into awaitable calls.
//! Each call gets a fresh [`CallId`]; the worker's response settles exactly
//! the call that carries its id, in whatever order responses arrive. Frames
//! tagged as events go to subscribers instead.
//!
//! ```rust,no_run
//! use workerlink::transport::MemoryProvider;
//! use workerlink::worker::{HandlerRouter, WorkerRequest};
//! use workerlink::{BridgeConfig, MemoryConfig, Value, WorkerBridge};
//!
//! # async fn run() -> Result<(), workerlink::CallError> {
//! let provider = MemoryProvider::new(
//!     || {
//!         HandlerRouter::new().handle("add", |req: WorkerRequest| async move {
//!             Ok(Value::from(req.arg::<i64>(0)? + req.arg::<i64>(1)?))
//!         })
//!     },
//!     MemoryConfig::default(),
//! );
//! let bridge = WorkerBridge::new(provider, BridgeConfig::default());
//! assert_eq!(bridge.call("add", vec![Value::from(2), Value::from(3)]).await?, Value::from(5));
//! bridge.terminate().await;
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod channel;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod shutdown;
pub mod surface;
pub mod telemetry;
pub mod transport;
pub mod worker;

mod ids;
mod lifecycle;
mod pending;
mod router;

#[cfg(test)]
mod testing;

pub use bridge::{PendingCall, WorkerBridge};
pub use channel::{ChannelProvider, InboundListener, WorkerChannel};
pub use config::{BridgeConfig, MemoryConfig};
pub use error::{BridgeError, CallError, TransportError, SHUTTING_DOWN_MESSAGE};
pub use events::{listener, EventListener, EventRegistry, Subscription};
pub use shutdown::{ChannelState, ShutdownSignal};
pub use surface::{RemoteMethod, RemoteSurface};
pub use workerlink_core::{CallId, EventPayload, TransferList, Value};
