//! The worker dispatch loop.

use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tower::{Service, ServiceExt};
use tracing::{debug, warn};
use workerlink_core::{codec, Envelope, RequestMessage, ResponseMessage, TransferredBuffer, Value};

use super::{EventEmitter, HandlerRouter, WorkerRequest};

/// An encoded request plus the buffers transferred alongside it.
#[derive(Debug)]
pub struct WireRequest {
    pub bytes: Vec<u8>,
    pub transfer: Vec<TransferredBuffer>,
}

/// Serves requests until the request channel closes, then waits for
/// in-flight handlers to finish.
///
/// Each request runs in its own task, so a slow handler never delays
/// another. Undecodable requests carry no usable identifier and are
/// dropped with a warning. A panicking handler is answered with an error
/// response.
pub async fn serve(
    mut router: HandlerRouter,
    mut requests: mpsc::UnboundedReceiver<WireRequest>,
    outbound: mpsc::Sender<Vec<u8>>,
) {
    let events = EventEmitter::new(outbound.clone());
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            wire = requests.recv() => {
                let Some(wire) = wire else { break };
                let message = match codec::decode::<RequestMessage>(&wire.bytes) {
                    Ok(message) => message,
                    Err(err) => {
                        warn!(error = %err, "dropping undecodable request");
                        continue;
                    }
                };
                let message = Envelope { message, transfer: wire.transfer }.reassemble();
                let id = message.call_id();
                debug!(call_id = %id, operation = %message.name, "request received");

                let request = WorkerRequest {
                    id,
                    name: message.name,
                    args: message.args,
                    events: events.clone(),
                };
                let name = request.name.clone();
                let call = match router.ready().await {
                    Ok(router) => router.call(request),
                    Err(never) => match never {},
                };
                let outbound = outbound.clone();
                in_flight.spawn(async move {
                    let response = match AssertUnwindSafe(call).catch_unwind().await {
                        Ok(Ok(response)) => response,
                        Ok(Err(never)) => match never {},
                        Err(_) => {
                            warn!(call_id = %id, operation = %name, "handler panicked");
                            ResponseMessage::failure(
                                id,
                                name.as_str(),
                                Value::from(format!("operation '{name}' panicked")),
                            )
                        }
                    };
                    reply(&outbound, &response).await;
                });
            }
            Some(joined) = in_flight.join_next() => {
                if let Err(err) = joined {
                    if err.is_panic() {
                        warn!(error = %err, "response task panicked");
                    }
                }
            }
        }
    }

    while in_flight.join_next().await.is_some() {}
}

async fn reply(outbound: &mpsc::Sender<Vec<u8>>, response: &ResponseMessage) {
    match codec::encode(response) {
        Ok(bytes) => {
            if outbound.send(bytes).await.is_err() {
                debug!(call_id = %response.call_id(), "channel closed before response was sent");
            }
        }
        Err(err) => warn!(call_id = %response.call_id(), error = %err, "failed to encode response"),
    }
}
