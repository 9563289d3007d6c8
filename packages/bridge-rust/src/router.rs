//! Routes inbound frames from the live channel.
//!
//! Every frame is either a response (settles exactly one pending call) or a
//! push event (fans out to subscribers). The two paths never touch each
//! other's registry.

use std::sync::Weak;

use tracing::{debug, trace};
use workerlink_core::{classify, Inbound, Value};

use crate::bridge::BridgeInner;
use crate::channel::InboundListener;
use crate::error::{CallError, TransportError};

/// Listener handed to a channel when it is opened.
///
/// Holds only a weak reference, so an open channel never keeps its bridge
/// alive. The generation ties every frame to the channel that produced it.
pub(crate) struct BridgeListener {
    bridge: Weak<BridgeInner>,
    generation: u64,
}

impl BridgeListener {
    pub(crate) fn new(bridge: Weak<BridgeInner>, generation: u64) -> Self {
        Self { bridge, generation }
    }
}

impl InboundListener for BridgeListener {
    fn on_frame(&self, frame: Value) {
        if let Some(bridge) = self.bridge.upgrade() {
            route_frame(&bridge, self.generation, frame);
        }
    }

    fn on_error(&self, error: TransportError) {
        if let Some(bridge) = self.bridge.upgrade() {
            bridge.fail_pending(self.generation, error);
        }
    }
}

fn route_frame(bridge: &BridgeInner, generation: u64, frame: Value) {
    match classify(frame) {
        Ok(Inbound::Event(event)) => {
            if !bridge.is_current(generation) {
                debug!(bridge = %bridge.name, event = %event.name(), "event from closed channel ignored");
                return;
            }
            let (name, payload) = event.into_parts();
            let delivered = bridge.events.dispatch(&name, &payload);
            trace!(bridge = %bridge.name, event = %name, delivered, "event dispatched");
        }
        Ok(Inbound::Response(response)) => {
            let id = response.call_id();
            let outcome = if response.error {
                Err(CallError::Remote {
                    payload: response.payload,
                })
            } else {
                Ok(response.payload)
            };
            bridge.settle(generation, id, outcome);
        }
        Err(err) => bridge.fail_pending(generation, err.into()),
    }
}
