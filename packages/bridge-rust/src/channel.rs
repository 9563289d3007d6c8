//! Channel provider contract.
//!
//! The bridge never owns a transport directly. A [`ChannelProvider`] opens a
//! live duplex [`WorkerChannel`] on demand and attaches an
//! [`InboundListener`] that receives every frame and transport fault the
//! channel observes.
//!
//! Implementations must not invoke the listener synchronously from inside
//! `open`, `post`, or `close`; inbound delivery happens from the provider's
//! own task or thread.

use std::sync::Arc;

use workerlink_core::{Envelope, Value};

use crate::error::TransportError;

/// Factory for worker channels.
pub trait ChannelProvider: Send + Sync {
    /// Opens a new channel and attaches `listener` to its inbound side.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the channel cannot be created.
    fn open(
        &self,
        listener: Arc<dyn InboundListener>,
    ) -> Result<Arc<dyn WorkerChannel>, TransportError>;
}

/// Outbound half of a live channel.
pub trait WorkerChannel: Send + Sync {
    /// Sends a request envelope, moving any transferred buffers with it.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the message cannot be queued or encoded.
    fn post(&self, envelope: Envelope) -> Result<(), TransportError>;

    /// Tears the channel down. Idempotent; no frames are delivered afterwards.
    fn close(&self);
}

/// Receiver of inbound traffic from a channel.
pub trait InboundListener: Send + Sync {
    /// Called for every structured frame the worker sends.
    fn on_frame(&self, frame: Value);

    /// Called when the channel itself fails to deliver or decode a message.
    fn on_error(&self, error: TransportError);
}
