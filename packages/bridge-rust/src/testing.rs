//! Scripted channel provider for unit tests.
//!
//! Records everything the bridge sends and lets a test inject responses,
//! events, and faults. Listener callbacks always run with the script's lock
//! released.

use std::sync::Arc;

use parking_lot::Mutex;
use workerlink_core::{CallId, Envelope, EventMessage, ResponseMessage, Value};

use crate::channel::{ChannelProvider, InboundListener, WorkerChannel};
use crate::error::TransportError;

#[derive(Default)]
struct Script {
    open_count: usize,
    close_count: usize,
    fail_open: bool,
    fail_post: bool,
    listener: Option<Arc<dyn InboundListener>>,
    posted: Vec<Envelope>,
    on_next_post: Option<Box<dyn FnOnce() + Send>>,
}

#[derive(Clone, Default)]
pub(crate) struct ScriptedProvider {
    script: Arc<Mutex<Script>>,
}

impl ScriptedProvider {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn open_count(&self) -> usize {
        self.script.lock().open_count
    }

    pub(crate) fn close_count(&self) -> usize {
        self.script.lock().close_count
    }

    pub(crate) fn fail_open(&self, fail: bool) {
        self.script.lock().fail_open = fail;
    }

    pub(crate) fn fail_post(&self, fail: bool) {
        self.script.lock().fail_post = fail;
    }

    /// Runs `hook` at the start of the next `post`, with the script unlocked.
    pub(crate) fn on_next_post(&self, hook: impl FnOnce() + Send + 'static) {
        self.script.lock().on_next_post = Some(Box::new(hook));
    }

    /// Listener of the most recently opened channel.
    pub(crate) fn listener(&self) -> Option<Arc<dyn InboundListener>> {
        self.script.lock().listener.clone()
    }

    pub(crate) fn posted(&self) -> Vec<Envelope> {
        self.script.lock().posted.clone()
    }

    pub(crate) fn respond(&self, id: u64, name: &str, payload: Value) {
        self.push_frame(ResponseMessage::success(CallId(id), name, payload).into_frame());
    }

    pub(crate) fn fail(&self, id: u64, name: &str, payload: Value) {
        self.push_frame(ResponseMessage::failure(CallId(id), name, payload).into_frame());
    }

    pub(crate) fn push_event(&self, name: &str, payload: Value) {
        self.push_frame(EventMessage::sent(name, payload).into_frame());
    }

    pub(crate) fn push_args_event(&self, name: &str, args: Vec<Value>) {
        self.push_frame(EventMessage::send(name, args).into_frame());
    }

    pub(crate) fn push_frame(&self, frame: Value) {
        if let Some(listener) = self.listener() {
            listener.on_frame(frame);
        }
    }

    pub(crate) fn transport_error(&self, error: TransportError) {
        if let Some(listener) = self.listener() {
            listener.on_error(error);
        }
    }
}

impl ChannelProvider for ScriptedProvider {
    fn open(
        &self,
        listener: Arc<dyn InboundListener>,
    ) -> Result<Arc<dyn WorkerChannel>, TransportError> {
        let mut script = self.script.lock();
        if script.fail_open {
            return Err(TransportError::Other("scripted open failure".into()));
        }
        script.open_count += 1;
        script.listener = Some(listener);
        Ok(Arc::new(ScriptedChannel {
            script: Arc::clone(&self.script),
        }))
    }
}

struct ScriptedChannel {
    script: Arc<Mutex<Script>>,
}

impl WorkerChannel for ScriptedChannel {
    fn post(&self, envelope: Envelope) -> Result<(), TransportError> {
        let hook = self.script.lock().on_next_post.take();
        if let Some(hook) = hook {
            hook();
        }
        let mut script = self.script.lock();
        if script.fail_post {
            return Err(TransportError::Closed);
        }
        script.posted.push(envelope);
        Ok(())
    }

    fn close(&self) {
        self.script.lock().close_count += 1;
    }
}
