//! Name-based handler routing.

use std::collections::HashMap;
use std::convert::Infallible;
use std::future::Future;
use std::task::{Context, Poll};

use futures_util::future::BoxFuture;
use tower::util::BoxCloneService;
use tower::{service_fn, Service, ServiceExt};
use tracing::debug;
use workerlink_core::{ResponseMessage, Value};

use super::WorkerRequest;

/// A type-erased handler for one operation.
pub type HandlerService = BoxCloneService<WorkerRequest, Value, anyhow::Error>;

// ---------------------------------------------------------------------------
// HandlerRouter
// ---------------------------------------------------------------------------

/// Routes requests to handlers by operation name.
///
/// Every request produces exactly one `ResponseMessage`: the handler's value
/// on success, or an error response carrying a description when the name is
/// unknown or the handler fails. The router itself never errors.
#[derive(Clone, Default)]
pub struct HandlerRouter {
    handlers: HashMap<String, HandlerService>,
}

impl HandlerRouter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a `tower::Service` for `name`, replacing any previous one.
    #[must_use]
    pub fn register<S>(mut self, name: impl Into<String>, service: S) -> Self
    where
        S: Service<WorkerRequest, Response = Value, Error = anyhow::Error> + Clone + Send + 'static,
        S::Future: Send + 'static,
    {
        self.handlers.insert(name.into(), BoxCloneService::new(service));
        self
    }

    /// Registers an async closure for `name`.
    #[must_use]
    pub fn handle<F, Fut>(self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(WorkerRequest) -> Fut + Clone + Send + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        self.register(name, service_fn(handler))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }
}

impl std::fmt::Debug for HandlerRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("HandlerRouter")
            .field("operations", &names)
            .finish()
    }
}

impl Service<WorkerRequest> for HandlerRouter {
    type Response = ResponseMessage;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<ResponseMessage, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // Handlers are readied individually when called.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: WorkerRequest) -> Self::Future {
        let id = request.id;
        let name = request.name.clone();
        let Some(handler) = self.handlers.get(&name).cloned() else {
            debug!(operation = %name, call_id = %id, "no handler registered");
            let message = format!("operation '{name}' not found");
            return Box::pin(async move {
                Ok(ResponseMessage::failure(id, name, Value::from(message)))
            });
        };

        Box::pin(async move {
            let response = match handler.oneshot(request).await {
                Ok(payload) => ResponseMessage::success(id, name, payload),
                Err(err) => {
                    debug!(operation = %name, call_id = %id, error = %err, "handler failed");
                    ResponseMessage::failure(id, name, Value::from(err.to_string()))
                }
            };
            Ok(response)
        })
    }
}
