//! Shared worker fixture for end-to-end tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use workerlink::transport::MemoryProvider;
use workerlink::worker::{HandlerRouter, WorkerRequest};
use workerlink::{BridgeConfig, MemoryConfig, Value, WorkerBridge};

/// Opens permits for calls to `gated`, one per call.
#[derive(Clone)]
pub struct Gate(Arc<Semaphore>);

impl Gate {
    pub fn closed() -> Self {
        Self(Arc::new(Semaphore::new(0)))
    }

    pub fn release(&self, calls: usize) {
        self.0.add_permits(calls);
    }
}

pub fn worker(gate: &Gate) -> HandlerRouter {
    let gate = gate.clone();
    HandlerRouter::new()
        .handle("add", |req: WorkerRequest| async move {
            Ok(Value::from(req.arg::<i64>(0)? + req.arg::<i64>(1)?))
        })
        .handle("throwError", |_req: WorkerRequest| async move {
            Err(anyhow::anyhow!("boom"))
        })
        .handle("delay", |req: WorkerRequest| async move {
            let ms = req.arg::<u64>(0)?;
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok(Value::from(ms))
        })
        .handle("gated", move |req: WorkerRequest| {
            let gate = gate.clone();
            async move {
                gate.0.acquire().await?.forget();
                Ok(req.args.into_iter().next().unwrap_or(Value::Nil))
            }
        })
        .handle("startPing", |req: WorkerRequest| async move {
            let times = req.arg::<u32>(0)?;
            for n in 0..times {
                req.events.emit("ping", Value::from(n)).await?;
            }
            Ok(Value::from(times))
        })
        .handle("progress", |req: WorkerRequest| async move {
            req.events
                .emit_args("progress", vec![Value::from(50), Value::from("half")])
                .await?;
            Ok(Value::Nil)
        })
        .handle("corrupt", |req: WorkerRequest| async move {
            req.events.send_raw(vec![0xc1]).await?;
            Ok(Value::Nil)
        })
        .handle("byteLength", |req: WorkerRequest| async move {
            match req.args.first() {
                Some(Value::Binary(bytes)) => Ok(Value::from(bytes.len() as u64)),
                _ => Err(anyhow::anyhow!("expected a binary argument")),
            }
        })
}

pub fn bridge() -> (WorkerBridge, Gate) {
    let gate = Gate::closed();
    let factory_gate = gate.clone();
    let provider = MemoryProvider::new(move || worker(&factory_gate), MemoryConfig::default());
    (WorkerBridge::new(provider, BridgeConfig::named("e2e")), gate)
}
