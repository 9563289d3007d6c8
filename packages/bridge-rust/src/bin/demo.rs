//! Runs an in-process arithmetic worker and drives it through a bridge.

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use workerlink::logging::{self, LogFormat};
use workerlink::transport::MemoryProvider;
use workerlink::worker::{HandlerRouter, WorkerRequest};
use workerlink::{listener, BridgeConfig, EventPayload, MemoryConfig, Value, WorkerBridge};

#[derive(Debug, Parser)]
#[command(name = "workerlink-demo", about = "Correlated calls over an in-process worker")]
struct Args {
    /// Log output format.
    #[arg(long, env = "WORKERLINK_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Number of concurrent `add` calls to issue.
    #[arg(long, env = "WORKERLINK_CALLS", default_value_t = 8)]
    calls: u32,

    /// Bridge name used in logs and metrics.
    #[arg(long, env = "WORKERLINK_NAME", default_value = "demo")]
    name: String,

    /// Capacity of the in-process request and response queues.
    #[arg(long, env = "WORKERLINK_CAPACITY", default_value_t = 256)]
    capacity: usize,
}

workerlink::remote_interface! {
    /// Typed client for the demo worker.
    struct Arithmetic {
        fn add(a: i64, b: i64) -> i64;
        fn slow_double(n: i64) -> i64 => "slowDouble";
        fn throw_error() -> () => "throwError";
    }
}

fn worker() -> HandlerRouter {
    HandlerRouter::new()
        .handle("add", |req: WorkerRequest| async move {
            let sum = req.arg::<i64>(0)? + req.arg::<i64>(1)?;
            req.events.emit("progress", Value::from(sum)).await?;
            Ok(Value::from(sum))
        })
        .handle("slowDouble", |req: WorkerRequest| async move {
            let n = req.arg::<i64>(0)?;
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(Value::from(n * 2))
        })
        .handle("throwError", |_req: WorkerRequest| async move {
            Err(anyhow::anyhow!("boom"))
        })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(args.log_format)?;

    let provider = MemoryProvider::new(
        worker,
        MemoryConfig {
            channel_capacity: args.capacity,
        },
    );
    let bridge = WorkerBridge::new(provider, BridgeConfig::named(args.name));
    let client = Arithmetic::new(bridge.clone());

    let _progress = bridge
        .subscribe(
            "progress",
            listener(|payload: &EventPayload| {
                info!(value = ?payload.first(), "progress event");
                Ok(())
            }),
        )
        .context("failed to open worker channel")?;

    let calls = (0..i64::from(args.calls)).map(|n| {
        let client = client.clone();
        async move { client.add(n, n).await }
    });
    for (n, result) in futures_util::future::join_all(calls).await.into_iter().enumerate() {
        info!(call = n, result = ?result, "add finished");
    }

    if let Err(err) = client.throw_error().await {
        warn!(error = %err, "throwError rejected as expected");
    }

    let doubled = client.slow_double(4).await?;
    info!(doubled, "slowDouble finished");

    // Sent immediately; terminate waits for it to settle.
    let slow = bridge.call("slowDouble", vec![Value::from(21)]);
    let drained = bridge.terminate();
    info!(state = ?bridge.state(), "shutdown requested");
    info!(result = ?slow.await, "slowDouble finished during drain");
    drained.await;
    info!(state = ?bridge.state(), "bridge terminated");
    Ok(())
}
