//! # Example: tagged_sync
//!
//! Demonstrates tag deduplication: a screen that asks for "sync" several times
//! while one sync is already running gets the same launch id back, and the body
//! runs once.
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► attach "screen", register on_result::<usize>
//!   ├─► run_operation_with_tag(sync, "sync") ×3  → same id
//!   ├─► is_operation_running("sync")              → true
//!   ├─► await the single delivery
//!   └─► run_operation_with_tag(sync, "sync")      → new id
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=opvisor=debug cargo run --example tagged_sync
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use opvisor::{Delivery, Engine, EngineConfig, OperationError, OperationFn};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let engine = Engine::new(EngineConfig::default());
    let screen = engine.attach("screen");

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    screen.on_result(move |d: &Delivery<usize>| {
        tracing::info!(launch = %d.id, outcome = ?d.outcome, "screen got result");
        let _ = tx.send(d.id);
    });

    let runs = Arc::new(AtomicUsize::new(0));
    let sync = || {
        let runs = Arc::clone(&runs);
        OperationFn::new("sync", move |ctx: CancellationToken| {
            let runs = Arc::clone(&runs);
            async move {
                let n = runs.fetch_add(1, Ordering::SeqCst) + 1;
                tokio::select! {
                    _ = ctx.cancelled() => Err(OperationError::Canceled),
                    _ = tokio::time::sleep(Duration::from_millis(300)) => Ok(n * 10),
                }
            }
        })
    };

    let ids: Vec<_> = (0..3)
        .map(|_| screen.run_operation_with_tag(sync(), "sync"))
        .collect();
    tracing::info!(?ids, running = engine.is_operation_running("sync"), "submitted three times");
    anyhow::ensure!(ids.iter().all(|id| *id == ids[0]), "tag must deduplicate");

    let delivered = rx.recv().await.ok_or_else(|| anyhow::anyhow!("engine closed"))?;
    tracing::info!(%delivered, running = engine.is_operation_running("sync"), bodies = runs.load(Ordering::SeqCst), "first sync done");

    let next = screen.run_operation_with_tag(sync(), "sync");
    tracing::info!(%next, "tag released; new launch admitted");
    rx.recv().await.ok_or_else(|| anyhow::anyhow!("engine closed"))?;

    engine.shutdown().await?;
    Ok(())
}
