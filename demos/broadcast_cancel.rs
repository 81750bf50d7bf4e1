//! # Example: broadcast_cancel
//!
//! Demonstrates broadcast delivery and the cancellation guarantee, with the
//! built-in [`LogWriter`](opvisor::LogWriter) printing engine events.
//!
//! Shows how to:
//! - deliver one result to the submitter and every other attached client
//! - cancel a launch whose body ignores its token, and see the result discarded
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example broadcast_cancel --features logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use opvisor::{Delivery, Engine, EngineConfig, LogWriter, OperationError, OperationFn, Subscribe};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct Snapshot {
    items: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .init();

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let engine = Engine::builder(EngineConfig {
        grace: Duration::from_secs(2),
        ..EngineConfig::default()
    })
    .with_subscribers(subs)
    .build();

    let editor = engine.attach("editor");
    let sidebar = engine.attach("sidebar");
    editor.on_result(|d: &Delivery<Snapshot>| {
        tracing::info!(launch = %d.id, value = ?d.value(), "editor: own result");
    });
    sidebar.on_broadcast(|d: &Delivery<Snapshot>| {
        tracing::info!(launch = %d.id, value = ?d.value(), "sidebar: broadcast result");
    });

    let refresh = |items: usize, delay: Duration| {
        OperationFn::new("refresh", move |_ctx: CancellationToken| async move {
            // Ignores the token on purpose.
            tokio::time::sleep(delay).await;
            Ok::<_, OperationError>(Snapshot { items })
        })
    };

    editor.run_operation_broadcast_with_tag(refresh(3, Duration::from_millis(100)), "refresh");
    tokio::time::sleep(Duration::from_millis(300)).await;

    let doomed = editor.run_operation_broadcast_with_tag(refresh(7, Duration::from_millis(200)), "refresh");
    tokio::time::sleep(Duration::from_millis(50)).await;
    let cancelled = editor.cancel_operation(doomed);
    tracing::info!(%doomed, cancelled, again = editor.cancel_operation(doomed), "cancel requested");

    // The body still finishes, but nobody hears about it.
    tokio::time::sleep(Duration::from_millis(400)).await;

    engine.shutdown().await?;
    Ok(())
}
