//! # Example: lifecycle_teardown
//!
//! Demonstrates lifecycle operations: a component starts a background feed at
//! construction and the feed stops when the component's guard is dropped.
//! An unkeyed action sent just before teardown still completes.
//!
//! Shows how to:
//! - Start owner-scoped work with [`Dispatcher::run_for_lifetime`]
//! - Tie teardown to a [`LifecycleGuard`]
//! - Inspect the registry with [`TaskRegistry::entries_for`]
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► Dispatcher::new + lifecycle_guard()
//!   ├─► run_for_lifetime(feed)         ─► ticks every 100ms
//!   ├─► send(Save)                     ─► unkeyed, 400ms
//!   ├─► sleep 350ms
//!   ├─► drop(guard)                    ─► CancelLifecycle(owner) ─► feed stops
//!   └─► Save completes, registry empty
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=info cargo run --example lifecycle_teardown --features logging
//! ```

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use taskreactor::{
    CancelPolicy, Config, Context, Dispatcher, LogWriter, Reactor, Subscribe, TaskRegistry,
};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug, Default)]
struct FeedState {
    ticks: u32,
    saved: bool,
}

enum FeedAction {
    Save,
}

struct FeedReactor;

#[async_trait]
impl Reactor for FeedReactor {
    type State = FeedState;
    type Action = FeedAction;

    async fn action(&self, action: FeedAction, cx: Context<FeedState>) {
        match action {
            FeedAction::Save => {
                // Unkeyed: nobody cancels this token.
                cx.sleep(Duration::from_millis(400)).await;
                cx.update(|s| s.saved = true);
                println!("[save] done");
            }
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    println!("=== lifecycle_teardown example ===\n");

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let registry = TaskRegistry::builder(Config::default())
        .with_subscribers(subs)
        .build();

    // 1. Component construction
    let feed = Dispatcher::new(FeedReactor, FeedState::default(), &registry);
    let guard = feed.lifecycle_guard();
    feed.run_for_lifetime(|cx| async move {
        while cx.sleep(Duration::from_millis(100)).await {
            cx.update(|s| s.ticks += 1);
            println!("[feed] tick");
        }
        println!("[feed] cancelled");
    })?;

    // 2. Unkeyed work survives teardown
    let save = feed.send(FeedAction::Save);

    // 3. Component teardown
    tokio::time::sleep(Duration::from_millis(350)).await;
    drop(guard);

    save.await?;
    let lifecycle = registry
        .entries_for(feed.owner(), CancelPolicy::LIFECYCLE)
        .await?;
    let state = feed.state();
    println!(
        "\nticks={} saved={} lifecycle_entries={}",
        state.ticks,
        state.saved,
        lifecycle.len()
    );

    registry.shutdown().await?;
    Ok(())
}
