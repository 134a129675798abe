//! # Example: search_supersede
//!
//! Demonstrates `IN_FLIGHT` keys: every keystroke dispatches a search under the
//! same key, and each new dispatch cancels the one still running.
//!
//! Shows how to:
//! - Build a registry with the [`LogWriter`] subscriber
//! - Dispatch keyed actions with [`Dispatcher::send_keyed`]
//! - Keep failures in state with [`Loadable`]
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► send_keyed(Search("t"),     search[in_flight])  ─► debounce 300ms
//!   ├─► send_keyed(Search("to"),    search[in_flight])  ─► cancels "t"
//!   ├─► send_keyed(Search("tok"),   search[in_flight])  ─► cancels "to"
//!   └─► run_keyed(Search("tokio"),  search[in_flight])  ─► cancels "tok", completes
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example search_supersede --features logging
//! ```

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use taskreactor::{
    CancelKey, Config, Context, Dispatcher, Loadable, LogWriter, Reactor, Subscribe, TaskRegistry,
};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug, Default)]
struct SearchState {
    query: String,
    results: Loadable<Vec<String>>,
}

enum SearchAction {
    Search(String),
}

struct SearchReactor {
    catalog: Vec<&'static str>,
}

impl SearchReactor {
    async fn fetch(&self, query: &str) -> Result<Vec<String>, String> {
        tokio::time::sleep(Duration::from_millis(150)).await;
        if query.is_empty() {
            return Err("empty query".to_string());
        }
        Ok(self
            .catalog
            .iter()
            .filter(|name| name.contains(query))
            .map(|name| name.to_string())
            .collect())
    }
}

#[async_trait]
impl Reactor for SearchReactor {
    type State = SearchState;
    type Action = SearchAction;

    async fn action(&self, action: SearchAction, cx: Context<SearchState>) {
        match action {
            SearchAction::Search(query) => {
                cx.update(|s| {
                    s.query = query.clone();
                    s.results = Loadable::Loading;
                });

                if !cx.sleep(Duration::from_millis(300)).await {
                    println!("[search] {query:?} superseded during debounce");
                    return;
                }
                let Some(res) = cx.guard(self.fetch(&query)).await else {
                    println!("[search] {query:?} superseded during fetch");
                    return;
                };
                cx.update(|s| s.results = res.into());
            }
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    println!("=== search_supersede example ===\n");

    // 1. Registry with a tracing subscriber
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let registry = TaskRegistry::builder(Config::default())
        .with_subscribers(subs)
        .build();

    // 2. One dispatcher per component
    let reactor = SearchReactor {
        catalog: vec!["tokio", "tokio-util", "tracing", "thiserror"],
    };
    let search = Dispatcher::new(reactor, SearchState::default(), &registry);
    let key = CancelKey::in_flight("search");

    // 3. Simulated typing: each keystroke supersedes the previous search
    for query in ["t", "to", "tok"] {
        search.send_keyed(SearchAction::Search(query.to_string()), &key)?;
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    let outcome = search
        .run_keyed(SearchAction::Search("tokio".to_string()), &key)
        .await?;

    // 4. Only the last search produced results
    let state = search.state();
    println!("\noutcome={} query={:?}", outcome.as_label(), state.query);
    println!("results={:?}", state.results.item());

    registry.shutdown().await?;
    Ok(())
}
