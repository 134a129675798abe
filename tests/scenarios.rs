//! End-to-end dispatch scenarios on a paused tokio clock.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use taskreactor::{
    CancelKey, CancelPolicy, CollisionPolicy, Config, Context, Dispatcher, Event, EventKind,
    Outcome, Reactor, Subscribe, TaskRegistry,
};
use tokio::time::sleep;

#[derive(Clone, Debug, Default)]
struct Probe {
    finished: Vec<&'static str>,
    cancelled: Vec<&'static str>,
}

enum Step {
    /// Sleeps cooperatively; stops early on cancellation.
    Work(&'static str, Duration),
    /// Sleeps without looking at its token.
    Stubborn(&'static str, Duration),
}

struct ProbeReactor;

#[async_trait]
impl Reactor for ProbeReactor {
    type State = Probe;
    type Action = Step;

    async fn action(&self, step: Step, cx: Context<Probe>) {
        match step {
            Step::Work(name, dur) => {
                if cx.sleep(dur).await {
                    cx.update(|s| s.finished.push(name));
                } else {
                    cx.update(|s| s.cancelled.push(name));
                }
            }
            Step::Stubborn(name, dur) => {
                sleep(dur).await;
                cx.update(|s| s.finished.push(name));
            }
        }
    }
}

fn setup(collision: CollisionPolicy) -> (TaskRegistry, Dispatcher<ProbeReactor>) {
    let registry = TaskRegistry::new(Config {
        collision,
        ..Config::default()
    });
    let dispatcher = Dispatcher::new(ProbeReactor, Probe::default(), &registry);
    (registry, dispatcher)
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[tokio::test(start_paused = true)]
async fn search_newer_dispatch_cancels_older() -> anyhow::Result<()> {
    let (registry, d) = setup(CollisionPolicy::Replace);
    let key = CancelKey::in_flight("search");

    let a = d.send_keyed(Step::Work("A", ms(100)), &key)?;
    sleep(ms(10)).await;
    let b = d.send_keyed(Step::Work("B", ms(100)), &key)?;

    assert_eq!(a.await?, Outcome::Cancelled);
    let running = registry
        .entries_for(d.owner(), CancelPolicy::IN_FLIGHT)
        .await?;
    assert_eq!(running.len(), 1);
    assert!(running.contains_key(key.id()));

    assert_eq!(b.await?, Outcome::Completed);
    assert!(registry.is_empty().await?);

    let state = d.state();
    assert_eq!(state.cancelled, vec!["A"]);
    assert_eq!(state.finished, vec!["B"]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn in_flight_key_has_at_most_one_live_entry() -> anyhow::Result<()> {
    let (registry, d) = setup(CollisionPolicy::Replace);
    let key = CancelKey::in_flight("typing");
    let names = ["t", "to", "tok", "toki", "tokio"];

    let mut handles = Vec::new();
    for name in names {
        handles.push(d.send_keyed(Step::Work(name, ms(200)), &key)?);
        let live = registry
        .entries_for(d.owner(), CancelPolicy::IN_FLIGHT)
        .await?;
        assert_eq!(live.len(), 1);
        assert!(live.iter().all(|e| !e.handle().is_cancelled()));
        sleep(ms(5)).await;
    }

    let mut outcomes = Vec::new();
    for h in handles {
        outcomes.push(h.await?);
    }
    assert_eq!(
        outcomes,
        vec![
            Outcome::Cancelled,
            Outcome::Cancelled,
            Outcome::Cancelled,
            Outcome::Cancelled,
            Outcome::Completed,
        ]
    );
    assert_eq!(d.state().finished, vec!["tokio"]);
    assert!(registry.is_empty().await?);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn lifecycle_operation_stops_on_teardown() -> anyhow::Result<()> {
    let (registry, d) = setup(CollisionPolicy::Replace);
    let guard = d.lifecycle_guard();

    let key = d.run_for_lifetime(|cx| async move {
        cx.cancelled().await;
        cx.update(|s| s.cancelled.push("feed"));
    })?;

    sleep(ms(50)).await;
    let before = registry
        .entries_for(d.owner(), CancelPolicy::LIFECYCLE)
        .await?;
    assert!(before.contains_key(key.id()));

    drop(guard);
    assert!(
        registry
            .entries_for(d.owner(), CancelPolicy::LIFECYCLE)
            .await?
            .is_empty()
    );

    sleep(ms(1)).await;
    assert_eq!(d.state().cancelled, vec!["feed"]);
    assert!(registry.is_empty().await?);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn detach_is_idempotent_and_reports_count() -> anyhow::Result<()> {
    let (registry, d) = setup(CollisionPolicy::Replace);
    let a = d.send_keyed(Step::Work("a", ms(500)), &CancelKey::lifecycle("a"))?;
    let b = d.send_keyed(Step::Work("b", ms(500)), &CancelKey::lifecycle(7u64))?;
    let plain = d.send_keyed(Step::Work("plain", ms(500)), &CancelKey::in_flight("plain"))?;

    assert_eq!(d.detach().await?, 2);
    assert_eq!(d.detach().await?, 0);

    assert_eq!(a.await?, Outcome::Cancelled);
    assert_eq!(b.await?, Outcome::Cancelled);
    assert_eq!(plain.await?, Outcome::Completed);
    assert!(registry.is_empty().await?);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn mixed_policy_keys_share_one_slot() -> anyhow::Result<()> {
    let (registry, d) = setup(CollisionPolicy::Replace);
    let lifecycle = CancelKey::lifecycle("k");
    let in_flight = CancelKey::in_flight("k");

    // Policy is not part of the slot: the second dispatch supersedes the first.
    let a = d.send_keyed(Step::Work("a", ms(100)), &lifecycle)?;
    let b = d.send_keyed(Step::Work("b", ms(100)), &in_flight)?;

    // The slot now holds an IN_FLIGHT-only entry, out of teardown's reach.
    assert_eq!(d.detach().await?, 0);

    assert_eq!(a.await?, Outcome::Cancelled);
    assert_eq!(b.await?, Outcome::Completed);
    assert_eq!(d.state().cancelled, vec!["a"]);
    assert_eq!(d.state().finished, vec!["b"]);
    assert!(registry.is_empty().await?);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn unkeyed_send_survives_teardown() -> anyhow::Result<()> {
    let (registry, d) = setup(CollisionPolicy::Replace);

    let c = d.send(Step::Work("C", ms(100)));
    assert!(registry.is_empty().await?);

    assert_eq!(d.detach().await?, 0);
    c.await?;

    assert_eq!(d.state().finished, vec!["C"]);
    assert!(registry.is_empty().await?);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn superseded_completion_keeps_successor_entry() -> anyhow::Result<()> {
    let (registry, d) = setup(CollisionPolicy::Replace);
    let key = CancelKey::in_flight("load");

    let a = d.send_keyed(Step::Stubborn("A", ms(50)), &key)?;
    sleep(ms(10)).await;
    let b = d.send_keyed(Step::Work("B", ms(200)), &key)?;

    // A ignores its token and finishes late; its release must not touch B.
    assert_eq!(a.await?, Outcome::Cancelled);
    sleep(ms(1)).await;
    let live = registry
        .entries_for(d.owner(), CancelPolicy::IN_FLIGHT)
        .await?;
    assert_eq!(live.len(), 1);
    assert!(live.iter().all(|e| !e.handle().is_cancelled()));

    assert_eq!(b.await?, Outcome::Completed);
    assert!(registry.is_empty().await?);
    assert_eq!(d.state().finished, vec!["A", "B"]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn teardown_is_scoped_to_one_owner() -> anyhow::Result<()> {
    let registry = TaskRegistry::new(Config::default());
    let x = Dispatcher::new(ProbeReactor, Probe::default(), &registry);
    let y = Dispatcher::new(ProbeReactor, Probe::default(), &registry);
    assert_ne!(x.owner(), y.owner());

    let sub = CancelKey::lifecycle("sub");
    let search = CancelKey::in_flight("search");
    let x_sub = x.send_keyed(Step::Work("x-sub", ms(1000)), &sub)?;
    let y_sub = y.send_keyed(Step::Work("y-sub", ms(1000)), &sub)?;
    let y_search = y.send_keyed(Step::Work("y-search", ms(1000)), &search)?;
    // Same key id under another owner does not supersede.
    let x_search = x.send_keyed(Step::Work("x-search", ms(1000)), &search)?;

    assert_eq!(x.detach().await?, 1);
    assert_eq!(x_sub.await?, Outcome::Cancelled);

    let y_left = registry.entries_for(y.owner(), CancelPolicy::all()).await?;
    assert_eq!(y_left.len(), 2);
    let x_left = registry.entries_for(x.owner(), CancelPolicy::all()).await?;
    assert_eq!(x_left.len(), 1);
    assert_eq!(registry.owners().await?, vec![x.owner(), y.owner()]);

    assert_eq!(y.detach().await?, 1);
    assert_eq!(y_sub.await?, Outcome::Cancelled);
    assert_eq!(y_search.await?, Outcome::Completed);
    assert_eq!(x_search.await?, Outcome::Completed);

    assert_eq!(x.state().finished, vec!["x-search"]);
    assert_eq!(y.state().finished, vec!["y-search"]);
    assert!(registry.is_empty().await?);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn evict_leaves_occupant_running_untracked() -> anyhow::Result<()> {
    let (registry, d) = setup(CollisionPolicy::Evict);
    let mut events = registry.events();
    let key = CancelKey::lifecycle("poll");

    let a = d.send_keyed(Step::Work("A", ms(100)), &key)?;
    let b = d.send_keyed(Step::Work("B", ms(300)), &key)?;

    // Only B is tracked, so detach cannot reach A.
    sleep(ms(10)).await;
    assert_eq!(d.detach().await?, 1);

    assert_eq!(a.await?, Outcome::Completed);
    assert_eq!(b.await?, Outcome::Cancelled);
    assert!(registry.is_empty().await?);

    let kinds: Vec<EventKind> = std::iter::from_fn(|| events.try_recv().ok())
        .map(|e| e.kind)
        .collect();
    assert!(kinds.contains(&EventKind::OperationEvicted));
    assert!(kinds.contains(&EventKind::LifecycleCancelled));
    Ok(())
}

struct Recorder {
    kinds: Arc<Mutex<Vec<EventKind>>>,
}

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, event: &Event) {
        self.kinds.lock().unwrap().push(event.kind);
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

#[tokio::test(start_paused = true)]
async fn subscribers_observe_registry_events() -> anyhow::Result<()> {
    let kinds = Arc::new(Mutex::new(Vec::new()));
    let registry = TaskRegistry::builder(Config::default())
        .with_subscriber(Arc::new(Recorder {
            kinds: Arc::clone(&kinds),
        }))
        .build();
    let d = Dispatcher::new(ProbeReactor, Probe::default(), &registry);
    let key = CancelKey::in_flight("search");

    let a = d.send_keyed(Step::Work("A", ms(100)), &key)?;
    sleep(ms(10)).await;
    let b = d.run_keyed(Step::Work("B", ms(100)), &key).await?;
    assert_eq!(a.await?, Outcome::Cancelled);
    assert_eq!(b, Outcome::Completed);

    assert_eq!(registry.shutdown().await?, 0);
    sleep(ms(10)).await;

    let seen = kinds.lock().unwrap().clone();
    for expected in [
        EventKind::OperationStarted,
        EventKind::OperationSuperseded,
        EventKind::OperationCancelled,
        EventKind::OperationCompleted,
        EventKind::RegistryShutdown,
    ] {
        assert!(seen.contains(&expected), "missing {expected:?} in {seen:?}");
    }
    assert_eq!(seen.last(), Some(&EventKind::RegistryShutdown));
    Ok(())
}
