//! # Task registry - serialized table of keyed operations.
//!
//! The registry maps `(OwnerId, KeyId)` slots to [`OperationHandle`]s. The table is owned
//! by a single actor task; every public method sends a command over an unbounded channel
//! and (optionally) awaits the reply. Commands are processed one at a time, which gives
//! the single-context guarantees the dispatcher relies on without any lock around the
//! table.
//!
//! ## Architecture
//! ```text
//! Dispatcher / LifecycleGuard / user code
//!         │ Command (mpsc, FIFO)
//!         ▼
//!   Table::run() ── one command at a time ──► HashMap<(OwnerId, KeyId), OperationHandle>
//!         │
//!         ├─► Admit            → supersede / collision policy → Admitted | Rejected
//!         ├─► Insert/Supersede → overwrite slot (supersede cancels the occupant first)
//!         ├─► Remove*          → idempotent removal, compare-and-remove by OperationId
//!         ├─► CancelLifecycle  → entries_for(owner, LIFECYCLE) → cancel_and_remove each
//!         └─► Shutdown         → cancel every entry, publish RegistryShutdown, stop
//! ```
//!
//! ## Rules
//! - Check-then-insert for `IN_FLIGHT` is a **single command**: a cancel always precedes
//!   the next insert, two operations are never both current in one slot.
//! - Removing or cancelling an empty slot is a no-op.
//! - When the last handle is dropped the actor stops and cancels what is left.

use std::collections::HashMap;
use std::ops::ControlFlow;

use tokio::sync::{broadcast, mpsc, oneshot};

use crate::cancel::{CancelPolicy, KeyId, OwnerId};
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};

use super::builder::RegistryBuilder;
use super::collision::CollisionPolicy;
use super::config::Config;
use super::entry::{Entries, Entry, OperationHandle, OperationId};

type Slot = (OwnerId, KeyId);

/// Result of admitting a keyed operation into its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Admission {
    Admitted,
    Rejected,
}

enum Command {
    Admit {
        slot: Slot,
        handle: OperationHandle,
        reply: oneshot::Sender<Admission>,
    },
    Insert {
        slot: Slot,
        handle: OperationHandle,
        reply: oneshot::Sender<Option<OperationHandle>>,
    },
    Supersede {
        slot: Slot,
        handle: OperationHandle,
        reply: oneshot::Sender<Option<OperationHandle>>,
    },
    Remove {
        slot: Slot,
        reply: oneshot::Sender<Option<OperationHandle>>,
    },
    RemoveIfCurrent {
        slot: Slot,
        op: OperationId,
        reply: Option<oneshot::Sender<bool>>,
    },
    CancelAndRemove {
        slot: Slot,
        reply: oneshot::Sender<bool>,
    },
    EntriesFor {
        owner: OwnerId,
        filter: CancelPolicy,
        reply: oneshot::Sender<Entries>,
    },
    CancelLifecycle {
        owner: OwnerId,
        reply: Option<oneshot::Sender<usize>>,
    },
    Snapshot {
        reply: oneshot::Sender<Entries>,
    },
    Shutdown {
        reply: oneshot::Sender<usize>,
    },
}

/// Actor-owned table of running keyed operations.
struct Table {
    slots: HashMap<Slot, OperationHandle>,
    bus: Bus,
    collision: CollisionPolicy,
}

impl Table {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        while let Some(cmd) = rx.recv().await {
            if self.handle(cmd).is_break() {
                rx.close();
                return;
            }
        }
        self.cancel_all();
    }

    fn handle(&mut self, cmd: Command) -> ControlFlow<()> {
        match cmd {
            Command::Admit {
                slot,
                handle,
                reply,
            } => {
                let _ = reply.send(self.admit(slot, handle));
            }
            Command::Insert {
                slot,
                handle,
                reply,
            } => {
                let _ = reply.send(self.insert(slot, handle));
            }
            Command::Supersede {
                slot,
                handle,
                reply,
            } => {
                let _ = reply.send(self.supersede(slot, handle));
            }
            Command::Remove { slot, reply } => {
                let _ = reply.send(self.slots.remove(&slot));
            }
            Command::RemoveIfCurrent { slot, op, reply } => {
                let removed = self.remove_if_current(&slot, op);
                if let Some(reply) = reply {
                    let _ = reply.send(removed);
                }
            }
            Command::CancelAndRemove { slot, reply } => {
                let _ = reply.send(self.cancel_and_remove(&slot).is_some());
            }
            Command::EntriesFor {
                owner,
                filter,
                reply,
            } => {
                let _ = reply.send(self.entries_for(owner, filter));
            }
            Command::CancelLifecycle { owner, reply } => {
                let cancelled = self.cancel_lifecycle(owner);
                if let Some(reply) = reply {
                    let _ = reply.send(cancelled);
                }
            }
            Command::Snapshot { reply } => {
                let all = self
                    .slots
                    .iter()
                    .map(|((o, k), h)| Entry::new(*o, k.clone(), h.clone()))
                    .collect();
                let _ = reply.send(Entries::new(all));
            }
            Command::Shutdown { reply } => {
                let _ = reply.send(self.cancel_all());
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    /// Stores `handle` unconditionally; the previous occupant is returned, not cancelled.
    fn insert(&mut self, slot: Slot, handle: OperationHandle) -> Option<OperationHandle> {
        self.slots.insert(slot, handle)
    }

    /// Cancels the occupant (if any) and stores `handle` in its place.
    ///
    /// An occupant that was already cancelled is replaced silently.
    fn supersede(&mut self, slot: Slot, handle: OperationHandle) -> Option<OperationHandle> {
        let (owner, key) = (slot.0, slot.1.clone());
        let prev = self.slots.insert(slot, handle);
        if let Some(prev) = prev.as_ref().filter(|h| !h.is_cancelled()) {
            prev.cancel();
            self.bus.publish(Event::operation(
                EventKind::OperationSuperseded,
                owner,
                &key,
                prev.op(),
            ));
        }
        prev
    }

    /// Check-then-insert used by keyed dispatch.
    fn admit(&mut self, slot: Slot, handle: OperationHandle) -> Admission {
        let occupied = self.slots.get(&slot).is_some_and(|h| !h.is_cancelled());
        if !occupied || handle.policy().is_in_flight() {
            self.supersede(slot, handle);
            return Admission::Admitted;
        }

        match self.collision {
            CollisionPolicy::Replace => {
                self.supersede(slot, handle);
                Admission::Admitted
            }
            CollisionPolicy::DropIfRunning => {
                self.bus.publish(Event::operation(
                    EventKind::OperationRejected,
                    slot.0,
                    &slot.1,
                    handle.op(),
                ));
                Admission::Rejected
            }
            CollisionPolicy::Evict => {
                let (owner, key) = (slot.0, slot.1.clone());
                if let Some(prev) = self.insert(slot, handle) {
                    self.bus.publish(Event::operation(
                        EventKind::OperationEvicted,
                        owner,
                        &key,
                        prev.op(),
                    ));
                }
                Admission::Admitted
            }
        }
    }

    /// Removes the slot only while it still holds operation `op`.
    fn remove_if_current(&mut self, slot: &Slot, op: OperationId) -> bool {
        match self.slots.get(slot) {
            Some(h) if h.op() == op => {
                self.slots.remove(slot);
                true
            }
            _ => false,
        }
    }

    fn cancel_and_remove(&mut self, slot: &Slot) -> Option<OperationHandle> {
        let handle = self.slots.remove(slot)?;
        handle.cancel();
        Some(handle)
    }

    /// Entries of `owner` whose policy intersects `filter`.
    fn entries_for(&self, owner: OwnerId, filter: CancelPolicy) -> Entries {
        let items = self
            .slots
            .iter()
            .filter(|((o, _), h)| *o == owner && h.policy().intersects(filter))
            .map(|((o, key), h)| Entry::new(*o, key.clone(), h.clone()))
            .collect();
        Entries::new(items)
    }

    /// Cancels and removes every lifecycle-tagged entry of `owner`.
    fn cancel_lifecycle(&mut self, owner: OwnerId) -> usize {
        let mut cancelled = 0;
        for entry in self.entries_for(owner, CancelPolicy::LIFECYCLE) {
            let slot = (owner, entry.key().clone());
            if let Some(handle) = self.cancel_and_remove(&slot) {
                cancelled += 1;
                self.bus.publish(Event::operation(
                    EventKind::LifecycleCancelled,
                    owner,
                    entry.key(),
                    handle.op(),
                ));
            }
        }
        cancelled
    }

    fn cancel_all(&mut self) -> usize {
        let cancelled = self.slots.len();
        for (_, handle) in self.slots.drain() {
            handle.cancel();
        }
        self.bus.publish(
            Event::new(EventKind::RegistryShutdown).with_reason(format!("cancelled={cancelled}")),
        );
        cancelled
    }
}

/// Shared handle to the task registry actor.
///
/// Cheap to clone; every [`Dispatcher`](crate::Dispatcher) built against the same
/// registry shares one table.
#[derive(Clone, Debug)]
pub struct TaskRegistry {
    tx: mpsc::UnboundedSender<Command>,
    bus: Bus,
    collision: CollisionPolicy,
}

impl TaskRegistry {
    /// Starts a registry with the given config and no subscribers.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(cfg: Config) -> Self {
        RegistryBuilder::new(cfg).build()
    }

    /// Returns a builder for a registry with subscribers attached.
    pub fn builder(cfg: Config) -> RegistryBuilder {
        RegistryBuilder::new(cfg)
    }

    /// Spawns the actor on the current runtime.
    pub(crate) fn spawn(cfg: &Config, bus: Bus) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let table = Table {
            slots: HashMap::new(),
            bus: bus.clone(),
            collision: cfg.collision,
        };
        tokio::spawn(table.run(rx));
        Self {
            tx,
            bus,
            collision: cfg.collision,
        }
    }

    /// Event bus shared by the registry and its operations.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// New receiver of runtime events published after this call.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Collision policy applied to keyed dispatches without `IN_FLIGHT`.
    pub fn collision(&self) -> CollisionPolicy {
        self.collision
    }

    /// Returns `true` once the actor has stopped accepting commands.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Stores `handle` in `(owner, key)`, replacing any occupant **without** cancelling it.
    ///
    /// Returns the previous occupant so the caller can decide what to do with it.
    pub async fn insert(
        &self,
        owner: OwnerId,
        key: &KeyId,
        handle: OperationHandle,
    ) -> Result<Option<OperationHandle>, RuntimeError> {
        self.call(|reply| Command::Insert {
            slot: (owner, key.clone()),
            handle,
            reply,
        })
        .await
    }

    /// Cancels the occupant of `(owner, key)` (if any) and stores `handle`, atomically.
    pub async fn supersede(
        &self,
        owner: OwnerId,
        key: &KeyId,
        handle: OperationHandle,
    ) -> Result<Option<OperationHandle>, RuntimeError> {
        self.call(|reply| Command::Supersede {
            slot: (owner, key.clone()),
            handle,
            reply,
        })
        .await
    }

    /// Deletes the entry at `(owner, key)` if present. Idempotent.
    pub async fn remove(&self, owner: OwnerId, key: &KeyId) -> Result<(), RuntimeError> {
        self.call(|reply| Command::Remove {
            slot: (owner, key.clone()),
            reply,
        })
        .await
        .map(|_| ())
    }

    /// Deletes the entry at `(owner, key)` only if it still refers to `op`.
    ///
    /// Returns `false` when the slot is empty or holds a newer operation.
    pub async fn remove_if_current(
        &self,
        owner: OwnerId,
        key: &KeyId,
        op: OperationId,
    ) -> Result<bool, RuntimeError> {
        self.call(|reply| Command::RemoveIfCurrent {
            slot: (owner, key.clone()),
            op,
            reply: Some(reply),
        })
        .await
    }

    /// Cancels the occupant of `(owner, key)` and removes it.
    ///
    /// Returns `false` when the slot was empty.
    pub async fn cancel_and_remove(
        &self,
        owner: OwnerId,
        key: &KeyId,
    ) -> Result<bool, RuntimeError> {
        self.call(|reply| Command::CancelAndRemove {
            slot: (owner, key.clone()),
            reply,
        })
        .await
    }

    /// Snapshot of `owner`'s entries whose policy intersects `filter`.
    pub async fn entries_for(
        &self,
        owner: OwnerId,
        filter: CancelPolicy,
    ) -> Result<Entries, RuntimeError> {
        self.call(|reply| Command::EntriesFor {
            owner,
            filter,
            reply,
        })
        .await
    }

    /// Cancels and removes every lifecycle-tagged entry of `owner` in one step.
    ///
    /// Returns how many entries were cancelled.
    pub async fn cancel_lifecycle(&self, owner: OwnerId) -> Result<usize, RuntimeError> {
        self.call(|reply| Command::CancelLifecycle {
            owner,
            reply: Some(reply),
        })
        .await
    }

    /// Enqueues lifecycle cancellation for `owner` without waiting for it.
    pub fn request_cancel_lifecycle(&self, owner: OwnerId) -> Result<(), RuntimeError> {
        self.notify(Command::CancelLifecycle { owner, reply: None })
    }

    /// Snapshot of every entry in the registry.
    pub async fn snapshot(&self) -> Result<Entries, RuntimeError> {
        self.call(|reply| Command::Snapshot { reply }).await
    }

    /// Number of entries in the registry.
    pub async fn len(&self) -> Result<usize, RuntimeError> {
        self.snapshot().await.map(|e| e.len())
    }

    /// Returns `true` if no operation is registered.
    pub async fn is_empty(&self) -> Result<bool, RuntimeError> {
        self.snapshot().await.map(|e| e.is_empty())
    }

    /// Sorted, de-duplicated list of owners with at least one entry.
    pub async fn owners(&self) -> Result<Vec<OwnerId>, RuntimeError> {
        let mut owners: Vec<OwnerId> = self.snapshot().await?.iter().map(Entry::owner).collect();
        owners.sort_unstable();
        owners.dedup();
        Ok(owners)
    }

    /// Stops the actor and cancels every remaining entry.
    ///
    /// Returns how many entries were cancelled. Later calls fail with
    /// [`RuntimeError::RegistryClosed`].
    pub async fn shutdown(&self) -> Result<usize, RuntimeError> {
        self.call(|reply| Command::Shutdown { reply }).await
    }

    /// Enqueues admission of a keyed operation; the receiver resolves once the actor decided.
    pub(crate) fn request_admit(
        &self,
        owner: OwnerId,
        key: KeyId,
        handle: OperationHandle,
    ) -> Result<oneshot::Receiver<Admission>, RuntimeError> {
        self.request(|reply| Command::Admit {
            slot: (owner, key),
            handle,
            reply,
        })
    }

    /// Compare-and-remove without waiting for the result.
    pub(crate) fn release(&self, owner: OwnerId, key: KeyId, op: OperationId) {
        let _ = self.notify(Command::RemoveIfCurrent {
            slot: (owner, key),
            op,
            reply: None,
        });
    }

    // ---------------------------
    // Helpers
    // ---------------------------

    fn notify(&self, cmd: Command) -> Result<(), RuntimeError> {
        self.tx.send(cmd).map_err(|_| RuntimeError::RegistryClosed)
    }

    fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<oneshot::Receiver<T>, RuntimeError> {
        let (reply, rx) = oneshot::channel();
        self.notify(make(reply))?;
        Ok(rx)
    }

    async fn call<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, RuntimeError> {
        self.request(make)?
            .await
            .map_err(|_| RuntimeError::RegistryClosed)
    }
}
