//! # Owner lifecycle.
//!
//! Ties an owner's detach signal to bulk cancellation of its lifecycle-tagged
//! registry entries.
//!
//! - [`cancel_all_lifecycle_operations`] awaited form, returns the number cancelled
//! - [`LifecycleGuard`] RAII form: dropping the guard delivers the detach signal once
//!
//! Both go through a single registry command, so enumeration and removal never
//! interleave with other registry operations. Entries without
//! [`CancelPolicy::LIFECYCLE`](crate::CancelPolicy::LIFECYCLE) and entries of other
//! owners are never touched.

use crate::cancel::OwnerId;
use crate::error::RuntimeError;

use super::registry::TaskRegistry;

/// Cancels and removes every lifecycle-tagged entry of `owner`.
///
/// Idempotent: a second call returns `Ok(0)`.
pub async fn cancel_all_lifecycle_operations(
    registry: &TaskRegistry,
    owner: OwnerId,
) -> Result<usize, RuntimeError> {
    registry.cancel_lifecycle(owner).await
}

/// Detaches an owner when dropped.
///
/// Obtained from [`Dispatcher::lifecycle_guard`](crate::Dispatcher::lifecycle_guard);
/// hold it for as long as the owning component is alive.
#[must_use = "dropping the guard detaches the owner immediately"]
#[derive(Debug)]
pub struct LifecycleGuard {
    registry: TaskRegistry,
    owner: OwnerId,
    armed: bool,
}

impl LifecycleGuard {
    pub(crate) fn new(registry: TaskRegistry, owner: OwnerId) -> Self {
        Self {
            registry,
            owner,
            armed: true,
        }
    }

    /// Owner this guard detaches.
    #[inline]
    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    /// Consumes the guard without sending the detach signal.
    pub fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for LifecycleGuard {
    fn drop(&mut self) {
        if self.armed {
            // Closed registry already cancelled everything.
            let _ = self.registry.request_cancel_lifecycle(self.owner);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::{CancelPolicy, KeyId};
    use crate::runtime::{Config, OperationHandle};

    #[tokio::test]
    async fn test_guard_drop_cancels_lifecycle_entries() {
        let registry = TaskRegistry::new(Config::default());
        let owner = OwnerId::next();
        let life = OperationHandle::new(CancelPolicy::LIFECYCLE);
        let plain = OperationHandle::new(CancelPolicy::IN_FLIGHT);
        let (sub, key) = (KeyId::from("sub"), KeyId::from("search"));
        registry.insert(owner, &sub, life.clone()).await.unwrap();
        registry.insert(owner, &key, plain.clone()).await.unwrap();

        drop(LifecycleGuard::new(registry.clone(), owner));

        // Queued behind the detach command.
        assert_eq!(registry.len().await.unwrap(), 1);
        assert!(life.is_cancelled());
        assert!(!plain.is_cancelled());
    }

    #[tokio::test]
    async fn test_disarmed_guard_does_nothing() {
        let registry = TaskRegistry::new(Config::default());
        let owner = OwnerId::next();
        let life = OperationHandle::new(CancelPolicy::LIFECYCLE);
        let sub = KeyId::from("sub");
        registry.insert(owner, &sub, life.clone()).await.unwrap();

        LifecycleGuard::new(registry.clone(), owner).disarm();

        assert_eq!(registry.len().await.unwrap(), 1);
        assert!(!life.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_all_is_idempotent() {
        let registry = TaskRegistry::new(Config::default());
        let owner = OwnerId::next();
        let both = OperationHandle::new(CancelPolicy::all());
        let key = KeyId::from("a");
        registry.insert(owner, &key, both).await.unwrap();

        let first = cancel_all_lifecycle_operations(&registry, owner).await;
        assert_eq!(first, Ok(1));
        let second = cancel_all_lifecycle_operations(&registry, owner).await;
        assert_eq!(second, Ok(0));
        assert!(
            registry
                .entries_for(owner, CancelPolicy::LIFECYCLE)
                .await
                .unwrap()
                .is_empty()
        );
    }
}
