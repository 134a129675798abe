//! # Cancellation key.
//!
//! A [`CancelKey`] pairs a caller-chosen identity ([`KeyId`]) with a [`CancelPolicy`].
//! The identity names a logical operation ("search", "refresh", a row index); the
//! policy tells the dispatcher what to do with it.
//!
//! ## Example
//! ```rust
//! use taskreactor::{CancelKey, CancelPolicy, KeyId};
//!
//! let search = CancelKey::in_flight("search");
//! assert_eq!(search.id(), &KeyId::from("search"));
//! assert!(search.policy().is_in_flight());
//!
//! let a = CancelKey::unique(CancelPolicy::LIFECYCLE);
//! let b = CancelKey::unique(CancelPolicy::LIFECYCLE);
//! assert_ne!(a.id(), b.id());
//! ```

use std::borrow::Cow;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use super::policy::CancelPolicy;

/// Global counter for generated key identities.
static UNIQUE_SEQ: AtomicU64 = AtomicU64::new(1);

/// Hashable identity of a keyed operation.
///
/// Only the identity takes part in registry lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyId {
    /// Human-readable name (e.g. `"search"`).
    Name(Cow<'static, str>),
    /// Caller-supplied numeric identity (e.g. a row index).
    Index(u64),
    /// Generated identity, never equal to any other key.
    Unique(u64),
}

impl KeyId {
    /// Generates a fresh identity that no other key shares.
    pub fn unique() -> Self {
        KeyId::Unique(UNIQUE_SEQ.fetch_add(1, AtomicOrdering::Relaxed))
    }

    /// Returns `true` for generated identities.
    #[inline]
    pub fn is_unique(&self) -> bool {
        matches!(self, KeyId::Unique(_))
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyId::Name(name) => f.write_str(name),
            KeyId::Index(n) => write!(f, "#{n}"),
            KeyId::Unique(n) => write!(f, "unique-{n}"),
        }
    }
}

impl From<&'static str> for KeyId {
    fn from(name: &'static str) -> Self {
        KeyId::Name(Cow::Borrowed(name))
    }
}

impl From<String> for KeyId {
    fn from(name: String) -> Self {
        KeyId::Name(Cow::Owned(name))
    }
}

impl From<u64> for KeyId {
    fn from(n: u64) -> Self {
        KeyId::Index(n)
    }
}

/// Identity plus policy supplied when dispatching a keyed action.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CancelKey {
    id: KeyId,
    policy: CancelPolicy,
}

impl CancelKey {
    /// Creates a key with an explicit policy.
    pub fn new(id: impl Into<KeyId>, policy: CancelPolicy) -> Self {
        Self {
            id: id.into(),
            policy,
        }
    }

    /// Key whose new dispatches cancel the running one.
    pub fn in_flight(id: impl Into<KeyId>) -> Self {
        Self::new(id, CancelPolicy::IN_FLIGHT)
    }

    /// Key cancelled when the owner is detached.
    pub fn lifecycle(id: impl Into<KeyId>) -> Self {
        Self::new(id, CancelPolicy::LIFECYCLE)
    }

    /// Key with a freshly generated identity.
    pub fn unique(policy: CancelPolicy) -> Self {
        Self::new(KeyId::unique(), policy)
    }

    /// Returns the identity used for registry lookup.
    #[inline]
    pub fn id(&self) -> &KeyId {
        &self.id
    }

    /// Returns the policy applied at dispatch time.
    #[inline]
    pub fn policy(&self) -> CancelPolicy {
        self.policy
    }

    /// Returns a copy of this key with another policy.
    pub fn with_policy(mut self, policy: CancelPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl fmt::Display for CancelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.id, self.policy.as_label())
    }
}
