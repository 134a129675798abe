//! # Cancellation keys, policies and owner identity.
//!
//! This module provides the value types that scope keyed operations:
//! - [`CancelKey`] identity plus policy used when dispatching a keyed action
//! - [`KeyId`] the hashable identity part of a key
//! - [`CancelPolicy`] bitset of `{LIFECYCLE, IN_FLIGHT}`
//! - [`OwnerId`] per-dispatcher identity used to scope registry slots
//!
//! ## Rules
//! - Only `(OwnerId, KeyId)` addresses a registry slot; the policy is read at dispatch time.
//! - Two keys with the same id and different policies share one slot (last writer wins).

mod key;
mod owner;
mod policy;

pub use key::{CancelKey, KeyId};
pub use owner::OwnerId;
pub use policy::CancelPolicy;
