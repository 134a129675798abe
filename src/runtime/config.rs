//! # Registry configuration.
//!
//! Provides [`Config`], the settings used by
//! [`TaskRegistry::builder`](crate::TaskRegistry::builder).
//!
//! ## Sentinel values
//! - `bus_capacity = 0` → clamped to 1

use super::collision::CollisionPolicy;

/// Configuration for a task registry and the dispatchers built on it.
///
/// ## Field semantics
/// - `bus_capacity`: Event bus ring buffer size (min 1; clamped)
/// - `collision`: What a keyed dispatch without `IN_FLIGHT` does with an occupied slot
#[derive(Clone, Debug)]
pub struct Config {
    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Receivers that lag behind more than `bus_capacity` events observe `Lagged`
    /// and skip older items.
    pub bus_capacity: usize,

    /// Collision handling for keyed dispatches without `IN_FLIGHT`.
    pub collision: CollisionPolicy,
}

impl Config {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `bus_capacity = 1024`
    /// - `collision = CollisionPolicy::Replace`
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            collision: CollisionPolicy::default(),
        }
    }
}
