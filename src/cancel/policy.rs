//! # Cancellation policy flags.
//!
//! [`CancelPolicy`] decides how a keyed operation reacts to other events:
//! - [`CancelPolicy::LIFECYCLE`]: cancelled when the owner is detached
//! - [`CancelPolicy::IN_FLIGHT`]: cancelled when a newer operation is dispatched under the same key
//!
//! The flags combine freely; an empty policy tracks the operation without any automatic cancellation.

use bitflags::bitflags;

bitflags! {
    /// Set of cancellation triggers attached to a keyed operation.
    ///
    /// # Example
    /// ```
    /// use taskreactor::CancelPolicy;
    ///
    /// let both = CancelPolicy::LIFECYCLE | CancelPolicy::IN_FLIGHT;
    /// assert!(both.is_lifecycle());
    /// assert!(both.is_in_flight());
    /// assert!(CancelPolicy::empty().is_empty());
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CancelPolicy: u8 {
        /// Cancel when the owning dispatcher is detached.
        const LIFECYCLE = 1 << 0;
        /// Cancel the running operation when a new one is dispatched under the same key.
        const IN_FLIGHT = 1 << 1;
    }
}

impl CancelPolicy {
    /// Returns `true` if the operation is tied to its owner's lifetime.
    #[inline]
    pub fn is_lifecycle(self) -> bool {
        self.contains(Self::LIFECYCLE)
    }

    /// Returns `true` if a newer dispatch supersedes a running operation.
    #[inline]
    pub fn is_in_flight(self) -> bool {
        self.contains(Self::IN_FLIGHT)
    }

    /// Short stable label for logs.
    pub fn as_label(self) -> &'static str {
        match (self.is_lifecycle(), self.is_in_flight()) {
            (false, false) => "none",
            (true, false) => "lifecycle",
            (false, true) => "in_flight",
            (true, true) => "lifecycle+in_flight",
        }
    }
}
