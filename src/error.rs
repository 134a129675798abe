//! Error types used by the taskreactor runtime.
//!
//! Cancellation is **not** an error: a cancelled keyed operation resolves to
//! [`Outcome::Cancelled`](crate::Outcome::Cancelled). Failures inside action bodies
//! belong to the body itself. What remains are failures of the runtime plumbing,
//! collected in [`RuntimeError`].

use thiserror::Error;

/// # Errors produced by the taskreactor runtime.
///
/// Registry misuse (removing an unknown slot, cancelling an idle key) is a no-op
/// and never shows up here.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// The task registry was shut down (or its actor is gone) and cannot accept commands.
    #[error("task registry is closed")]
    RegistryClosed,
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use taskreactor::RuntimeError;
    ///
    /// assert_eq!(RuntimeError::RegistryClosed.as_label(), "registry_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::RegistryClosed => "registry_closed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::RegistryClosed => {
                "registry closed; keyed dispatch and bookkeeping are unavailable".to_string()
            }
        }
    }
}
