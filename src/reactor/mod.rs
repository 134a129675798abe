//! # Reactors and their execution context.
//!
//! - [`Reactor`] async action handler bound to one state type
//! - [`SyncReactor`] optional synchronous mutations
//! - [`Context`] state access and cancellation for a running body

mod context;
#[allow(clippy::module_inception)]
mod reactor;

pub use context::Context;
pub use reactor::{Reactor, SyncReactor};
