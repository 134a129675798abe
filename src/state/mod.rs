//! # Reactor state.
//!
//! - [`Store`] observable state cell owned by a dispatcher
//! - [`Loadable`] / [`LoadPhase`] helpers for values fetched by action bodies

mod loadable;
mod store;

pub use loadable::{LoadPhase, Loadable};
pub use store::Store;
