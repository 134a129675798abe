//! # Async load state.
//!
//! [`Loadable`] models a value fetched by an action body: not requested yet, in flight,
//! failed or available. Bodies keep failures here instead of returning them.
//!
//! Equality compares the **phase only** ([`LoadPhase`]), so a state diff reports
//! `Loading → Loaded` transitions without requiring `T: PartialEq`.
//!
//! ## Example
//! ```rust
//! use taskreactor::{LoadPhase, Loadable};
//!
//! let mut repos: Loadable<Vec<String>> = Loadable::default();
//! assert_eq!(repos.phase(), LoadPhase::None);
//!
//! repos = Loadable::Loading;
//! assert!(repos.is_loading());
//!
//! repos = Loadable::Loaded(vec!["tokio".into()]);
//! assert_eq!(repos.item().map(Vec::len), Some(1));
//! assert_eq!(repos, Loadable::Loaded(Vec::new()));
//! ```

/// Value loaded asynchronously by an action body.
#[derive(Clone, Debug)]
pub enum Loadable<T, E = String> {
    /// Nothing requested yet.
    None,
    /// Request in flight.
    Loading,
    /// Request failed.
    Failed(E),
    /// Value available.
    Loaded(T),
}

/// Variant of a [`Loadable`] without its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoadPhase {
    /// See [`Loadable::None`].
    None,
    /// See [`Loadable::Loading`].
    Loading,
    /// See [`Loadable::Failed`].
    Failed,
    /// See [`Loadable::Loaded`].
    Loaded,
}

impl<T, E> Loadable<T, E> {
    /// Current phase.
    pub fn phase(&self) -> LoadPhase {
        match self {
            Loadable::None => LoadPhase::None,
            Loadable::Loading => LoadPhase::Loading,
            Loadable::Failed(_) => LoadPhase::Failed,
            Loadable::Loaded(_) => LoadPhase::Loaded,
        }
    }

    /// Returns `true` while the request is in flight.
    #[inline]
    pub fn is_loading(&self) -> bool {
        matches!(self, Loadable::Loading)
    }

    /// Loaded value, if any.
    pub fn item(&self) -> Option<&T> {
        match self {
            Loadable::Loaded(item) => Some(item),
            _ => None,
        }
    }

    /// Failure, if any.
    pub fn error(&self) -> Option<&E> {
        match self {
            Loadable::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Maps the loaded value, keeping every other phase.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Loadable<U, E> {
        match self {
            Loadable::None => Loadable::None,
            Loadable::Loading => Loadable::Loading,
            Loadable::Failed(err) => Loadable::Failed(err),
            Loadable::Loaded(item) => Loadable::Loaded(f(item)),
        }
    }
}

// `#[derive(Default)]` would require `T: Default` and `E: Default`.
#[allow(clippy::derivable_impls)]
impl<T, E> Default for Loadable<T, E> {
    fn default() -> Self {
        Loadable::None
    }
}

impl<T, E> From<Result<T, E>> for Loadable<T, E> {
    fn from(res: Result<T, E>) -> Self {
        match res {
            Ok(item) => Loadable::Loaded(item),
            Err(err) => Loadable::Failed(err),
        }
    }
}

impl<T, E> PartialEq for Loadable<T, E> {
    fn eq(&self, other: &Self) -> bool {
        self.phase() == other.phase()
    }
}

impl<T, E> Eq for Loadable<T, E> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_ignores_payload() {
        let a: Loadable<u32> = Loadable::Loaded(1);
        let b: Loadable<u32> = Loadable::Loaded(2);
        assert_eq!(a, b);
        assert_ne!(a, Loadable::Loading);
        assert_eq!(
            Loadable::<u32>::Failed("x".into()),
            Loadable::Failed("y".into())
        );
    }

    /// Payload types without a `Default` impl.
    struct Opaque;

    #[test]
    fn test_default_without_payload_default() {
        let state: Loadable<Opaque, Opaque> = Loadable::default();
        assert_eq!(state.phase(), LoadPhase::None);
        assert!(state.item().is_none());
    }

    #[test]
    fn test_from_result_and_map() {
        let ok: Loadable<u32, &str> = Ok(3).into();
        assert_eq!(ok.clone().map(|n| n * 2).item(), Some(&6));

        let err: Loadable<u32, &str> = Err("offline").into();
        assert_eq!(err.error(), Some(&"offline"));
        assert_eq!(err.item(), None);
        assert_eq!(err.phase(), LoadPhase::Failed);
    }
}
