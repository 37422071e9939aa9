//! Resource state container.
//!
//! [`Loadable`] models the lifecycle of an asynchronously fetched value. Every
//! feature exposing a fetch stores its result in one of these rather than a
//! raw `Option` or `Result`.
//!
//! # Transitions
//!
//! ```text
//! Absent ──┐
//! Failed ──┼─ begin_fetch ─► Loading ──┐
//!          │                            ├─ resolve ─► Loaded | Failed
//! Loaded ──┴─ begin_fetch ─► Refreshing ┘
//! ```
//!
//! [`Loadable::resolve`] only applies while a fetch is pending, so a value can
//! never jump from `Absent` to `Loaded` without passing through `Loading`.
//! Locally synthesized defaults use [`Loadable::synthesized`] instead.

use crate::ServiceError;

/// Lifecycle of an asynchronously fetched value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Loadable<T> {
    /// Nothing requested yet.
    Absent,
    /// First fetch in flight.
    Loading,
    /// Refetch in flight; the previous value is still displayable.
    Refreshing(T),
    /// Fetch succeeded.
    Loaded(T),
    /// Fetch failed.
    Failed(ServiceError),
}

impl<T> Default for Loadable<T> {
    fn default() -> Self {
        Self::Absent
    }
}

impl<T> Loadable<T> {
    /// Locally synthesized value that never went through a fetch.
    pub fn synthesized(value: T) -> Self {
        Self::Loaded(value)
    }

    /// Mark a fetch as started.
    ///
    /// Moves to `Refreshing` when a value exists, otherwise to `Loading`. A
    /// fetch that is already pending is left untouched.
    pub fn begin_fetch(&mut self) {
        *self = match std::mem::replace(self, Self::Absent) {
            Self::Loaded(value) => Self::Refreshing(value),
            pending @ (Self::Loading | Self::Refreshing(_)) => pending,
            Self::Absent | Self::Failed(_) => Self::Loading,
        };
    }

    /// Apply the outcome of a pending fetch.
    ///
    /// Returns `false` (and leaves the state untouched) if no fetch is
    /// pending. A `NotModified` response while refreshing keeps the previous
    /// value.
    pub fn resolve(&mut self, result: Result<T, ServiceError>) -> bool {
        if !self.is_pending() {
            return false;
        }

        *self = match (std::mem::replace(self, Self::Absent), result) {
            (_, Ok(value)) => Self::Loaded(value),
            (Self::Refreshing(previous), Err(ServiceError::NotModified)) => Self::Loaded(previous),
            (_, Err(err)) => Self::Failed(err),
        };
        true
    }

    /// Drop any value or error and return to `Absent`.
    pub fn reset(&mut self) {
        *self = Self::Absent;
    }

    /// Current value, including the previous value while refreshing.
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Loaded(value) | Self::Refreshing(value) => Some(value),
            Self::Absent | Self::Loading | Self::Failed(_) => None,
        }
    }

    /// Error of the last fetch. `None` unless `Failed`.
    pub fn error(&self) -> Option<&ServiceError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// A fetch is in flight.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Loading | Self::Refreshing(_))
    }

    /// Fetch completed successfully and no refetch is in flight.
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    /// Nothing requested yet.
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Transform the contained value, keeping the lifecycle variant.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Loadable<U> {
        match self {
            Self::Absent => Loadable::Absent,
            Self::Loading => Loadable::Loading,
            Self::Refreshing(value) => Loadable::Refreshing(f(value)),
            Self::Loaded(value) => Loadable::Loaded(f(value)),
            Self::Failed(err) => Loadable::Failed(err),
        }
    }

    /// Borrowing view of the container.
    pub fn as_ref(&self) -> Loadable<&T> {
        match self {
            Self::Absent => Loadable::Absent,
            Self::Loading => Loadable::Loading,
            Self::Refreshing(value) => Loadable::Refreshing(value),
            Self::Loaded(value) => Loadable::Loaded(value),
            Self::Failed(err) => Loadable::Failed(err.clone()),
        }
    }
}
