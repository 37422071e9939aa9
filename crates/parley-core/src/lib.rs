//! Parley core
//!
//! Unidirectional state/effect engine. Features are pure reducers that mutate
//! their state and return an [`Effect`] describing asynchronous work; the
//! [`Store`] executes those effects on a scheduler and feeds their results
//! back in as new actions.
//!
//! # Components
//!
//! - [`Loadable`]: lifecycle of an asynchronously fetched value
//! - [`ServiceError`]: error taxonomy shared by every effect boundary
//! - [`Effect`]: declarative description of asynchronous work
//! - [`EffectKey`]: hierarchical key for debounce, dedup and cancellation
//! - [`Reducer`]: pure `(state, action) -> effect` function
//! - [`Store`]: single-task dispatch loop that owns state and the scheduler
//! - [`Environment`]: clock and timer abstraction for deterministic tests
//!
//! # Composition
//!
//! Parent features embed children with [`reducer::scope`] (always-present
//! child) and [`reducer::scope_optional`] (sub-flow that may be closed).
//! Closing a sub-flow with [`reducer::dismiss`] cancels every effect the
//! child has in flight.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod effect;
pub mod env;
mod error;
mod loadable;
pub mod reducer;
mod scheduler;
mod store;

pub use effect::{Dispatch, Effect, EffectKey};
pub use env::{Environment, SystemEnv};
pub use error::ServiceError;
pub use loadable::Loadable;
pub use reducer::Reducer;
pub use store::{Store, StoreError, StoreHandle};
