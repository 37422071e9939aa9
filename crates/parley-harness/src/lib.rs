//! Deterministic test harness for parley.
//!
//! Scripted collaborators and a fixed clock that let the whole feature tree
//! run under tokio's paused time, so debounce windows and out-of-order
//! completions are reproducible.
//!
//! # Components
//!
//! - [`MockApi`]: scripted chat and account endpoints with a call log
//! - [`TestEnv`]: manually driven clock
//! - [`RecordingCredentials`]: counts credential teardowns
//! - [`AppHarness`]: a running store wired to all of the above and an
//!   in-memory socket
//!
//! # Invariant Testing
//!
//! The `invariants` module checks properties of [`parley_app::AppState`] that
//! must hold after every dispatched action. Use
//! [`InvariantRegistry::standard()`] for the common set.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod api;
mod credentials;
mod env;
mod fixture;
pub mod invariants;

pub use api::{Call, MockApi, Reply, Script};
pub use credentials::RecordingCredentials;
pub use env::TestEnv;
pub use fixture::AppHarness;
pub use invariants::{
    FanOutFollowsAccount, Invariant, InvariantRegistry, InvariantResult, RoomBelongsToAccount,
    SignedOutClearedCredentials, SubFlowsNeedAccount, TimelineOrdered, Violation,
};
