//! Application layer for parley
//!
//! Feature reducers driven by the [`parley_core::Store`]. Every reducer is a
//! pure state machine; I/O happens only inside the effects they return, via
//! the collaborators in [`Dependencies`].
//!
//! # Feature tree
//!
//! ```text
//! app
//! ├── profile            account + fan-out (subscribers, subscription, posts)
//! └── chat               session list
//!     ├── discovery?     start a new chat (optional sub-flow)
//!     └── room?          open session (optional sub-flow)
//! ```
//!
//! # Components
//!
//! - [`AppReducer`]: root feature, credential teardown on `Unauthorized`
//! - [`ProfileReducer`]: signed-in account and its derived fetches
//! - [`ChatReducer`]: session list, discovery and rooms

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod app;
pub mod chat;
mod deps;
pub mod profile;

pub use app::{AppAction, AppReducer, AppState, AuthState};
pub use chat::{
    ChatAction, ChatConfig, ChatPhase, ChatReducer, ChatState, is_chat_session_not_available,
};
pub use deps::Dependencies;
pub use profile::{ProfileAction, ProfileReducer, ProfileState};
