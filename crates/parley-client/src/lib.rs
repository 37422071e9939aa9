//! Parley client
//!
//! External collaborators used by the parley features: wire models, the HTTP
//! API traits, credential storage and the socket adapter.
//!
//! # Components
//!
//! - [`ChatApi`] / [`AccountApi`]: HTTP collaborator traits
//! - [`CredentialStore`]: bearer token holder, cleared on `Unauthorized`
//! - [`SocketAdapter`]: actor owning the persistent socket connection
//! - [`SocketHandle`]: cloneable handle used by features to talk to it
//! - [`Transport`]: text-frame connection abstraction
//! - [`MemoryTransport`]: in-process transport for tests
//!
//! # Optional features
//!
//! - `transport`: [`ws::WsTransport`] over `tokio-tungstenite`
//! - `http`: [`rest::RestClient`] over `reqwest`

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod api;
mod credentials;
mod error;
pub mod frame;
pub mod model;
mod socket;
mod transport;

#[cfg(feature = "http")]
pub mod rest;
#[cfg(feature = "transport")]
pub mod ws;

pub use api::{AccountApi, ChatApi, status_error};
pub use credentials::{CredentialStore, MemoryCredentials};
pub use error::{SocketError, TransportError};
pub use frame::{ClientFrame, Interest, ServerFrame};
pub use model::{
    Account, AccountId, AccountSummary, ChatMessage, ChatSession, CreateSession, MessageId, Post,
    SessionId, SubscriberInfo, SubscriptionInfo,
};
pub use socket::{ConnectionState, SocketAdapter, SocketHandle, Subscription};
pub use transport::{MemoryServer, MemoryTransport, Transport};
