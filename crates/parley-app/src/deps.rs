//! Collaborators injected into every feature.

use std::sync::Arc;

use parley_client::{AccountApi, ChatApi, CredentialStore, SocketHandle};
use parley_core::Environment;

/// External collaborators shared by the feature tree.
#[derive(Clone)]
pub struct Dependencies<E: Environment> {
    /// Clock and timers.
    pub env: E,
    /// Chat endpoints.
    pub chat: Arc<dyn ChatApi>,
    /// Account endpoints.
    pub accounts: Arc<dyn AccountApi>,
    /// Shared socket adapter.
    pub socket: SocketHandle,
    /// Credential holder, cleared on `Unauthorized`.
    pub credentials: Arc<dyn CredentialStore>,
}
