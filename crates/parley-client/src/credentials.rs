//! Credential collaborator.

use std::sync::{Mutex, PoisonError};

/// Holder of the bearer token used by the REST client and socket.
///
/// Persistence is out of scope; implementations only need to forget the
/// token on [`CredentialStore::clear`].
pub trait CredentialStore: Send + Sync {
    /// Current token, if signed in.
    fn token(&self) -> Option<String>;

    /// Discard stored credentials.
    fn clear(&self);
}

/// Process-local credential store.
#[derive(Debug, Default)]
pub struct MemoryCredentials {
    token: Mutex<Option<String>>,
}

impl MemoryCredentials {
    /// Store holding `token`.
    pub fn new(token: Option<String>) -> Self {
        Self { token: Mutex::new(token) }
    }
}

impl CredentialStore for MemoryCredentials {
    fn token(&self) -> Option<String> {
        self.token.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn clear(&self) {
        let previous = self.token.lock().unwrap_or_else(PoisonError::into_inner).take();
        if previous.is_some() {
            tracing::info!("credentials cleared");
        }
    }
}
