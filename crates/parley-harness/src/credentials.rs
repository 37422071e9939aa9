//! Credential double.

use std::sync::{
    Mutex, PoisonError,
    atomic::{AtomicUsize, Ordering},
};

use parley_client::CredentialStore;

/// [`CredentialStore`] that counts how often it was cleared.
#[derive(Debug)]
pub struct RecordingCredentials {
    token: Mutex<Option<String>>,
    clears: AtomicUsize,
}

impl Default for RecordingCredentials {
    fn default() -> Self {
        Self::signed_in("test-token")
    }
}

impl RecordingCredentials {
    /// Store holding `token`.
    pub fn signed_in(token: impl Into<String>) -> Self {
        Self { token: Mutex::new(Some(token.into())), clears: AtomicUsize::new(0) }
    }

    /// Number of `clear` calls so far.
    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

impl CredentialStore for RecordingCredentials {
    fn token(&self) -> Option<String> {
        self.token.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn clear(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
        self.token.lock().unwrap_or_else(PoisonError::into_inner).take();
    }
}
