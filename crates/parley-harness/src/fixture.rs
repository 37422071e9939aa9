//! A running feature tree wired to test doubles.

use std::{sync::Arc, time::Duration};

use parley_app::{AppAction, AppReducer, AppState, ChatAction, ChatConfig, Dependencies};
use parley_client::{
    AccountApi, ChatApi, ClientFrame, CredentialStore, MemoryServer, MemoryTransport,
    SocketAdapter, SocketHandle,
};
use parley_core::{Store, StoreError, StoreHandle};
use tokio::task::JoinHandle;

use crate::{MockApi, RecordingCredentials, TestEnv};

/// Store running [`AppReducer`] against [`MockApi`], an in-memory socket,
/// [`RecordingCredentials`] and a [`TestEnv`].
///
/// Must be created inside a tokio runtime. Tests normally use
/// `#[tokio::test(start_paused = true)]` so debounce windows elapse
/// instantly once every task is idle.
pub struct AppHarness {
    /// Handle to the running store.
    pub store: StoreHandle<AppState, AppAction>,
    /// Scripted HTTP endpoints.
    pub api: Arc<MockApi>,
    /// Server end of the socket.
    pub server: MemoryServer,
    /// Socket adapter shared with the feature tree.
    pub socket: SocketHandle,
    /// Credential double.
    pub credentials: Arc<RecordingCredentials>,
    /// Clock shared with the feature tree.
    pub env: TestEnv,
    task: JoinHandle<AppState>,
}

impl AppHarness {
    /// Start with the default chat configuration.
    pub fn start(api: MockApi) -> Self {
        Self::with_config(api, ChatConfig::default())
    }

    /// Start with an explicit chat configuration.
    pub fn with_config(api: MockApi, config: ChatConfig) -> Self {
        let api = Arc::new(api);
        let credentials = Arc::new(RecordingCredentials::default());
        let env = TestEnv::new();
        let (transport, server) = MemoryTransport::pair();
        let socket = SocketAdapter::spawn(transport);

        let chat: Arc<dyn ChatApi> = api.clone();
        let accounts: Arc<dyn AccountApi> = api.clone();
        let store_credentials: Arc<dyn CredentialStore> = credentials.clone();
        let deps = Dependencies {
            env: env.clone(),
            chat,
            accounts,
            socket: socket.clone(),
            credentials: store_credentials,
        };

        let reducer = AppReducer::new(deps, config);
        let (store, task) = Store::spawn(reducer, AppState::default(), env.clone());
        Self { store, api, server, socket, credentials, env, task }
    }

    /// Dispatch a root action.
    pub fn send(&self, action: AppAction) -> Result<(), StoreError> {
        self.store.send(action)
    }

    /// Dispatch a chat action.
    pub fn chat(&self, action: ChatAction) -> Result<(), StoreError> {
        self.store.send(AppAction::Chat(action))
    }

    /// Latest published state.
    pub fn state(&self) -> AppState {
        self.store.state()
    }

    /// Wait until the published state satisfies `predicate`.
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&AppState) -> bool,
    ) -> Result<AppState, StoreError> {
        self.store.wait_for(predicate).await
    }

    /// Let every runnable task make progress, then advance time by `by`.
    ///
    /// Under paused time, timers due before `by` fire in order along the way.
    pub async fn advance(&self, by: Duration) {
        tokio::task::yield_now().await;
        tokio::time::sleep(by).await;
        tokio::task::yield_now().await;
    }

    /// Let pending work settle without crossing any but the shortest timers.
    pub async fn settle(&self) {
        self.advance(Duration::from_millis(1)).await;
    }

    /// Next frame the client wrote to the socket, decoded.
    pub async fn next_frame(&mut self) -> Option<ClientFrame> {
        let text = self.server.next_frame().await?;
        match ClientFrame::decode(&text) {
            Ok(frame) => Some(frame),
            Err(e) => {
                tracing::error!(error = %e, frame = %text, "client wrote an undecodable frame");
                None
            },
        }
    }

    /// Every frame written and not yet read, decoded.
    pub fn drain_frames(&mut self) -> Vec<ClientFrame> {
        self.server.drain().iter().filter_map(|text| ClientFrame::decode(text).ok()).collect()
    }

    /// Shut the store down and return its final state.
    pub async fn stop(self) -> AppState {
        self.store.shutdown();
        let fallback = self.store.state();
        self.task.await.unwrap_or(fallback)
    }
}
