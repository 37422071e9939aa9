//! Discovery sub-flow: pick an account to start a chat with.
//!
//! Opening discovery fetches the accounts the owner may chat with. Selecting
//! one emits `createChatSession` over the socket. The server never
//! acknowledges the emit, so once it has been written a local
//! [`DiscoveryAction::Confirmed`] is raised after the debounce window; the
//! parent reacts to it by refreshing the session list and closing discovery.

use std::time::Duration;

use parley_client::{AccountId, AccountSummary, CreateSession};
use parley_core::{Effect, Environment, Loadable, Reducer, ServiceError};

use crate::Dependencies;

/// Discovery state. Present only while the discovery sheet is open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryState {
    /// Owning account.
    pub account: AccountId,
    /// Accounts available to chat with.
    pub accounts: Loadable<Vec<AccountSummary>>,
    /// Case-insensitive username filter.
    pub query: String,
    /// Account the last request was sent for.
    pub selected: Option<AccountId>,
    /// Last emit failure, cleared on the next selection.
    pub emit_error: Option<ServiceError>,
}

impl DiscoveryState {
    /// Fresh discovery for `account`.
    pub fn new(account: AccountId) -> Self {
        Self {
            account,
            accounts: Loadable::Absent,
            query: String::new(),
            selected: None,
            emit_error: None,
        }
    }

    /// Fetched accounts matching the current filter.
    pub fn visible(&self) -> Vec<&AccountSummary> {
        let needle = self.query.trim().to_lowercase();
        self.accounts
            .value()
            .map(|accounts| {
                accounts
                    .iter()
                    .filter(|a| needle.is_empty() || a.username.to_lowercase().contains(&needle))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Discovery actions.
#[derive(Debug)]
pub enum DiscoveryAction {
    /// Fetch the available accounts.
    Load,
    /// Available accounts fetch finished.
    AccountsLoaded(Result<Vec<AccountSummary>, ServiceError>),
    /// Update the username filter.
    Search(String),
    /// Request a chat session with an account.
    Select(AccountId),
    /// Socket emit finished.
    Emitted(Result<(), ServiceError>),
    /// Debounce window after a successful emit elapsed.
    Confirmed,
}

impl DiscoveryAction {
    /// Error carried by a completion action.
    pub fn service_error(&self) -> Option<&ServiceError> {
        match self {
            Self::AccountsLoaded(Err(e)) | Self::Emitted(Err(e)) => Some(e),
            _ => None,
        }
    }
}

/// Discovery reducer.
pub struct DiscoveryReducer<E: Environment> {
    deps: Dependencies<E>,
    debounce: Duration,
}

impl<E: Environment> DiscoveryReducer<E> {
    /// Create the reducer with the confirmation debounce window.
    pub fn new(deps: Dependencies<E>, debounce: Duration) -> Self {
        Self { deps, debounce }
    }
}

impl<E: Environment> Reducer for DiscoveryReducer<E> {
    type State = DiscoveryState;
    type Action = DiscoveryAction;

    fn reduce(
        &self,
        state: &mut DiscoveryState,
        action: DiscoveryAction,
    ) -> Effect<DiscoveryAction> {
        match action {
            DiscoveryAction::Load => {
                state.accounts.begin_fetch();
                let api = self.deps.chat.clone();
                let account = state.account;
                Effect::task(
                    async move { api.fetch_available_accounts(account).await },
                    DiscoveryAction::AccountsLoaded,
                )
                .keyed("accounts")
            },
            DiscoveryAction::AccountsLoaded(result) => {
                state.accounts.resolve(result);
                Effect::None
            },
            DiscoveryAction::Search(query) => {
                state.query = query;
                Effect::None
            },
            DiscoveryAction::Select(target) => {
                state.selected = Some(target);
                state.emit_error = None;

                let socket = self.deps.socket.clone();
                let request = CreateSession { from_user_id: state.account, to_user_id: target };
                tracing::debug!(
                    from = request.from_user_id,
                    to = target,
                    "requesting chat session"
                );

                let emit = async move {
                    socket.emit_create_session(request).await.map_err(ServiceError::from)
                };
                Effect::task(emit, DiscoveryAction::Emitted).keyed("emit")
            },
            DiscoveryAction::Emitted(Ok(())) => {
                let confirm = |_: Result<(), ServiceError>| DiscoveryAction::Confirmed;
                Effect::task(async { Ok(()) }, confirm).keyed("confirm").debounced(self.debounce)
            },
            DiscoveryAction::Emitted(Err(e)) => {
                tracing::warn!(error = %e, "createChatSession emit failed");
                state.emit_error = Some(e);
                Effect::None
            },
            // Handled by the parent.
            DiscoveryAction::Confirmed => Effect::None,
        }
    }
}
