//! Chat session orchestrator.
//!
//! Owns the session list for the signed-in account and two optional
//! sub-flows: [`discovery`] (start a new chat) and [`room`] (an open
//! session). Sub-flow effects are scoped under `discovery` and `room` so
//! closing a sub-flow cancels exactly its own work.
//!
//! # Phases
//!
//! ```text
//! NoAccount ─► Discovering ─► SessionListEmpty | SessionListLoaded ─► ChatOpen
//!                   └──────────────► Error (any failed fetch)
//! ```
//!
//! The phase is derived from state by [`ChatState::phase`], never stored.

pub mod discovery;
pub mod room;

use std::time::Duration;

use parley_client::{AccountId, ChatSession, SessionId};
use parley_core::{
    Effect, Environment, Loadable, Reducer, ServiceError,
    reducer::{dismiss, scope_optional},
};

use self::{
    discovery::{DiscoveryAction, DiscoveryReducer, DiscoveryState},
    room::{RoomAction, RoomReducer, RoomState},
};
use crate::Dependencies;

/// Chat feature configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatConfig {
    /// Debounce window for session list fetches and session creation
    /// confirmation.
    pub debounce: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self { debounce: Duration::from_secs(1) }
    }
}

/// Derived chat phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatPhase {
    /// No owning account is known.
    NoAccount,
    /// Session list not loaded yet.
    Discovering,
    /// Session list loaded and empty.
    SessionListEmpty,
    /// Session list loaded with entries.
    SessionListLoaded,
    /// A room is open.
    ChatOpen,
    /// Activation or session list fetch failed.
    Error(ServiceError),
}

/// Chat state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatState {
    /// Owning account.
    pub account: Option<AccountId>,
    /// Sessions of the owning account.
    pub sessions: Loadable<Vec<ChatSession>>,
    /// Open discovery sheet.
    pub discovery: Option<DiscoveryState>,
    /// Open room.
    pub room: Option<RoomState>,
    /// Failure of the last activation before any fetch started.
    pub activation_error: Option<ServiceError>,
}

impl ChatState {
    /// Current phase.
    pub fn phase(&self) -> ChatPhase {
        if let Some(e) = &self.activation_error {
            return ChatPhase::Error(e.clone());
        }
        if self.account.is_none() {
            return ChatPhase::NoAccount;
        }
        if self.room.is_some() {
            return ChatPhase::ChatOpen;
        }
        match &self.sessions {
            Loadable::Failed(e) => ChatPhase::Error(e.clone()),
            Loadable::Loaded(list) | Loadable::Refreshing(list) if list.is_empty() => {
                ChatPhase::SessionListEmpty
            },
            Loadable::Loaded(_) | Loadable::Refreshing(_) => ChatPhase::SessionListLoaded,
            Loadable::Absent | Loadable::Loading => ChatPhase::Discovering,
        }
    }

    /// Starting a new chat is blocked. See [`is_chat_session_not_available`].
    pub fn is_chat_session_not_available(&self) -> bool {
        match (self.account, self.sessions.value()) {
            (Some(me), Some(sessions)) => is_chat_session_not_available(me, sessions),
            _ => true,
        }
    }
}

/// Starting a new chat is blocked unless `me` already initiated one of the
/// listed sessions or at least one listed session is available.
pub fn is_chat_session_not_available(me: AccountId, sessions: &[ChatSession]) -> bool {
    !sessions.iter().any(|s| s.initiated_by(me) || s.available)
}

/// Chat actions.
#[derive(Debug)]
pub enum ChatAction {
    /// Set or clear the owning account.
    SetAccount(Option<AccountId>),
    /// Enter the chat feature: fetch the session list (debounced).
    Activate,
    /// Re-issue the session list fetch after a failure.
    Retry,
    /// Session list fetch is about to start.
    SessionsLoading,
    /// Session list fetch finished.
    SessionsLoaded(Result<Vec<ChatSession>, ServiceError>),
    /// Open the discovery sheet.
    OpenDiscovery,
    /// Close the discovery sheet.
    CloseDiscovery,
    /// Discovery sub-flow action.
    Discovery(DiscoveryAction),
    /// Open a listed session.
    SelectSession(SessionId),
    /// Close the open room.
    DismissRoom,
    /// Room sub-flow action.
    Room(RoomAction),
}

impl ChatAction {
    /// Error carried by a completion action, including nested ones.
    pub fn service_error(&self) -> Option<&ServiceError> {
        match self {
            Self::SessionsLoaded(Err(e)) => Some(e),
            Self::Discovery(action) => action.service_error(),
            Self::Room(action) => action.service_error(),
            _ => None,
        }
    }
}

/// Chat reducer.
pub struct ChatReducer<E: Environment> {
    deps: Dependencies<E>,
    config: ChatConfig,
    discovery: DiscoveryReducer<E>,
    room: RoomReducer<E>,
}

impl<E: Environment> ChatReducer<E> {
    /// Create the reducer.
    pub fn new(deps: Dependencies<E>, config: ChatConfig) -> Self {
        Self {
            discovery: DiscoveryReducer::new(deps.clone(), config.debounce),
            room: RoomReducer::new(deps.clone()),
            deps,
            config,
        }
    }

    /// Eager loading marker followed by a keyed session list fetch.
    fn fetch_sessions(&self, account: AccountId, debounce: Option<Duration>) -> Effect<ChatAction> {
        let api = self.deps.chat.clone();
        let fetch = Effect::task(
            async move { api.fetch_sessions(account).await },
            ChatAction::SessionsLoaded,
        )
        .keyed("sessions");
        let fetch = match debounce {
            Some(window) => fetch.debounced(window),
            None => fetch,
        };

        Effect::merge([Effect::send(ChatAction::SessionsLoading), fetch])
    }

    fn activate(&self, state: &mut ChatState) -> Effect<ChatAction> {
        let Some(account) = state.account else {
            tracing::warn!("chat activated without an account");
            state.activation_error = Some(ServiceError::NotFound);
            return Effect::None;
        };
        state.activation_error = None;
        self.fetch_sessions(account, Some(self.config.debounce))
    }

    fn route_discovery(
        &self,
        state: &mut ChatState,
        action: DiscoveryAction,
    ) -> Effect<ChatAction> {
        let slot = &mut state.discovery;
        scope_optional(&self.discovery, slot, action, "discovery", ChatAction::Discovery)
    }

    fn route_room(&self, state: &mut ChatState, action: RoomAction) -> Effect<ChatAction> {
        scope_optional(&self.room, &mut state.room, action, "room", ChatAction::Room)
    }

    fn select_session(&self, state: &mut ChatState, id: SessionId) -> Effect<ChatAction> {
        let Some(me) = state.account else {
            return Effect::None;
        };
        let listed = state.sessions.value().and_then(|list| list.iter().find(|s| s.id == id));
        let Some(session) = listed else {
            tracing::warn!(session = id, "selected session is not listed");
            return Effect::None;
        };

        let session = session.clone();
        tracing::debug!(session = id, counterpart = session.counterpart(me), "opening room");

        // Cancel the previous room before the new one registers its effects.
        let closed = dismiss(&mut state.room, "room");
        state.room = Some(RoomState::new(me, session));
        Effect::merge([closed, self.route_room(state, RoomAction::Open)])
    }
}

impl<E: Environment> Reducer for ChatReducer<E> {
    type State = ChatState;
    type Action = ChatAction;

    fn reduce(&self, state: &mut ChatState, action: ChatAction) -> Effect<ChatAction> {
        match action {
            ChatAction::SetAccount(account) => {
                if state.account == account {
                    return Effect::None;
                }
                let mut previous =
                    std::mem::replace(state, ChatState { account, ..ChatState::default() });
                Effect::merge([
                    Effect::cancel("sessions"),
                    dismiss(&mut previous.discovery, "discovery"),
                    dismiss(&mut previous.room, "room"),
                ])
            },
            ChatAction::Activate | ChatAction::Retry => self.activate(state),
            ChatAction::SessionsLoading => {
                state.sessions.begin_fetch();
                Effect::None
            },
            ChatAction::SessionsLoaded(result) => {
                match &result {
                    Ok(list) => tracing::debug!(sessions = list.len(), "session list loaded"),
                    Err(e) => tracing::warn!(error = %e, "session list fetch failed"),
                }
                state.sessions.resolve(result);
                Effect::None
            },
            ChatAction::OpenDiscovery => {
                let Some(account) = state.account else {
                    return Effect::None;
                };
                if state.discovery.is_some() {
                    return Effect::None;
                }
                state.discovery = Some(DiscoveryState::new(account));
                self.route_discovery(state, DiscoveryAction::Load)
            },
            ChatAction::CloseDiscovery => dismiss(&mut state.discovery, "discovery"),
            ChatAction::Discovery(DiscoveryAction::Confirmed) => {
                if state.discovery.is_none() {
                    return Effect::None;
                }
                tracing::debug!("chat session requested, refreshing list");
                let closed = dismiss(&mut state.discovery, "discovery");
                let refresh = match state.account {
                    Some(account) => self.fetch_sessions(account, None),
                    None => Effect::None,
                };
                Effect::merge([closed, refresh])
            },
            ChatAction::Discovery(action) => self.route_discovery(state, action),
            ChatAction::SelectSession(id) => self.select_session(state, id),
            ChatAction::DismissRoom => dismiss(&mut state.room, "room"),
            ChatAction::Room(action) => self.route_room(state, action),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(from: AccountId, to: AccountId, available: bool) -> ChatSession {
        ChatSession {
            id: from * 100 + to,
            from_user_id: from,
            to_user_id: to,
            username: String::new(),
            picture: None,
            available,
        }
    }

    #[test]
    fn own_initiated_session_makes_chat_available() {
        assert!(!is_chat_session_not_available(5, &[session(5, 9, false)]));
    }

    #[test]
    fn foreign_unavailable_sessions_block_new_chats() {
        assert!(is_chat_session_not_available(5, &[session(9, 5, false)]));
        assert!(!is_chat_session_not_available(5, &[session(9, 5, false), session(7, 5, true)]));
        assert!(is_chat_session_not_available(5, &[]));
    }

    #[test]
    fn unloaded_list_is_not_available() {
        let mut state = ChatState { account: Some(5), ..ChatState::default() };
        assert!(state.is_chat_session_not_available());

        state.sessions = Loadable::synthesized(vec![session(5, 9, false)]);
        assert!(!state.is_chat_session_not_available());
    }

    #[test]
    fn phase_follows_state() {
        let mut state = ChatState::default();
        assert_eq!(state.phase(), ChatPhase::NoAccount);

        state.account = Some(5);
        assert_eq!(state.phase(), ChatPhase::Discovering);

        state.sessions = Loadable::synthesized(Vec::new());
        assert_eq!(state.phase(), ChatPhase::SessionListEmpty);

        state.sessions = Loadable::synthesized(vec![session(5, 9, false)]);
        assert_eq!(state.phase(), ChatPhase::SessionListLoaded);

        state.room = Some(RoomState::new(5, session(5, 9, false)));
        assert_eq!(state.phase(), ChatPhase::ChatOpen);

        state.activation_error = Some(ServiceError::NotFound);
        assert_eq!(state.phase(), ChatPhase::Error(ServiceError::NotFound));
    }
}
