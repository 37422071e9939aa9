//! Root feature.
//!
//! Composes [`profile`](crate::profile) and [`chat`](crate::chat) and owns the
//! signed-in lifecycle. Two cross-cutting rules live here:
//!
//! - When the account loads, its id becomes the chat's owning account and the
//!   chat feature is activated.
//! - Any action carrying [`ServiceError::Unauthorized`] tears down stored
//!   credentials. Teardown happens once per signed-in period; later
//!   `Unauthorized` results are ignored.

use parley_core::{Effect, Environment, Reducer, ServiceError, reducer::scope};

use crate::{
    Dependencies,
    chat::{ChatAction, ChatConfig, ChatReducer, ChatState},
    profile::{ProfileAction, ProfileReducer, ProfileState},
};

/// Sign-in lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthState {
    /// Credentials are assumed valid.
    #[default]
    SignedIn,
    /// Credentials were cleared.
    SignedOut,
}

/// Root state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppState {
    /// Sign-in lifecycle.
    pub auth: AuthState,
    /// Account profile.
    pub profile: ProfileState,
    /// Chat sessions.
    pub chat: ChatState,
    /// Number of credential teardowns performed.
    pub teardowns: u32,
}

/// Root actions.
#[derive(Debug)]
pub enum AppAction {
    /// Begin a signed-in period and load the profile.
    Start,
    /// Sign out explicitly.
    Logout,
    /// Profile feature action.
    Profile(ProfileAction),
    /// Chat feature action.
    Chat(ChatAction),
}

impl AppAction {
    /// Error carried by a completion action anywhere in the tree.
    pub fn service_error(&self) -> Option<&ServiceError> {
        match self {
            Self::Profile(action) => action.service_error(),
            Self::Chat(action) => action.service_error(),
            Self::Start | Self::Logout => None,
        }
    }
}

/// Root reducer.
pub struct AppReducer<E: Environment> {
    deps: Dependencies<E>,
    profile: ProfileReducer<E>,
    chat: ChatReducer<E>,
}

impl<E: Environment> AppReducer<E> {
    /// Create the reducer tree.
    pub fn new(deps: Dependencies<E>, chat: ChatConfig) -> Self {
        Self {
            profile: ProfileReducer::new(deps.clone()),
            chat: ChatReducer::new(deps.clone(), chat),
            deps,
        }
    }

    fn teardown(&self, state: &mut AppState) -> Effect<AppAction> {
        if state.auth == AuthState::SignedOut {
            return Effect::None;
        }

        tracing::info!("credentials rejected or signed out, tearing down");
        state.auth = AuthState::SignedOut;
        state.teardowns += 1;

        let credentials = self.deps.credentials.clone();
        Effect::fire_and_forget(async move { credentials.clear() })
    }

    fn profile(&self, state: &mut AppState, action: ProfileAction) -> Effect<AppAction> {
        let loaded = match &action {
            ProfileAction::AccountLoaded(Ok(account)) => Some(account.id),
            _ => None,
        };

        let effect =
            scope(&self.profile, &mut state.profile, action, "profile", AppAction::Profile);
        let Some(account) = loaded else {
            return effect;
        };

        Effect::merge([
            effect,
            self.chat(state, ChatAction::SetAccount(Some(account))),
            self.chat(state, ChatAction::Activate),
        ])
    }

    fn chat(&self, state: &mut AppState, action: ChatAction) -> Effect<AppAction> {
        scope(&self.chat, &mut state.chat, action, "chat", AppAction::Chat)
    }
}

impl<E: Environment> Reducer for AppReducer<E> {
    type State = AppState;
    type Action = AppAction;

    fn reduce(&self, state: &mut AppState, action: AppAction) -> Effect<AppAction> {
        let unauthorized = action.service_error().is_some_and(ServiceError::is_unauthorized);

        let effect = match action {
            AppAction::Start => {
                state.auth = AuthState::SignedIn;
                self.profile(state, ProfileAction::Load)
            },
            AppAction::Logout => {
                let teardown = self.teardown(state);
                let cleared = self.chat(state, ChatAction::SetAccount(None));
                state.profile = ProfileState::default();
                return Effect::merge([teardown, cleared, Effect::cancel("profile")]);
            },
            AppAction::Profile(action) => self.profile(state, action),
            AppAction::Chat(action) => self.chat(state, action),
        };

        if unauthorized { effect.and(self.teardown(state)) } else { effect }
    }
}
