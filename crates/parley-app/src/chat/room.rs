//! Open chat room.
//!
//! A room exists only while a session is open. Opening it fetches the
//! message history and subscribes to the counterpart on the socket adapter;
//! both effects are scoped to the room and cancelled when it is dismissed.
//!
//! The timeline is kept sorted by timestamp. Sent messages are appended
//! optimistically with a provisional id of 0 and are never reconciled with
//! the server's copy.

use parley_client::{AccountId, ChatMessage, ChatSession};
use parley_core::{Effect, Environment, Loadable, Reducer, ServiceError};

use crate::Dependencies;

/// State of the open room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomState {
    /// Owning account.
    pub me: AccountId,
    /// Session being displayed.
    pub session: ChatSession,
    /// History fetch status; holds the number of messages it returned.
    pub history: Loadable<usize>,
    /// Timeline, ascending by timestamp.
    pub messages: Vec<ChatMessage>,
    /// Unsent input.
    pub draft: String,
    /// Last transmit failure. The optimistic message stays in the timeline.
    pub send_error: Option<ServiceError>,
    /// Socket subscription failure.
    pub subscription_error: Option<ServiceError>,
}

impl RoomState {
    /// Room for `session` as seen by `me`.
    pub fn new(me: AccountId, session: ChatSession) -> Self {
        Self {
            me,
            session,
            history: Loadable::Absent,
            messages: Vec::new(),
            draft: String::new(),
            send_error: None,
            subscription_error: None,
        }
    }

    /// The other participant.
    pub fn counterpart(&self) -> AccountId {
        self.session.counterpart(self.me)
    }

    /// Insert keeping timestamp order; equal timestamps keep arrival order.
    fn insert(&mut self, message: ChatMessage) {
        if !message.is_provisional() && self.messages.iter().any(|m| m.id == message.id) {
            tracing::trace!(id = message.id, "duplicate message ignored");
            return;
        }
        let at = self.messages.partition_point(|m| m.timestamp <= message.timestamp);
        self.messages.insert(at, message);
    }

    /// Replace the timeline with `history`, keeping anything that arrived while
    /// it loaded.
    fn merge_history(&mut self, history: Vec<ChatMessage>) {
        let local = std::mem::replace(&mut self.messages, history);
        self.messages.sort_by_key(|m| m.timestamp);
        for message in local {
            self.insert(message);
        }
    }
}

/// Room actions.
#[derive(Debug)]
pub enum RoomAction {
    /// Fetch history and start listening.
    Open,
    /// History fetch finished.
    HistoryLoaded(Result<Vec<ChatMessage>, ServiceError>),
    /// Edit the draft.
    UpdateDraft(String),
    /// Send the draft.
    Send,
    /// Transmit finished.
    Sent(Result<(), ServiceError>),
    /// Message received from the counterpart.
    Inbound(ChatMessage),
    /// The socket subscription could not be established.
    SubscriptionFailed(ServiceError),
}

impl RoomAction {
    /// Error carried by a completion action.
    pub fn service_error(&self) -> Option<&ServiceError> {
        match self {
            Self::HistoryLoaded(Err(e)) | Self::Sent(Err(e)) | Self::SubscriptionFailed(e) => {
                Some(e)
            },
            _ => None,
        }
    }
}

/// Room reducer.
pub struct RoomReducer<E: Environment> {
    deps: Dependencies<E>,
}

impl<E: Environment> RoomReducer<E> {
    /// Create the reducer.
    pub fn new(deps: Dependencies<E>) -> Self {
        Self { deps }
    }

    fn open(&self, state: &mut RoomState) -> Effect<RoomAction> {
        state.history.begin_fetch();

        let api = self.deps.chat.clone();
        let session = state.session.id;
        let history = Effect::task(
            async move { api.fetch_messages(session).await },
            RoomAction::HistoryLoaded,
        )
        .keyed("history");

        let socket = self.deps.socket.clone();
        let counterpart = state.counterpart();
        let inbound = Effect::stream(move |dispatch| async move {
            match socket.subscribe(counterpart).await {
                Ok(mut subscription) => {
                    while let Some(message) = subscription.recv().await {
                        dispatch.send(RoomAction::Inbound(message));
                    }
                },
                Err(e) => dispatch.send(RoomAction::SubscriptionFailed(e.into())),
            }
        })
        .keyed("inbound");

        Effect::merge([history, inbound])
    }
}

impl<E: Environment> Reducer for RoomReducer<E> {
    type State = RoomState;
    type Action = RoomAction;

    fn reduce(&self, state: &mut RoomState, action: RoomAction) -> Effect<RoomAction> {
        match action {
            RoomAction::Open => self.open(state),
            RoomAction::HistoryLoaded(result) => {
                match result {
                    Ok(history) => {
                        state.history.resolve(Ok(history.len()));
                        state.merge_history(history);
                    },
                    Err(e) => {
                        tracing::warn!(
                            session = state.session.id,
                            error = %e,
                            "history fetch failed"
                        );
                        state.history.resolve(Err(e));
                    },
                }
                Effect::None
            },
            RoomAction::UpdateDraft(draft) => {
                state.draft = draft;
                Effect::None
            },
            RoomAction::Send => {
                if state.draft.trim().is_empty() {
                    return Effect::None;
                }

                let text = std::mem::take(&mut state.draft);
                let message = ChatMessage::provisional(
                    state.session.id,
                    state.counterpart(),
                    text,
                    self.deps.env.now(),
                );
                state.insert(message.clone());
                state.send_error = None;

                let socket = self.deps.socket.clone();
                let transmit =
                    async move { socket.send_message(message).await.map_err(ServiceError::from) };
                Effect::task(transmit, RoomAction::Sent)
            },
            RoomAction::Sent(Ok(())) => Effect::None,
            RoomAction::Sent(Err(e)) => {
                tracing::warn!(session = state.session.id, error = %e, "message transmit failed");
                state.send_error = Some(e);
                Effect::None
            },
            RoomAction::Inbound(message) => {
                if message.session_id == state.session.id {
                    state.insert(message);
                } else {
                    tracing::debug!(
                        session = message.session_id,
                        open = state.session.id,
                        "inbound message for another session dropped"
                    );
                }
                Effect::None
            },
            RoomAction::SubscriptionFailed(e) => {
                tracing::warn!(counterpart = state.counterpart(), error = %e, "subscribe failed");
                state.subscription_error = Some(e);
                Effect::None
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};

    use super::*;

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + seconds, 0).single().expect("timestamp")
    }

    fn message(id: i64, seconds: i64, body: &str) -> ChatMessage {
        ChatMessage {
            id,
            session_id: 3,
            to_user_id: 5,
            message: body.into(),
            timestamp: at(seconds),
        }
    }

    fn room() -> RoomState {
        RoomState::new(5, ChatSession {
            id: 3,
            from_user_id: 5,
            to_user_id: 9,
            username: "nine".into(),
            picture: None,
            available: true,
        })
    }

    #[test]
    fn insert_keeps_timestamp_order() {
        let mut room = room();
        room.insert(message(2, 20, "second"));
        room.insert(message(1, 10, "first"));
        room.insert(message(3, 20, "tie goes last"));

        let bodies: Vec<_> = room.messages.iter().map(|m| m.message.as_str()).collect();
        assert_eq!(bodies, vec!["first", "second", "tie goes last"]);
    }

    #[test]
    fn confirmed_duplicates_are_ignored() {
        let mut room = room();
        room.insert(message(7, 10, "once"));
        room.insert(message(7, 10, "once"));
        room.insert(message(0, 10, "draft"));
        room.insert(message(0, 10, "draft"));

        assert_eq!(room.messages.len(), 3);
    }

    #[test]
    fn history_merge_keeps_local_messages() {
        let mut room = room();
        room.insert(message(0, 50, "optimistic"));
        room.insert(message(8, 40, "inbound"));

        room.merge_history(vec![message(8, 40, "inbound"), message(1, 5, "old")]);

        let bodies: Vec<_> = room.messages.iter().map(|m| m.message.as_str()).collect();
        assert_eq!(bodies, vec!["old", "inbound", "optimistic"]);
    }
}
