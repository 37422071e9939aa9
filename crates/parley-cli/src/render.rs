//! Plain-text view of [`AppState`].

use std::fmt::Write as _;

use parley_app::{AppState, AuthState, ChatPhase};
use parley_core::Loadable;

/// Render the state as display lines.
pub fn render(state: &AppState) -> Vec<String> {
    let mut lines = Vec::new();

    if state.auth == AuthState::SignedOut {
        lines.push("signed out".to_string());
        return lines;
    }

    match &state.profile.account {
        Loadable::Loaded(account) | Loadable::Refreshing(account) => {
            let mut line = format!("account {} ({})", account.username, account.id);
            if let Some(info) = state.profile.subscribers.value() {
                let _ = write!(line, ", {} subscribers", info.subscriber_count);
            }
            if let Some(posts) = state.profile.posts.value() {
                let _ = write!(line, ", {} posts", posts.len());
            }
            lines.push(line);
        },
        Loadable::Failed(e) => lines.push(format!("account: {e}")),
        Loadable::Absent | Loadable::Loading => {},
    }

    let chat = &state.chat;
    match chat.phase() {
        ChatPhase::NoAccount => lines.push("chat: no account".to_string()),
        ChatPhase::Discovering => lines.push("chat: loading sessions".to_string()),
        ChatPhase::Error(e) => lines.push(format!("chat: {e}")),
        ChatPhase::SessionListEmpty => lines.push("chat: no sessions".to_string()),
        ChatPhase::SessionListLoaded | ChatPhase::ChatOpen => {
            let me = chat.account.unwrap_or_default();
            for session in chat.sessions.value().into_iter().flatten() {
                let marker = if chat.room.as_ref().is_some_and(|r| r.session.id == session.id) {
                    '*'
                } else {
                    ' '
                };
                let status = if session.available { "" } else { " (pending)" };
                lines.push(format!(
                    "{marker} [{}] {} ({}){status}",
                    session.id,
                    session.username,
                    session.counterpart(me)
                ));
            }
        },
    }
    if chat.account.is_some() && chat.sessions.is_loaded() && chat.is_chat_session_not_available() {
        lines.push("new chats unavailable".to_string());
    }

    if let Some(discovery) = &chat.discovery {
        match &discovery.accounts {
            Loadable::Failed(e) => lines.push(format!("discover: {e}")),
            Loadable::Absent | Loadable::Loading => lines.push("discover: loading".to_string()),
            Loadable::Loaded(_) | Loadable::Refreshing(_) => {
                for account in discovery.visible() {
                    lines.push(format!("discover: {} ({})", account.username, account.id));
                }
            },
        }
        if let Some(e) = &discovery.emit_error {
            lines.push(format!("discover: request failed: {e}"));
        }
    }

    if let Some(room) = &chat.room {
        lines.push(format!("-- {} --", room.session.username));
        if let Some(e) = room.history.error() {
            lines.push(format!("history: {e}"));
        }
        for message in &room.messages {
            let who = if message.to_user_id == room.me { "them" } else { "me" };
            let pending = if message.is_provisional() { " ..." } else { "" };
            lines.push(format!(
                "{} {who}: {}{pending}",
                message.timestamp.format("%H:%M:%S"),
                message.message
            ));
        }
        if let Some(e) = &room.send_error {
            lines.push(format!("send failed: {e}"));
        }
    }

    lines
}
