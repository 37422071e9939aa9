//! Line commands.
//!
//! Each stdin line is one command. Anything that does not start with `/` is
//! sent as a message to the open room.

use parley_app::{
    AppAction, ChatAction,
    chat::{discovery::DiscoveryAction, room::RoomAction},
};
use parley_client::{AccountId, SessionId};

use crate::CliError;

/// Usage text printed by `/help`.
pub const HELP: &str = "\
/start              load the profile and session list
/logout             clear credentials and state
/sessions           refresh the session list
/retry              retry a failed session list fetch
/discover           open discovery
/search <text>      filter discovery candidates
/chat <account id>  request a session with an account
/close              close discovery
/open <session id>  open a session
/dismiss            close the open session
/status             print the current state
/quit               exit
<text>              send a message to the open session";

/// Parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Begin the signed-in period.
    Start,
    /// Sign out.
    Logout,
    /// Fetch the session list.
    Sessions,
    /// Retry the session list fetch.
    Retry,
    /// Open discovery.
    Discover,
    /// Filter discovery candidates.
    Search(String),
    /// Request a chat session.
    Chat(AccountId),
    /// Close discovery.
    Close,
    /// Open a listed session.
    Open(SessionId),
    /// Close the open session.
    Dismiss,
    /// Send text to the open session.
    Say(String),
    /// Print the state.
    Status,
    /// Print usage.
    Help,
    /// Exit.
    Quit,
}

impl Command {
    /// Parse one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>, CliError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Some(Self::Say(line.to_string())));
        };

        let (name, argument) = match rest.split_once(char::is_whitespace) {
            Some((name, argument)) => (name, argument.trim()),
            None => (rest, ""),
        };

        let command = match name {
            "start" => Self::Start,
            "logout" => Self::Logout,
            "sessions" => Self::Sessions,
            "retry" => Self::Retry,
            "discover" => Self::Discover,
            "search" => Self::Search(argument.to_string()),
            "chat" => Self::Chat(id("chat", argument)?),
            "close" => Self::Close,
            "open" => Self::Open(id("open", argument)?),
            "dismiss" => Self::Dismiss,
            "status" => Self::Status,
            "help" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => return Err(CliError::UnknownCommand(other.to_string())),
        };
        Ok(Some(command))
    }

    /// Actions to dispatch. Local commands dispatch nothing.
    pub fn into_actions(self) -> Vec<AppAction> {
        let chat = |action| vec![AppAction::Chat(action)];
        match self {
            Self::Start => vec![AppAction::Start],
            Self::Logout => vec![AppAction::Logout],
            Self::Sessions => chat(ChatAction::Activate),
            Self::Retry => chat(ChatAction::Retry),
            Self::Discover => chat(ChatAction::OpenDiscovery),
            Self::Search(query) => chat(ChatAction::Discovery(DiscoveryAction::Search(query))),
            Self::Chat(target) => chat(ChatAction::Discovery(DiscoveryAction::Select(target))),
            Self::Close => chat(ChatAction::CloseDiscovery),
            Self::Open(session) => chat(ChatAction::SelectSession(session)),
            Self::Dismiss => chat(ChatAction::DismissRoom),
            Self::Say(text) => vec![
                AppAction::Chat(ChatAction::Room(RoomAction::UpdateDraft(text))),
                AppAction::Chat(ChatAction::Room(RoomAction::Send)),
            ],
            Self::Status | Self::Help | Self::Quit => Vec::new(),
        }
    }
}

fn id(command: &'static str, argument: &str) -> Result<i64, CliError> {
    argument.parse().map_err(|_| CliError::InvalidArgument { command, expected: "a numeric id" })
}
