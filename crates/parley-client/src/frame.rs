//! Socket frames.
//!
//! Every frame is a JSON text message of the form
//! `{"event": "<name>", "data": <payload>}`.

use serde::{Deserialize, Serialize};

use crate::{
    error::TransportError,
    model::{AccountId, ChatMessage, CreateSession},
};

/// Payload naming the account a listen request refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interest {
    /// Counterpart account id.
    pub user_id: AccountId,
}

/// Frame sent by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientFrame {
    /// Ask the server to create a chat session.
    CreateChatSession(CreateSession),
    /// Deliver a chat message.
    SendMessage(ChatMessage),
    /// Start receiving messages from a counterpart.
    Listen(Interest),
    /// Stop receiving messages from a counterpart.
    Unlisten(Interest),
}

/// Inbound chat message, tagged with the counterpart that sent it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    /// Sender.
    pub user_id: AccountId,
    /// Message body.
    pub message: ChatMessage,
}

/// Frame sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerFrame {
    /// A chat message arrived.
    Message(InboundMessage),
}

impl ClientFrame {
    /// Encode as a text frame.
    pub fn encode(&self) -> Result<String, TransportError> {
        serde_json::to_string(self).map_err(|e| TransportError::Protocol(e.to_string()))
    }

    /// Decode a text frame.
    pub fn decode(text: &str) -> Result<Self, TransportError> {
        serde_json::from_str(text).map_err(|e| TransportError::Protocol(e.to_string()))
    }

    /// Event name on the wire.
    pub fn event(&self) -> &'static str {
        match self {
            Self::CreateChatSession(_) => "createChatSession",
            Self::SendMessage(_) => "sendMessage",
            Self::Listen(_) => "listen",
            Self::Unlisten(_) => "unlisten",
        }
    }
}

impl ServerFrame {
    /// Encode as a text frame.
    pub fn encode(&self) -> Result<String, TransportError> {
        serde_json::to_string(self).map_err(|e| TransportError::Protocol(e.to_string()))
    }

    /// Decode a text frame.
    pub fn decode(text: &str) -> Result<Self, TransportError> {
        serde_json::from_str(text).map_err(|e| TransportError::Protocol(e.to_string()))
    }
}
