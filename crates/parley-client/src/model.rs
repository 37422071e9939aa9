//! Wire models shared by the REST client, the socket adapter and features.
//!
//! All models serialize with camelCase field names. Timestamps are RFC 3339.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account identifier assigned by the server.
pub type AccountId = i64;

/// Chat session identifier assigned by the server.
pub type SessionId = i64;

/// Chat message identifier. `0` for messages not yet confirmed.
pub type MessageId = i64;

/// Identity and display fields of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    /// Account id.
    pub id: AccountId,
    /// Display name.
    pub username: String,
    /// Avatar URL.
    #[serde(default)]
    pub picture: Option<String>,
}

/// The signed-in account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Account id.
    pub id: AccountId,
    /// Display name.
    pub username: String,
    /// Avatar URL.
    #[serde(default)]
    pub picture: Option<String>,
    /// Profile text.
    #[serde(default)]
    pub bio: Option<String>,
}

/// Follower statistics for an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberInfo {
    /// Account the statistics belong to.
    pub account_id: AccountId,
    /// Number of subscribers.
    #[serde(default)]
    pub subscriber_count: u64,
}

/// Subscription plan of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionInfo {
    /// Account the plan belongs to.
    pub account_id: AccountId,
    /// Plan name, if subscribed.
    #[serde(default)]
    pub plan: Option<String>,
    /// Subscription is currently active.
    #[serde(default)]
    pub active: bool,
}

/// A post authored by an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Post id.
    pub id: i64,
    /// Author.
    pub account_id: AccountId,
    /// Caption text.
    #[serde(default)]
    pub caption: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// A chat session between two accounts.
///
/// Sessions are created server-side; the client only requests creation.
/// `available` stays false until the counterpart also initiates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    /// Session id.
    pub id: SessionId,
    /// Account that initiated the session.
    pub from_user_id: AccountId,
    /// Account the session was initiated towards.
    pub to_user_id: AccountId,
    /// Counterpart display name.
    pub username: String,
    /// Counterpart avatar URL.
    #[serde(default)]
    pub picture: Option<String>,
    /// Both sides have initiated.
    #[serde(default)]
    pub available: bool,
}

impl ChatSession {
    /// The participant that is not `me`.
    pub fn counterpart(&self, me: AccountId) -> AccountId {
        if self.from_user_id == me { self.to_user_id } else { self.from_user_id }
    }

    /// `me` initiated this session.
    pub fn initiated_by(&self, me: AccountId) -> bool {
        self.from_user_id == me
    }
}

/// A message in a chat session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Message id, `0` while provisional.
    pub id: MessageId,
    /// Session the message belongs to.
    pub session_id: SessionId,
    /// Recipient.
    pub to_user_id: AccountId,
    /// Message body.
    pub message: String,
    /// Send time.
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Locally created message awaiting server confirmation.
    pub fn provisional(
        session_id: SessionId,
        to_user_id: AccountId,
        message: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self { id: 0, session_id, to_user_id, message: message.into(), timestamp }
    }

    /// Created locally and not yet assigned a server id.
    pub fn is_provisional(&self) -> bool {
        self.id == 0
    }
}

/// Request to create a chat session between two accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSession {
    /// Requesting account.
    pub from_user_id: AccountId,
    /// Target account.
    pub to_user_id: AccountId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_counterpart_is_the_other_side() {
        let session = ChatSession {
            id: 1,
            from_user_id: 5,
            to_user_id: 9,
            username: "nine".into(),
            picture: None,
            available: false,
        };

        assert_eq!(session.counterpart(5), 9);
        assert_eq!(session.counterpart(9), 5);
        assert!(session.initiated_by(5));
        assert!(!session.initiated_by(9));
    }

    #[test]
    fn wire_names_are_camel_case() {
        let json = serde_json::to_value(CreateSession { from_user_id: 5, to_user_id: 9 })
            .expect("serialize");
        assert_eq!(json, serde_json::json!({ "fromUserId": 5, "toUserId": 9 }));

        let session: ChatSession = serde_json::from_value(serde_json::json!({
            "id": 3,
            "fromUserId": 9,
            "toUserId": 5,
            "username": "nine",
        }))
        .expect("deserialize");
        assert!(!session.available);
        assert_eq!(session.picture, None);
    }

    #[test]
    fn provisional_messages_have_id_zero() {
        let now = Utc::now();
        let message = ChatMessage::provisional(3, 9, "hi", now);

        assert!(message.is_provisional());
        assert_eq!(message.timestamp, now);
    }
}
