//! HTTP collaborator traits.
//!
//! Features depend on these traits, never on a concrete client, so tests can
//! substitute scripted doubles. [`crate::rest::RestClient`] implements both
//! over HTTP behind the `http` feature.

use async_trait::async_trait;
use parley_core::ServiceError;

use crate::model::{
    Account, AccountId, AccountSummary, ChatMessage, ChatSession, Post, SessionId, SubscriberInfo,
    SubscriptionInfo,
};

/// Chat endpoints.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Sessions owned by `account`, in server order.
    async fn fetch_sessions(&self, account: AccountId) -> Result<Vec<ChatSession>, ServiceError>;

    /// Message history of a session.
    async fn fetch_messages(&self, session: SessionId) -> Result<Vec<ChatMessage>, ServiceError>;

    /// Accounts `account` may start a chat with.
    async fn fetch_available_accounts(
        &self,
        account: AccountId,
    ) -> Result<Vec<AccountSummary>, ServiceError>;
}

/// Account endpoints.
#[async_trait]
pub trait AccountApi: Send + Sync {
    /// The signed-in account.
    async fn fetch_account(&self) -> Result<Account, ServiceError>;

    /// Subscriber statistics.
    async fn fetch_subscriber_info(
        &self,
        account: AccountId,
    ) -> Result<SubscriberInfo, ServiceError>;

    /// Subscription plan.
    async fn fetch_subscription_info(
        &self,
        account: AccountId,
    ) -> Result<SubscriptionInfo, ServiceError>;

    /// Posts authored by the account.
    async fn fetch_posts(&self, account: AccountId) -> Result<Vec<Post>, ServiceError>;
}

/// Map a non-success HTTP status to a [`ServiceError`].
///
/// A `{"message": ...}` body is surfaced verbatim for unexpected statuses.
pub fn status_error(status: u16, body: &str) -> ServiceError {
    match status {
        401 => ServiceError::Unauthorized,
        404 => ServiceError::NotFound,
        304 => ServiceError::NotModified,
        _ => {
            let message = server_message(body).unwrap_or_else(|| format!("HTTP {status}"));
            ServiceError::Unexpected(message)
        },
    }
}

fn server_message(body: &str) -> Option<String> {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => value.get("message").and_then(|m| m.as_str()).map(str::to_owned),
        Err(_) => {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_owned())
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_known_statuses_map_to_variants() {
        assert_eq!(status_error(401, ""), ServiceError::Unauthorized);
        assert_eq!(status_error(404, "gone"), ServiceError::NotFound);
        assert_eq!(status_error(304, ""), ServiceError::NotModified);
    }

    #[test]
    fn server_message_is_preferred() {
        assert_eq!(
            status_error(422, r#"{"message":"Account suspended"}"#),
            ServiceError::Unexpected("Account suspended".into())
        );
        assert_eq!(
            status_error(500, "  upstream timeout \n"),
            ServiceError::Unexpected("upstream timeout".into())
        );
        assert_eq!(status_error(503, ""), ServiceError::Unexpected("HTTP 503".into()));
        assert_eq!(
            status_error(500, r#"{"error":1}"#),
            ServiceError::Unexpected("HTTP 500".into())
        );
    }
}
