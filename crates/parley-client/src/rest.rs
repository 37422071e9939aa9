//! REST client.
//!
//! Bearer-token JSON client implementing [`ChatApi`] and [`AccountApi`].
//! Non-success statuses are mapped through [`status_error`]; transport and
//! decoding failures become [`ServiceError::Wrapped`].

use std::sync::Arc;

use async_trait::async_trait;
use parley_core::ServiceError;
use serde::de::DeserializeOwned;

use crate::{
    AccountApi, ChatApi, CredentialStore,
    api::status_error,
    model::{
        Account, AccountId, AccountSummary, ChatMessage, ChatSession, Post, SessionId,
        SubscriberInfo, SubscriptionInfo,
    },
};

/// HTTP implementation of the API traits.
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialStore>,
}

impl RestClient {
    /// Client for `base_url`, authenticating with `credentials`.
    pub fn new(base_url: impl Into<String>, credentials: Arc<dyn CredentialStore>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { http: reqwest::Client::new(), base_url, credentials }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ServiceError> {
        let url = format!("{}/{path}", self.base_url);
        tracing::debug!(%url, "GET");

        let mut request = self.http.get(&url);
        if let Some(token) = self.credentials.token() {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(ServiceError::wrap)?;
        let status = response.status();
        if status.is_success() {
            return response.json::<T>().await.map_err(ServiceError::wrap);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::debug!(%url, status = status.as_u16(), "request failed");
        Err(status_error(status.as_u16(), &body))
    }
}

#[async_trait]
impl ChatApi for RestClient {
    async fn fetch_sessions(&self, account: AccountId) -> Result<Vec<ChatSession>, ServiceError> {
        self.get(&format!("chat/sessions/{account}")).await
    }

    async fn fetch_messages(&self, session: SessionId) -> Result<Vec<ChatMessage>, ServiceError> {
        self.get(&format!("chat/sessions/{session}/messages")).await
    }

    async fn fetch_available_accounts(
        &self,
        account: AccountId,
    ) -> Result<Vec<AccountSummary>, ServiceError> {
        self.get(&format!("chat/accounts/{account}/available")).await
    }
}

#[async_trait]
impl AccountApi for RestClient {
    async fn fetch_account(&self) -> Result<Account, ServiceError> {
        self.get("accounts/me").await
    }

    async fn fetch_subscriber_info(
        &self,
        account: AccountId,
    ) -> Result<SubscriberInfo, ServiceError> {
        self.get(&format!("accounts/{account}/subscriber-info")).await
    }

    async fn fetch_subscription_info(
        &self,
        account: AccountId,
    ) -> Result<SubscriptionInfo, ServiceError> {
        self.get(&format!("accounts/{account}/subscription")).await
    }

    async fn fetch_posts(&self, account: AccountId) -> Result<Vec<Post>, ServiceError> {
        self.get(&format!("accounts/{account}/posts")).await
    }
}
