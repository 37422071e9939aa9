//! Scripted HTTP collaborators.
//!
//! Every endpoint is a [`Script`]: a queue of one-shot replies consumed in
//! order, falling back to a standing reply once the queue is empty. Replies
//! may carry a delay, which under paused time makes completion order fully
//! controllable.

use std::{
    collections::VecDeque,
    sync::{Mutex, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use parley_client::{
    Account, AccountApi, AccountId, AccountSummary, ChatApi, ChatMessage, ChatSession, Post,
    SessionId, SubscriberInfo, SubscriptionInfo,
};
use parley_core::ServiceError;

/// One scripted response.
#[derive(Debug, Clone)]
pub struct Reply<T> {
    result: Result<T, ServiceError>,
    delay: Duration,
}

impl<T> Reply<T> {
    /// Immediate success.
    pub fn ok(value: T) -> Self {
        Self { result: Ok(value), delay: Duration::ZERO }
    }

    /// Immediate failure.
    pub fn err(error: ServiceError) -> Self {
        Self { result: Err(error), delay: Duration::ZERO }
    }

    /// Resolve only after `delay`.
    #[must_use]
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

struct Queue<T> {
    once: VecDeque<Reply<T>>,
    standing: Reply<T>,
}

/// Reply source for one endpoint.
pub struct Script<T> {
    queue: Mutex<Queue<T>>,
}

impl<T: Clone + Send> Script<T> {
    fn new(standing: Reply<T>) -> Self {
        Self { queue: Mutex::new(Queue { once: VecDeque::new(), standing }) }
    }

    /// Replace the standing reply.
    pub fn set(&self, reply: Reply<T>) {
        self.lock().standing = reply;
    }

    /// Queue a reply for the next call only.
    pub fn push(&self, reply: Reply<T>) {
        self.lock().once.push_back(reply);
    }

    async fn next(&self) -> Result<T, ServiceError> {
        let reply = {
            let mut queue = self.lock();
            match queue.once.pop_front() {
                Some(reply) => reply,
                None => queue.standing.clone(),
            }
        };
        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }
        reply.result
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Queue<T>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Endpoint invocation recorded by [`MockApi`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    /// `fetch_sessions`.
    Sessions(AccountId),
    /// `fetch_messages`.
    Messages(SessionId),
    /// `fetch_available_accounts`.
    AvailableAccounts(AccountId),
    /// `fetch_account`.
    Account,
    /// `fetch_subscriber_info`.
    SubscriberInfo(AccountId),
    /// `fetch_subscription_info`.
    SubscriptionInfo(AccountId),
    /// `fetch_posts`.
    Posts(AccountId),
}

/// Scripted [`ChatApi`] and [`AccountApi`].
///
/// List endpoints answer with an empty list and single-value endpoints with
/// [`ServiceError::NotFound`] until scripted.
pub struct MockApi {
    /// Session list replies.
    pub sessions: Script<Vec<ChatSession>>,
    /// Message history replies.
    pub messages: Script<Vec<ChatMessage>>,
    /// Discovery candidate replies.
    pub available: Script<Vec<AccountSummary>>,
    /// Signed-in account replies.
    pub account: Script<Account>,
    /// Subscriber statistics replies.
    pub subscribers: Script<SubscriberInfo>,
    /// Subscription plan replies.
    pub subscription: Script<SubscriptionInfo>,
    /// Posts replies.
    pub posts: Script<Vec<Post>>,
    calls: Mutex<Vec<Call>>,
}

impl Default for MockApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockApi {
    /// Unscripted API.
    pub fn new() -> Self {
        Self {
            sessions: Script::new(Reply::ok(Vec::new())),
            messages: Script::new(Reply::ok(Vec::new())),
            available: Script::new(Reply::ok(Vec::new())),
            account: Script::new(Reply::err(ServiceError::NotFound)),
            subscribers: Script::new(Reply::err(ServiceError::NotFound)),
            subscription: Script::new(Reply::err(ServiceError::NotFound)),
            posts: Script::new(Reply::ok(Vec::new())),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every call so far, in invocation order.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of calls matching `filter`.
    pub fn count(&self, filter: impl Fn(&Call) -> bool) -> usize {
        let calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
        calls.iter().filter(|c| filter(c)).count()
    }

    fn record(&self, call: Call) {
        tracing::trace!(?call, "mock api call");
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(call);
    }
}

#[async_trait]
impl ChatApi for MockApi {
    async fn fetch_sessions(&self, account: AccountId) -> Result<Vec<ChatSession>, ServiceError> {
        self.record(Call::Sessions(account));
        self.sessions.next().await
    }

    async fn fetch_messages(&self, session: SessionId) -> Result<Vec<ChatMessage>, ServiceError> {
        self.record(Call::Messages(session));
        self.messages.next().await
    }

    async fn fetch_available_accounts(
        &self,
        account: AccountId,
    ) -> Result<Vec<AccountSummary>, ServiceError> {
        self.record(Call::AvailableAccounts(account));
        self.available.next().await
    }
}

#[async_trait]
impl AccountApi for MockApi {
    async fn fetch_account(&self) -> Result<Account, ServiceError> {
        self.record(Call::Account);
        self.account.next().await
    }

    async fn fetch_subscriber_info(
        &self,
        account: AccountId,
    ) -> Result<SubscriberInfo, ServiceError> {
        self.record(Call::SubscriberInfo(account));
        self.subscribers.next().await
    }

    async fn fetch_subscription_info(
        &self,
        account: AccountId,
    ) -> Result<SubscriptionInfo, ServiceError> {
        self.record(Call::SubscriptionInfo(account));
        self.subscription.next().await
    }

    async fn fetch_posts(&self, account: AccountId) -> Result<Vec<Post>, ServiceError> {
        self.record(Call::Posts(account));
        self.posts.next().await
    }
}
