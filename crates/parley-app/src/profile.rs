//! Account profile feature.
//!
//! Loads the signed-in account, then fans out into three independent fetches
//! (subscriber statistics, subscription plan, posts). Each fetch owns its own
//! [`Loadable`] slice; their outcomes and completion order are unrelated.

use parley_client::{Account, AccountId, Post, SubscriberInfo, SubscriptionInfo};
use parley_core::{Effect, Environment, Loadable, Reducer, ServiceError};

use crate::Dependencies;

/// Profile state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileState {
    /// The signed-in account.
    pub account: Loadable<Account>,
    /// Subscriber statistics.
    pub subscribers: Loadable<SubscriberInfo>,
    /// Subscription plan.
    pub subscription: Loadable<SubscriptionInfo>,
    /// Authored posts.
    pub posts: Loadable<Vec<Post>>,
}

impl ProfileState {
    /// Id of the loaded account.
    pub fn account_id(&self) -> Option<AccountId> {
        self.account.value().map(|a| a.id)
    }
}

/// Profile actions.
#[derive(Debug)]
pub enum ProfileAction {
    /// Fetch the account and everything derived from it.
    Load,
    /// Account fetch finished.
    AccountLoaded(Result<Account, ServiceError>),
    /// Start the fan-out fetches for an account.
    FetchDetails(AccountId),
    /// Subscriber statistics fetch finished.
    SubscribersLoaded(Result<SubscriberInfo, ServiceError>),
    /// Subscription plan fetch finished.
    SubscriptionLoaded(Result<SubscriptionInfo, ServiceError>),
    /// Posts fetch finished.
    PostsLoaded(Result<Vec<Post>, ServiceError>),
}

impl ProfileAction {
    /// Error carried by a completion action.
    pub fn service_error(&self) -> Option<&ServiceError> {
        match self {
            Self::AccountLoaded(Err(e))
            | Self::SubscribersLoaded(Err(e))
            | Self::SubscriptionLoaded(Err(e))
            | Self::PostsLoaded(Err(e)) => Some(e),
            _ => None,
        }
    }
}

/// Profile reducer.
pub struct ProfileReducer<E: Environment> {
    deps: Dependencies<E>,
}

impl<E: Environment> ProfileReducer<E> {
    /// Create the reducer.
    pub fn new(deps: Dependencies<E>) -> Self {
        Self { deps }
    }

    fn fan_out(&self, state: &mut ProfileState, account: AccountId) -> Effect<ProfileAction> {
        state.subscribers.begin_fetch();
        state.subscription.begin_fetch();
        state.posts.begin_fetch();

        let api = &self.deps.accounts;
        let (subscribers, subscription, posts) = (api.clone(), api.clone(), api.clone());

        Effect::merge([
            Effect::task(
                async move { subscribers.fetch_subscriber_info(account).await },
                ProfileAction::SubscribersLoaded,
            )
            .keyed("subscribers"),
            Effect::task(
                async move { subscription.fetch_subscription_info(account).await },
                ProfileAction::SubscriptionLoaded,
            )
            .keyed("subscription"),
            Effect::task(
                async move { posts.fetch_posts(account).await },
                ProfileAction::PostsLoaded,
            )
            .keyed("posts"),
        ])
    }
}

impl<E: Environment> Reducer for ProfileReducer<E> {
    type State = ProfileState;
    type Action = ProfileAction;

    fn reduce(&self, state: &mut ProfileState, action: ProfileAction) -> Effect<ProfileAction> {
        match action {
            ProfileAction::Load => {
                state.account.begin_fetch();
                let api = self.deps.accounts.clone();
                let fetch = Effect::task(
                    async move { api.fetch_account().await },
                    ProfileAction::AccountLoaded,
                )
                .keyed("account");

                Effect::sequence(fetch, |action| match action {
                    ProfileAction::AccountLoaded(Ok(account)) => {
                        vec![ProfileAction::FetchDetails(account.id)]
                    },
                    _ => Vec::new(),
                })
            },
            ProfileAction::AccountLoaded(result) => {
                if let Err(e) = &result {
                    tracing::warn!(error = %e, "account fetch failed");
                }
                state.account.resolve(result);
                Effect::None
            },
            ProfileAction::FetchDetails(account) => self.fan_out(state, account),
            ProfileAction::SubscribersLoaded(result) => {
                state.subscribers.resolve(result);
                Effect::None
            },
            ProfileAction::SubscriptionLoaded(result) => {
                state.subscription.resolve(result);
                Effect::None
            },
            ProfileAction::PostsLoaded(result) => {
                state.posts.resolve(result);
                Effect::None
            },
        }
    }
}
