//! Standard invariant checks.

use parley_app::{AppState, AuthState};

use super::{Invariant, InvariantResult, Violation};

/// The open room's timeline is sorted by timestamp.
pub struct TimelineOrdered;

impl Invariant for TimelineOrdered {
    fn name(&self) -> &'static str {
        "timeline_ordered"
    }

    fn check(&self, state: &AppState) -> InvariantResult {
        let Some(room) = &state.chat.room else {
            return Ok(());
        };
        for window in room.messages.windows(2) {
            if window[1].timestamp < window[0].timestamp {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "session {}: {:?} precedes {:?}",
                        room.session.id, window[0].timestamp, window[1].timestamp
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Discovery and room exist only while an owning account is set, and
/// discovery searches on behalf of that account.
pub struct SubFlowsNeedAccount;

impl Invariant for SubFlowsNeedAccount {
    fn name(&self) -> &'static str {
        "sub_flows_need_account"
    }

    fn check(&self, state: &AppState) -> InvariantResult {
        let chat = &state.chat;
        let Some(account) = chat.account else {
            if chat.discovery.is_some() || chat.room.is_some() {
                return Err(Violation {
                    invariant: self.name(),
                    message: "sub-flow open without an owning account".into(),
                });
            }
            return Ok(());
        };
        if let Some(discovery) = &chat.discovery
            && discovery.account != account
        {
            return Err(Violation {
                invariant: self.name(),
                message: format!("discovery for {} under account {account}", discovery.account),
            });
        }
        Ok(())
    }
}

/// The open room is viewed by the owning account, which is a participant.
pub struct RoomBelongsToAccount;

impl Invariant for RoomBelongsToAccount {
    fn name(&self) -> &'static str {
        "room_belongs_to_account"
    }

    fn check(&self, state: &AppState) -> InvariantResult {
        let Some(room) = &state.chat.room else {
            return Ok(());
        };
        if state.chat.account != Some(room.me) {
            return Err(Violation {
                invariant: self.name(),
                message: format!("room viewed by {} under {:?}", room.me, state.chat.account),
            });
        }
        let session = &room.session;
        if session.from_user_id != room.me && session.to_user_id != room.me {
            return Err(Violation {
                invariant: self.name(),
                message: format!("{} is not a participant of session {}", room.me, session.id),
            });
        }
        Ok(())
    }
}

/// Subscriber, subscription and posts fetches start only after the account
/// fetch has.
pub struct FanOutFollowsAccount;

impl Invariant for FanOutFollowsAccount {
    fn name(&self) -> &'static str {
        "fan_out_follows_account"
    }

    fn check(&self, state: &AppState) -> InvariantResult {
        let profile = &state.profile;
        let details_started = !profile.subscribers.is_absent()
            || !profile.subscription.is_absent()
            || !profile.posts.is_absent();
        if details_started && profile.account.is_absent() {
            return Err(Violation {
                invariant: self.name(),
                message: "profile details requested before the account".into(),
            });
        }
        Ok(())
    }
}

/// A signed-out state has performed at least one credential teardown.
pub struct SignedOutClearedCredentials;

impl Invariant for SignedOutClearedCredentials {
    fn name(&self) -> &'static str {
        "signed_out_cleared_credentials"
    }

    fn check(&self, state: &AppState) -> InvariantResult {
        if state.auth == AuthState::SignedOut && state.teardowns == 0 {
            return Err(Violation {
                invariant: self.name(),
                message: "signed out without a teardown".into(),
            });
        }
        Ok(())
    }
}
