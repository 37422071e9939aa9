//! Chat feature integration tests.
//!
//! Runs the full feature tree under paused time against scripted endpoints
//! and an in-memory socket, then checks published state, socket frames and
//! endpoint calls.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use parley_app::{
    AppState, ChatAction, ChatPhase, chat::discovery::DiscoveryAction, chat::room::RoomAction,
};
use parley_client::{
    AccountId, AccountSummary, ChatMessage, ChatSession, ClientFrame, CreateSession, Interest,
    ServerFrame, SessionId, frame::InboundMessage,
};
use parley_core::{Loadable, ServiceError};
use parley_harness::{AppHarness, Call, InvariantRegistry, MockApi, Reply};

const ME: AccountId = 5;
const WINDOW: Duration = Duration::from_secs(1);

fn session(id: SessionId, from: AccountId, to: AccountId) -> ChatSession {
    ChatSession {
        id,
        from_user_id: from,
        to_user_id: to,
        username: format!("user{}", if from == ME { to } else { from }),
        picture: None,
        available: false,
    }
}

fn at(seconds: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).single().expect("timestamp")
        + chrono::TimeDelta::seconds(seconds)
}

fn message(id: i64, session_id: SessionId, seconds: i64, body: &str) -> ChatMessage {
    ChatMessage { id, session_id, to_user_id: ME, message: body.into(), timestamp: at(seconds) }
}

fn inbound(from: AccountId, message: ChatMessage) -> String {
    ServerFrame::Message(InboundMessage { user_id: from, message }).encode().expect("encode")
}

fn session_calls(api: &MockApi) -> usize {
    api.count(|c| matches!(c, Call::Sessions(ME)))
}

fn sessions(state: &AppState) -> Option<&Vec<ChatSession>> {
    state.chat.sessions.value().filter(|_| state.chat.sessions.is_loaded())
}

/// Signed-in harness with the session list loaded.
async fn listed(api: MockApi) -> AppHarness {
    let harness = AppHarness::start(api);
    harness.chat(ChatAction::SetAccount(Some(ME))).expect("send");
    harness.chat(ChatAction::Activate).expect("send");
    harness.wait_for(|s| s.chat.sessions.is_loaded()).await.expect("session list");
    harness
}

/// Harness with session 59 (me -> 9) open and its listen frame consumed.
async fn open_room(api: MockApi) -> AppHarness {
    api.sessions.set(Reply::ok(vec![session(59, ME, 9)]));
    let mut harness = listed(api).await;
    harness.chat(ChatAction::SelectSession(59)).expect("send");

    assert_eq!(harness.next_frame().await, Some(ClientFrame::Listen(Interest { user_id: 9 })));
    harness
        .wait_for(|s| s.chat.room.as_ref().is_some_and(|r| !r.history.is_pending()))
        .await
        .expect("room");
    harness
}

#[tokio::test(start_paused = true)]
async fn loading_is_published_before_the_debounced_fetch() {
    let harness = AppHarness::start(MockApi::new());
    harness.chat(ChatAction::SetAccount(Some(ME))).expect("send");
    harness.chat(ChatAction::Activate).expect("send");
    harness.settle().await;

    let state = harness.state();
    assert_eq!(state.chat.sessions, Loadable::Loading);
    assert_eq!(state.chat.phase(), ChatPhase::Discovering);
    assert_eq!(session_calls(&harness.api), 0);

    harness.advance(WINDOW).await;
    let state = harness.wait_for(|s| s.chat.sessions.is_loaded()).await.expect("loaded");
    assert_eq!(state.chat.phase(), ChatPhase::SessionListEmpty);
    assert_eq!(session_calls(&harness.api), 1);
}

#[tokio::test(start_paused = true)]
async fn rapid_activations_fetch_once() {
    let harness = AppHarness::start(MockApi::new());
    harness.chat(ChatAction::SetAccount(Some(ME))).expect("send");
    for _ in 0..4 {
        harness.chat(ChatAction::Activate).expect("send");
        harness.advance(Duration::from_millis(300)).await;
    }

    harness.advance(WINDOW).await;
    harness.wait_for(|s| s.chat.sessions.is_loaded()).await.expect("loaded");
    assert_eq!(session_calls(&harness.api), 1);
}

#[tokio::test(start_paused = true)]
async fn activation_without_account_fails() {
    let harness = AppHarness::start(MockApi::new());
    harness.chat(ChatAction::Activate).expect("send");

    let state = harness.wait_for(|s| s.chat.activation_error.is_some()).await.expect("state");
    assert_eq!(state.chat.phase(), ChatPhase::Error(ServiceError::NotFound));

    harness.advance(WINDOW * 2).await;
    assert_eq!(session_calls(&harness.api), 0);
}

#[tokio::test(start_paused = true)]
async fn selecting_an_account_requests_a_session_then_refreshes() {
    let api = MockApi::new();
    let nine = AccountSummary { id: 9, username: "nine".into(), picture: None };
    api.available.set(Reply::ok(vec![nine]));
    let mut harness = listed(api).await;
    assert!(harness.state().chat.is_chat_session_not_available());

    harness.chat(ChatAction::OpenDiscovery).expect("send");
    let state = harness
        .wait_for(|s| s.chat.discovery.as_ref().is_some_and(|d| d.accounts.is_loaded()))
        .await
        .expect("discovery");
    assert_eq!(state.chat.discovery.as_ref().map(|d| d.visible().len()), Some(1));

    harness.api.sessions.set(Reply::ok(vec![session(59, ME, 9)]));
    harness.chat(ChatAction::Discovery(DiscoveryAction::Select(9))).expect("send");

    assert_eq!(
        harness.next_frame().await,
        Some(ClientFrame::CreateChatSession(CreateSession { from_user_id: ME, to_user_id: 9 }))
    );

    // Inside the confirmation window nothing else happens.
    harness.advance(WINDOW / 2).await;
    assert!(harness.state().chat.discovery.is_some());
    assert_eq!(session_calls(&harness.api), 1);

    harness.advance(WINDOW).await;
    let state = harness
        .wait_for(|s| s.chat.discovery.is_none() && sessions(s).is_some_and(|l| l.len() == 1))
        .await
        .expect("refreshed");
    assert_eq!(session_calls(&harness.api), 2);
    assert_eq!(state.chat.phase(), ChatPhase::SessionListLoaded);
    assert!(!state.chat.is_chat_session_not_available());
}

#[tokio::test(start_paused = true)]
async fn closing_discovery_before_confirmation_skips_refresh() {
    let mut harness = listed(MockApi::new()).await;
    harness.chat(ChatAction::OpenDiscovery).expect("send");
    harness.settle().await;

    harness.chat(ChatAction::Discovery(DiscoveryAction::Select(9))).expect("send");
    assert!(matches!(harness.next_frame().await, Some(ClientFrame::CreateChatSession(_))));
    harness.chat(ChatAction::CloseDiscovery).expect("send");

    harness.advance(WINDOW * 2).await;
    assert!(harness.state().chat.discovery.is_none());
    assert_eq!(session_calls(&harness.api), 1);
}

#[tokio::test(start_paused = true)]
async fn unauthorized_tears_down_credentials_once() {
    let api = MockApi::new();
    api.sessions.set(Reply::err(ServiceError::Unauthorized));
    let harness = AppHarness::start(api);
    harness.chat(ChatAction::SetAccount(Some(ME))).expect("send");
    harness.chat(ChatAction::Activate).expect("send");

    let state = harness.wait_for(|s| s.chat.sessions.error().is_some()).await.expect("failed");
    assert_eq!(state.chat.sessions, Loadable::Failed(ServiceError::Unauthorized));
    assert_eq!(state.chat.phase(), ChatPhase::Error(ServiceError::Unauthorized));
    assert_eq!(state.teardowns, 1);

    harness.chat(ChatAction::Retry).expect("send");
    harness.advance(WINDOW * 2).await;

    assert_eq!(session_calls(&harness.api), 2);
    assert_eq!(harness.state().teardowns, 1);
    assert_eq!(harness.credentials.clears(), 1);
    InvariantRegistry::standard().assert_all(&harness.state(), "after repeated unauthorized");
}

#[tokio::test(start_paused = true)]
async fn other_failures_keep_credentials() {
    let api = MockApi::new();
    api.sessions.set(Reply::err(ServiceError::Unexpected("maintenance".into())));
    let harness = AppHarness::start(api);
    harness.chat(ChatAction::SetAccount(Some(ME))).expect("send");
    harness.chat(ChatAction::Activate).expect("send");
    harness.wait_for(|s| s.chat.sessions.error().is_some()).await.expect("failed");

    assert_eq!(harness.state().teardowns, 0);
    assert_eq!(harness.credentials.clears(), 0);
}

#[tokio::test(start_paused = true)]
async fn dismissing_the_room_cancels_its_effects() {
    let api = MockApi::new();
    api.sessions.set(Reply::ok(vec![session(59, ME, 9)]));
    api.messages.set(Reply::ok(vec![message(1, 59, 0, "late")]).after(Duration::from_secs(5)));
    let mut harness = listed(api).await;

    harness.chat(ChatAction::SelectSession(59)).expect("send");
    assert_eq!(harness.next_frame().await, Some(ClientFrame::Listen(Interest { user_id: 9 })));
    assert_eq!(harness.state().chat.phase(), ChatPhase::ChatOpen);

    harness.chat(ChatAction::DismissRoom).expect("send");
    assert_eq!(harness.next_frame().await, Some(ClientFrame::Unlisten(Interest { user_id: 9 })));

    harness.advance(Duration::from_secs(10)).await;
    let state = harness.state();
    assert!(state.chat.room.is_none());
    assert_eq!(state.chat.phase(), ChatPhase::SessionListLoaded);
    assert!(harness.api.count(|c| matches!(c, Call::Messages(59))) <= 1);

    // Pushes after the unlisten reach nobody.
    harness.server.push(inbound(9, message(2, 59, 1, "ignored")));
    harness.settle().await;
    assert!(harness.state().chat.room.is_none());
}

#[tokio::test(start_paused = true)]
async fn switching_rooms_moves_the_subscription() {
    let api = MockApi::new();
    api.sessions.set(Reply::ok(vec![session(59, ME, 9), session(57, 7, ME)]));
    let mut harness = listed(api).await;

    harness.chat(ChatAction::SelectSession(59)).expect("send");
    assert_eq!(harness.next_frame().await, Some(ClientFrame::Listen(Interest { user_id: 9 })));

    harness.chat(ChatAction::SelectSession(57)).expect("send");
    harness.settle().await;

    let frames = harness.drain_frames();
    assert!(frames.contains(&ClientFrame::Unlisten(Interest { user_id: 9 })), "{frames:?}");
    assert!(frames.contains(&ClientFrame::Listen(Interest { user_id: 7 })), "{frames:?}");
    assert_eq!(harness.state().chat.room.map(|r| r.session.id), Some(57));
}

#[tokio::test(start_paused = true)]
async fn sending_appends_optimistically_and_clears_the_draft() {
    let mut harness = open_room(MockApi::new()).await;
    let expected_time = harness.env.peek();

    harness.chat(ChatAction::Room(RoomAction::UpdateDraft("hello nine".into()))).expect("send");
    harness.chat(ChatAction::Room(RoomAction::Send)).expect("send");

    let state = harness
        .wait_for(|s| s.chat.room.as_ref().is_some_and(|r| !r.messages.is_empty()))
        .await
        .expect("appended");
    let room = state.chat.room.expect("room");
    assert_eq!(room.draft, "");
    assert_eq!(room.messages.len(), 1);
    assert_eq!(room.messages[0].id, 0);
    assert_eq!(room.messages[0].to_user_id, 9);
    assert_eq!(room.messages[0].timestamp, expected_time);

    let Some(ClientFrame::SendMessage(sent)) = harness.next_frame().await else {
        panic!("expected a sendMessage frame");
    };
    assert_eq!(sent.message, "hello nine");
    assert_eq!(sent.session_id, 59);
}

#[tokio::test(start_paused = true)]
async fn blank_drafts_are_not_sent() {
    let mut harness = open_room(MockApi::new()).await;

    harness.chat(ChatAction::Room(RoomAction::UpdateDraft("   ".into()))).expect("send");
    harness.chat(ChatAction::Room(RoomAction::Send)).expect("send");
    harness.settle().await;

    let room = harness.state().chat.room.expect("room");
    assert!(room.messages.is_empty());
    assert_eq!(room.draft, "   ");
    assert!(harness.drain_frames().is_empty());
}

#[tokio::test(start_paused = true)]
async fn consecutive_sends_keep_their_order() {
    let mut harness = open_room(MockApi::new()).await;

    for text in ["m1", "m2"] {
        harness.chat(ChatAction::Room(RoomAction::UpdateDraft(text.into()))).expect("send");
        harness.chat(ChatAction::Room(RoomAction::Send)).expect("send");
    }

    let state = harness
        .wait_for(|s| s.chat.room.as_ref().is_some_and(|r| r.messages.len() == 2))
        .await
        .expect("both appended");
    let room = state.chat.room.expect("room");
    let bodies: Vec<&str> = room.messages.iter().map(|m| m.message.as_str()).collect();
    assert_eq!(bodies, vec!["m1", "m2"]);
    assert!(room.messages[0].timestamp < room.messages[1].timestamp);

    let mut delivered = Vec::new();
    for _ in 0..2 {
        let Some(ClientFrame::SendMessage(sent)) = harness.next_frame().await else {
            panic!("expected a sendMessage frame");
        };
        delivered.push(sent.message);
    }
    assert_eq!(delivered, vec!["m1".to_string(), "m2".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn inbound_messages_only_reach_the_matching_room() {
    let mut harness = open_room(MockApi::new()).await;

    harness.server.push(inbound(9, message(11, 77, 1, "other session")));
    harness.server.push(inbound(7, message(12, 59, 2, "other sender")));
    harness.server.push(inbound(9, message(13, 59, 3, "hello")));

    let state = harness
        .wait_for(|s| s.chat.room.as_ref().is_some_and(|r| !r.messages.is_empty()))
        .await
        .expect("delivered");
    harness.settle().await;

    let room = harness.state().chat.room.expect("room");
    let bodies: Vec<_> = room.messages.iter().map(|m| m.message.as_str()).collect();
    assert_eq!(bodies, vec!["hello"]);
    assert_eq!(state.chat.room.map(|r| r.messages[0].id), Some(13));
    assert!(harness.drain_frames().is_empty());
}

#[tokio::test(start_paused = true)]
async fn timeline_stays_ordered_across_sources() {
    let api = MockApi::new();
    api.messages.set(Reply::ok(vec![message(3, 59, 30, "third"), message(1, 59, 10, "first")]));
    let harness = open_room(api).await;

    harness.server.push(inbound(9, message(2, 59, 20, "second")));
    harness.server.push(inbound(9, message(2, 59, 20, "second")));
    let state = harness
        .wait_for(|s| s.chat.room.as_ref().is_some_and(|r| r.messages.len() == 3))
        .await
        .expect("delivered");

    let room = state.chat.room.as_ref().expect("room");
    let bodies: Vec<_> = room.messages.iter().map(|m| m.message.as_str()).collect();
    assert_eq!(bodies, vec!["first", "second", "third"]);
    InvariantRegistry::standard().assert_all(&state, "after merge");

    harness.settle().await;
    assert_eq!(harness.state().chat.room.map(|r| r.messages.len()), Some(3));
}

#[tokio::test(start_paused = true)]
async fn changing_account_closes_sub_flows() {
    let mut harness = open_room(MockApi::new()).await;
    harness.chat(ChatAction::OpenDiscovery).expect("send");
    harness.settle().await;

    harness.chat(ChatAction::SetAccount(Some(6))).expect("send");
    assert_eq!(harness.next_frame().await, Some(ClientFrame::Unlisten(Interest { user_id: 9 })));

    let state = harness.state();
    assert!(state.chat.room.is_none());
    assert!(state.chat.discovery.is_none());
    assert_eq!(state.chat.sessions, Loadable::Absent);
    InvariantRegistry::standard().assert_all(&state, "after account change");
}
