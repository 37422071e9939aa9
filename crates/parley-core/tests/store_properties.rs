//! Store dispatch properties.
//!
//! Debounce, cancellation and ordering guarantees of the effect scheduler,
//! exercised through a small search feature. All tests run on tokio's paused
//! clock so debounce windows elapse instantly and deterministically.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use parley_core::{Effect, Loadable, Reducer, ServiceError, Store, SystemEnv};
use proptest::prelude::*;

const WINDOW: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Default)]
struct SearchState {
    query: String,
    results: Loadable<Vec<String>>,
    marks: Vec<u32>,
    streamed: Vec<u32>,
    fetched: Vec<u32>,
}

#[derive(Debug)]
enum SearchAction {
    Query(String),
    Results(Result<Vec<String>, ServiceError>),
    Cancel,
    Explode,
    Mark(u32),
    Chain,
    Stream(Vec<u32>),
    Streamed(u32),
    Fetch { label: u32, delay: Duration },
    Fetched(Result<u32, ServiceError>),
}

#[derive(Clone, Default)]
struct SearchReducer {
    calls: Arc<Mutex<Vec<String>>>,
}

impl SearchReducer {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }
}

async fn kaboom() -> Result<Vec<String>, ServiceError> {
    panic!("kaboom")
}

impl Reducer for SearchReducer {
    type State = SearchState;
    type Action = SearchAction;

    fn reduce(&self, state: &mut SearchState, action: SearchAction) -> Effect<SearchAction> {
        match action {
            SearchAction::Query(query) => {
                state.query.clone_from(&query);
                state.results.begin_fetch();

                let calls = Arc::clone(&self.calls);
                let work = async move {
                    calls.lock().expect("calls lock").push(query.clone());
                    Ok(vec![format!("{query}!")])
                };
                Effect::task(work, SearchAction::Results).keyed("search").debounced(WINDOW)
            },
            SearchAction::Results(result) => {
                state.results.resolve(result);
                Effect::None
            },
            SearchAction::Cancel => {
                state.results.reset();
                Effect::cancel("search")
            },
            SearchAction::Explode => {
                state.results.begin_fetch();
                Effect::task(kaboom(), SearchAction::Results).keyed("search")
            },
            SearchAction::Mark(n) => {
                state.marks.push(n);
                if n < 10 { Effect::send(SearchAction::Mark(n * 10)) } else { Effect::None }
            },
            SearchAction::Chain => Effect::merge([
                Effect::send(SearchAction::Mark(1)),
                Effect::send(SearchAction::Mark(2)),
            ]),
            SearchAction::Stream(values) => Effect::stream(move |dispatch| async move {
                for value in values {
                    dispatch.send(SearchAction::Streamed(value));
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            }),
            SearchAction::Streamed(value) => {
                state.streamed.push(value);
                Effect::None
            },
            SearchAction::Fetch { label, delay } => {
                let calls = Arc::clone(&self.calls);
                let work = async move {
                    calls.lock().expect("calls lock").push(format!("fetch {label}"));
                    tokio::time::sleep(delay).await;
                    Ok(label)
                };
                Effect::task(work, SearchAction::Fetched).keyed("fetch")
            },
            SearchAction::Fetched(result) => {
                if let Ok(label) = result {
                    state.fetched.push(label);
                }
                Effect::None
            },
        }
    }
}

#[tokio::test(start_paused = true)]
async fn debounce_runs_only_last_request() {
    let reducer = SearchReducer::default();
    let (handle, _join) = Store::spawn(reducer.clone(), SearchState::default(), SystemEnv);

    for query in ["a", "ab", "abc"] {
        handle.send(SearchAction::Query(query.into())).expect("send");
        tokio::time::sleep(Duration::from_millis(300)).await;
    }

    assert!(reducer.calls().is_empty(), "nothing fires inside the window");
    assert_eq!(handle.state().results, Loadable::Loading);

    tokio::time::sleep(WINDOW * 2).await;

    assert_eq!(reducer.calls(), vec!["abc".to_string()]);
    let state = handle.state();
    assert_eq!(state.query, "abc");
    assert_eq!(state.results, Loadable::Loaded(vec!["abc!".to_string()]));
}

#[tokio::test(start_paused = true)]
async fn requests_outside_window_each_run() {
    let reducer = SearchReducer::default();
    let (handle, _join) = Store::spawn(reducer.clone(), SearchState::default(), SystemEnv);

    handle.send(SearchAction::Query("one".into())).expect("send");
    tokio::time::sleep(WINDOW + Duration::from_millis(100)).await;
    handle.send(SearchAction::Query("two".into())).expect("send");
    tokio::time::sleep(WINDOW + Duration::from_millis(100)).await;

    assert_eq!(reducer.calls(), vec!["one".to_string(), "two".to_string()]);
    assert_eq!(handle.state().results, Loadable::Loaded(vec!["two!".to_string()]));
}

#[tokio::test(start_paused = true)]
async fn cancel_before_window_prevents_work() {
    let reducer = SearchReducer::default();
    let (handle, _join) = Store::spawn(reducer.clone(), SearchState::default(), SystemEnv);

    handle.send(SearchAction::Query("gone".into())).expect("send");
    tokio::time::sleep(Duration::from_millis(200)).await;
    handle.send(SearchAction::Cancel).expect("send");
    tokio::time::sleep(WINDOW * 3).await;

    assert!(reducer.calls().is_empty());
    assert!(handle.state().results.is_absent());
}

#[tokio::test(start_paused = true)]
async fn panicking_work_fails_the_resource() {
    let (handle, _join) = Store::spawn(SearchReducer::default(), SearchState::default(), SystemEnv);

    handle.send(SearchAction::Explode).expect("send");
    let state = handle.wait_for(|s| s.results.error().is_some()).await.expect("store running");

    assert_eq!(
        state.results.error(),
        Some(&ServiceError::Wrapped("effect panicked: kaboom".into()))
    );
}

#[tokio::test(start_paused = true)]
async fn sent_actions_reduce_depth_first() {
    let (handle, _join) = Store::spawn(SearchReducer::default(), SearchState::default(), SystemEnv);

    handle.send(SearchAction::Chain).expect("send");
    let state = handle.wait_for(|s| s.marks.len() == 4).await.expect("store running");

    assert_eq!(state.marks, vec![1, 10, 2, 20]);
}

#[tokio::test(start_paused = true)]
async fn stream_emissions_arrive_in_order() {
    let (handle, _join) = Store::spawn(SearchReducer::default(), SearchState::default(), SystemEnv);

    handle.send(SearchAction::Stream(vec![3, 1, 4, 1, 5])).expect("send");
    let state = handle.wait_for(|s| s.streamed.len() == 5).await.expect("store running");

    assert_eq!(state.streamed, vec![3, 1, 4, 1, 5]);
}

#[tokio::test(start_paused = true)]
async fn shutdown_returns_final_state_and_rejects_sends() {
    let (handle, join) = Store::spawn(SearchReducer::default(), SearchState::default(), SystemEnv);

    handle.send(SearchAction::Mark(7)).expect("send");
    handle.shutdown();
    let state = join.await.expect("store task");

    assert_eq!(state.marks, vec![7, 70]);
    assert!(handle.send(SearchAction::Mark(1)).is_err());
}

#[tokio::test(start_paused = true)]
async fn same_key_aborts_running_predecessor() {
    let reducer = SearchReducer::default();
    let (handle, _join) = Store::spawn(reducer.clone(), SearchState::default(), SystemEnv);

    handle
        .send(SearchAction::Fetch { label: 500, delay: Duration::from_millis(500) })
        .expect("send");
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(reducer.calls(), vec!["fetch 500".to_string()], "first fetch is running");

    handle.send(SearchAction::Fetch { label: 50, delay: Duration::from_millis(50) }).expect("send");
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(reducer.calls(), vec!["fetch 500".to_string(), "fetch 50".to_string()]);
    assert_eq!(handle.state().fetched, vec![50]);
}

#[tokio::test(start_paused = true)]
async fn dropping_every_handle_stops_the_store() {
    let (handle, join) = Store::spawn(SearchReducer::default(), SearchState::default(), SystemEnv);
    let observer = handle.clone();

    handle.send(SearchAction::Mark(3)).expect("send");
    drop(handle);
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!join.is_finished(), "a clone is still alive");

    drop(observer);
    let state = tokio::time::timeout(Duration::from_secs(2), join)
        .await
        .expect("store stopped")
        .expect("store task");
    assert_eq!(state.marks, vec![3, 30]);
}

/// Gap before the next query: clearly inside or clearly outside the window.
fn gap_strategy() -> impl Strategy<Value = u64> {
    prop_oneof![0u64..900, 1100u64..2000]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// A query runs iff no newer query arrived within the window after it.
    #[test]
    fn prop_last_writer_wins(gaps in prop::collection::vec(gap_strategy(), 1..12)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .expect("runtime");

        let reducer = SearchReducer::default();
        let expected: Vec<String> = gaps
            .iter()
            .enumerate()
            .filter(|(i, gap)| *i + 1 == gaps.len() || **gap >= 1100)
            .map(|(i, _)| format!("q{i}"))
            .collect();

        let observed = runtime.block_on({
            let reducer = reducer.clone();
            async move {
                let (handle, _join) = Store::spawn(reducer, SearchState::default(), SystemEnv);
                for (i, gap) in gaps.iter().enumerate() {
                    handle.send(SearchAction::Query(format!("q{i}"))).expect("send");
                    tokio::time::sleep(Duration::from_millis(*gap)).await;
                }
                tokio::time::sleep(WINDOW * 2).await;
                handle.state()
            }
        });

        prop_assert_eq!(reducer.calls(), expected.clone());
        let last = expected.last().map(|q| vec![format!("{q}!")]);
        prop_assert_eq!(observed.results.value().cloned(), last);
    }
}
