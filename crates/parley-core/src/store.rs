//! Store: owns feature state and executes effects.
//!
//! The store runs as a single tokio task. All state mutation happens on that
//! task, one action at a time, so reducers observe a consistent state and
//! never need locking. Effects run on the scheduler; their actions come back
//! through the same mailbox as external actions.
//!
//! # Ordering
//!
//! An action is reduced to completion, including every [`Effect::Send`] it
//! produces (transitively), before the next mailbox message is taken. State
//! is published to observers once per mailbox message.
//!
//! Actions from a task are applied only while that task is registered. Once a
//! task is replaced by a newer one with the same key, or cancelled, anything
//! it already queued is discarded.
//!
//! # Lifetime
//!
//! The loop exits on [`StoreHandle::shutdown`] or once the last handle is
//! dropped, whichever comes first.

use std::{collections::VecDeque, sync::Arc};

use thiserror::Error;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};

use crate::{
    Effect, Environment, Reducer,
    scheduler::{Envelope, Scheduler},
};

/// Errors from interacting with a store through its handle.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// The dispatch loop has exited.
    #[error("store stopped")]
    Stopped,
}

/// Single-task dispatch loop for one root reducer.
pub struct Store<R: Reducer, E: Environment> {
    reducer: R,
    state: R::State,
    env: E,
    scheduler: Scheduler<R::Action>,
    inbox: mpsc::UnboundedReceiver<Envelope<R::Action>>,
    published: watch::Sender<R::State>,
}

/// Cloneable handle for sending actions and observing state.
pub struct StoreHandle<S, A> {
    mailbox: mpsc::UnboundedSender<Envelope<A>>,
    state: watch::Receiver<S>,
    lifeline: Arc<Lifeline<A>>,
}

impl<S, A> Clone for StoreHandle<S, A> {
    fn clone(&self) -> Self {
        Self {
            mailbox: self.mailbox.clone(),
            state: self.state.clone(),
            lifeline: Arc::clone(&self.lifeline),
        }
    }
}

/// Shared by every clone of a handle. Stops the loop when the last one goes.
struct Lifeline<A> {
    mailbox: mpsc::UnboundedSender<Envelope<A>>,
}

impl<A> Drop for Lifeline<A> {
    fn drop(&mut self) {
        let _ = self.mailbox.send(Envelope::Shutdown);
    }
}

impl<R: Reducer, E: Environment> Store<R, E> {
    /// Create a store and its handle. Nothing runs until [`Store::run`].
    pub fn new(reducer: R, state: R::State, env: E) -> (Self, StoreHandle<R::State, R::Action>) {
        let (mailbox, inbox) = mpsc::unbounded_channel();
        let (published, observed) = watch::channel(state.clone());

        let store = Self {
            reducer,
            state,
            env,
            scheduler: Scheduler::new(mailbox.clone()),
            inbox,
            published,
        };
        let lifeline = Arc::new(Lifeline { mailbox: mailbox.clone() });
        (store, StoreHandle { mailbox, state: observed, lifeline })
    }

    /// Create a store and spawn its dispatch loop on the current runtime.
    pub fn spawn(
        reducer: R,
        state: R::State,
        env: E,
    ) -> (StoreHandle<R::State, R::Action>, JoinHandle<R::State>) {
        let (store, handle) = Self::new(reducer, state, env);
        (handle, tokio::spawn(store.run()))
    }

    /// Run the dispatch loop until shut down or every handle is dropped.
    /// Returns the final state.
    ///
    /// Every in-flight task is aborted on exit.
    pub async fn run(mut self) -> R::State {
        tracing::debug!("store started");

        while let Some(envelope) = self.inbox.recv().await {
            match envelope {
                Envelope::External(action) => self.process(action),
                Envelope::FromTask { task, action } => {
                    if self.scheduler.is_live(task) {
                        self.process(action);
                    } else {
                        tracing::trace!(task, ?action, "dropping action from cancelled task");
                    }
                },
                Envelope::Finished(task) => self.scheduler.finish(task),
                Envelope::Shutdown => break,
            }
        }

        tracing::debug!(in_flight = self.scheduler.in_flight(), "store stopping");
        self.scheduler.shutdown();
        self.state
    }

    /// Reduce an action and everything it synchronously sends.
    ///
    /// Sent actions are reduced depth first: the follow-ups of an action run
    /// before its later siblings.
    fn process(&mut self, action: R::Action) {
        let mut pending = VecDeque::from([action]);
        let mut sent = Vec::new();

        while let Some(action) = pending.pop_front() {
            tracing::trace!(?action, "reduce");
            let effect = self.reducer.reduce(&mut self.state, action);
            self.execute(effect, &mut sent);
            for follow_up in sent.drain(..).rev() {
                pending.push_front(follow_up);
            }
        }

        self.published.send_replace(self.state.clone());
    }

    fn execute(&mut self, effect: Effect<R::Action>, sent: &mut Vec<R::Action>) {
        match effect {
            Effect::None => {},
            Effect::Send(action) => sent.push(action),
            Effect::Run(task) => {
                let id = self.scheduler.spawn(task, &self.env);
                tracing::trace!(task = id, "spawned task");
            },
            Effect::Merge(effects) => {
                for effect in effects {
                    self.execute(effect, sent);
                }
            },
            Effect::Cancel(key) => {
                let cancelled = self.scheduler.cancel(&key);
                tracing::debug!(%key, cancelled, "cancelled tasks");
            },
        }
    }
}

impl<S, A> StoreHandle<S, A>
where
    S: Clone,
{
    /// Enqueue an action.
    pub fn send(&self, action: A) -> Result<(), StoreError> {
        self.mailbox.send(Envelope::External(action)).map_err(|_| StoreError::Stopped)
    }

    /// Snapshot of the most recently published state.
    pub fn state(&self) -> S {
        self.state.borrow().clone()
    }

    /// Receiver notified after every processed mailbox message.
    pub fn subscribe(&self) -> watch::Receiver<S> {
        self.state.clone()
    }

    /// Wait until the published state satisfies `predicate`.
    pub async fn wait_for(&self, predicate: impl FnMut(&S) -> bool) -> Result<S, StoreError> {
        let mut observed = self.state.clone();
        let snapshot = observed.wait_for(predicate).await.map_err(|_| StoreError::Stopped)?;
        Ok(snapshot.clone())
    }

    /// Ask the dispatch loop to exit after the messages already queued.
    pub fn shutdown(&self) {
        let _ = self.mailbox.send(Envelope::Shutdown);
    }
}
