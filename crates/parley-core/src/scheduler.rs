//! Effect scheduler.
//!
//! Spawns [`Task`]s on the tokio runtime and tracks them so they can be
//! replaced (same key) or cancelled (key or scope prefix). Every task reports
//! back through the store mailbox, tagged with its [`TaskId`]; the store
//! drops anything from a task that is no longer registered.

use std::{collections::HashMap, panic::AssertUnwindSafe};

use futures::FutureExt;
use tokio::{sync::mpsc, task::AbortHandle};

use crate::{Dispatch, EffectKey, Environment, effect::Task};

/// Identifier assigned to each spawned task.
pub(crate) type TaskId = u64;

/// Message delivered to the store's mailbox.
pub(crate) enum Envelope<A> {
    /// Action sent from outside the store.
    External(A),
    /// Action produced by a running task.
    FromTask { task: TaskId, action: A },
    /// Task completed (successfully or not).
    Finished(TaskId),
    /// Stop the dispatch loop.
    Shutdown,
}

struct Registered {
    key: Option<EffectKey>,
    scope: Option<EffectKey>,
    abort: AbortHandle,
}

impl Registered {
    fn within(&self, prefix: &EffectKey) -> bool {
        self.key.as_ref().is_some_and(|k| k.starts_with(prefix))
            || self.scope.as_ref().is_some_and(|s| s.starts_with(prefix))
    }
}

/// Task registry keyed by [`TaskId`], with a per-key index.
pub(crate) struct Scheduler<A> {
    next_id: TaskId,
    tasks: HashMap<TaskId, Registered>,
    keyed: HashMap<EffectKey, TaskId>,
    mailbox: mpsc::UnboundedSender<Envelope<A>>,
}

impl<A: Send + 'static> Scheduler<A> {
    pub(crate) fn new(mailbox: mpsc::UnboundedSender<Envelope<A>>) -> Self {
        Self { next_id: 1, tasks: HashMap::new(), keyed: HashMap::new(), mailbox }
    }

    /// Spawn a task, replacing any task registered under the same key.
    pub(crate) fn spawn<E: Environment>(&mut self, task: Task<A>, env: &E) -> TaskId {
        if let Some(key) = &task.key
            && let Some(previous) = self.keyed.remove(key)
            && let Some(entry) = self.tasks.remove(&previous)
        {
            tracing::debug!(%key, task = previous, "replacing task with same key");
            entry.abort.abort();
        }

        let id = self.next_id;
        self.next_id += 1;

        let Task { key, scope, debounce, work } = task;
        let mailbox = self.mailbox.clone();
        let sink = mailbox.clone();
        let dispatch = Dispatch::new(move |action| {
            let _ = sink.send(Envelope::FromTask { task: id, action });
        });
        let env = env.clone();

        let handle = tokio::spawn(async move {
            if let Some(window) = debounce {
                env.sleep(window).await;
            }
            if AssertUnwindSafe(work(dispatch)).catch_unwind().await.is_err() {
                tracing::error!(task = id, "effect worker panicked");
            }
            let _ = mailbox.send(Envelope::Finished(id));
        });

        if let Some(key) = &key {
            self.keyed.insert(key.clone(), id);
        }
        self.tasks.insert(id, Registered { key, scope, abort: handle.abort_handle() });
        id
    }

    /// Abort every task whose key or scope lies under `prefix`.
    ///
    /// Returns the number of tasks cancelled.
    pub(crate) fn cancel(&mut self, prefix: &EffectKey) -> usize {
        let doomed: Vec<TaskId> = self
            .tasks
            .iter()
            .filter(|(_, entry)| entry.within(prefix))
            .map(|(id, _)| *id)
            .collect();

        for id in &doomed {
            if let Some(entry) = self.tasks.remove(id) {
                entry.abort.abort();
                if let Some(key) = entry.key {
                    self.keyed.remove(&key);
                }
            }
        }
        doomed.len()
    }

    /// Task is registered and its output should still be applied.
    pub(crate) fn is_live(&self, id: TaskId) -> bool {
        self.tasks.contains_key(&id)
    }

    /// Forget a task that ran to completion.
    pub(crate) fn finish(&mut self, id: TaskId) {
        if let Some(entry) = self.tasks.remove(&id)
            && let Some(key) = entry.key
            && self.keyed.get(&key) == Some(&id)
        {
            self.keyed.remove(&key);
        }
    }

    /// Abort everything.
    pub(crate) fn shutdown(&mut self) {
        for (_, entry) in self.tasks.drain() {
            entry.abort.abort();
        }
        self.keyed.clear();
    }

    /// Number of registered tasks.
    pub(crate) fn in_flight(&self) -> usize {
        self.tasks.len()
    }
}
