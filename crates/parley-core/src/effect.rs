//! Declarative effect descriptions.
//!
//! Reducers never perform I/O. They return an [`Effect`] describing what
//! should happen next and the [`crate::Store`] executes it:
//!
//! - [`Effect::None`]: nothing to do
//! - [`Effect::Send`]: synchronous follow-up action
//! - [`Effect::Run`]: asynchronous [`Task`], optionally keyed and debounced
//! - [`Effect::Merge`]: several effects with no ordering among completions
//! - [`Effect::Cancel`]: abort everything registered under an [`EffectKey`]
//!
//! # Keys
//!
//! A keyed task is "at most one in flight": scheduling a second task with the
//! same key aborts the first, whether it is still waiting out its debounce
//! window or already running. This gives trailing-edge debounce semantics
//! where the last request wins.
//!
//! Keys are hierarchical. When a parent embeds a child feature it calls
//! [`Effect::scoped`] with the child's segment, so `history` emitted by a chat
//! room becomes `chat/room/history` at the root. Cancelling a key cancels
//! every task whose key or owning scope lies underneath it.

use std::{borrow::Cow, fmt, future::Future, panic::AssertUnwindSafe, sync::Arc, time::Duration};

use futures::{FutureExt, future::BoxFuture};

use crate::ServiceError;

/// Hierarchical identifier for debounce, dedup and cancellation.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct EffectKey {
    segments: Vec<Cow<'static, str>>,
}

impl EffectKey {
    /// Single-segment key.
    pub fn new(segment: impl Into<Cow<'static, str>>) -> Self {
        Self { segments: vec![segment.into()] }
    }

    /// Key nested one level below this one.
    #[must_use]
    pub fn child(&self, segment: impl Into<Cow<'static, str>>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    /// Same key re-rooted under a parent segment.
    #[must_use]
    pub fn within(&self, parent: impl Into<Cow<'static, str>>) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.push(parent.into());
        segments.extend(self.segments.iter().cloned());
        Self { segments }
    }

    /// True if `prefix` equals this key or is one of its ancestors.
    pub fn starts_with(&self, prefix: &EffectKey) -> bool {
        self.segments.len() >= prefix.segments.len()
            && self.segments.iter().zip(&prefix.segments).all(|(a, b)| a == b)
    }
}

impl fmt::Display for EffectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

impl fmt::Debug for EffectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EffectKey({self})")
    }
}

impl From<&'static str> for EffectKey {
    fn from(segment: &'static str) -> Self {
        Self::new(segment)
    }
}

/// Sink through which a running task reports actions back to the store.
pub struct Dispatch<A> {
    sink: Arc<dyn Fn(A) + Send + Sync>,
}

impl<A> Clone for Dispatch<A> {
    fn clone(&self) -> Self {
        Self { sink: Arc::clone(&self.sink) }
    }
}

impl<A: Send + 'static> Dispatch<A> {
    /// Wrap a sink function.
    pub fn new(sink: impl Fn(A) + Send + Sync + 'static) -> Self {
        Self { sink: Arc::new(sink) }
    }

    /// Deliver an action to the store.
    ///
    /// Actions from a task that has been cancelled are dropped by the store.
    pub fn send(&self, action: A) {
        (self.sink)(action);
    }
}

type Work<A> = Box<dyn FnOnce(Dispatch<A>) -> BoxFuture<'static, ()> + Send>;

/// A unit of asynchronous work.
pub struct Task<A> {
    pub(crate) key: Option<EffectKey>,
    pub(crate) scope: Option<EffectKey>,
    pub(crate) debounce: Option<Duration>,
    pub(crate) work: Work<A>,
}

impl<A> Task<A> {
    /// Dedup/cancellation key. `None` for anonymous tasks.
    pub fn key(&self) -> Option<&EffectKey> {
        self.key.as_ref()
    }

    /// Scope of the feature that owns this task.
    pub fn scope(&self) -> Option<&EffectKey> {
        self.scope.as_ref()
    }

    /// Debounce window applied before the work starts.
    pub fn debounce(&self) -> Option<Duration> {
        self.debounce
    }
}

impl<A> fmt::Debug for Task<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("key", &self.key)
            .field("scope", &self.scope)
            .field("debounce", &self.debounce)
            .finish_non_exhaustive()
    }
}

/// Description of what the store should do after a reducer ran.
pub enum Effect<A> {
    /// No asynchronous work.
    None,
    /// Dispatch an action synchronously, before the next mailbox message.
    Send(A),
    /// Spawn a task.
    Run(Task<A>),
    /// Run several effects concurrently.
    Merge(Vec<Effect<A>>),
    /// Abort tasks registered under (or nested within) a key.
    Cancel(EffectKey),
}

impl<A> Default for Effect<A> {
    fn default() -> Self {
        Self::None
    }
}

impl<A: fmt::Debug> fmt::Debug for Effect<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Send(action) => f.debug_tuple("Send").field(action).finish(),
            Self::Run(task) => f.debug_tuple("Run").field(task).finish(),
            Self::Merge(effects) => f.debug_tuple("Merge").field(effects).finish(),
            Self::Cancel(key) => f.debug_tuple("Cancel").field(key).finish(),
        }
    }
}

impl<A: Send + 'static> Effect<A> {
    /// No asynchronous work.
    pub fn none() -> Self {
        Self::None
    }

    /// Synchronous follow-up action.
    pub fn send(action: A) -> Self {
        Self::Send(action)
    }

    /// Run a fallible future and map its outcome to one completion action.
    ///
    /// Errors, including a panic inside `work`, are handed to `complete` as
    /// `Err` so the reducer can record them as a failed resource state.
    pub fn task<T, Fut, F>(work: Fut, complete: F) -> Self
    where
        T: Send + 'static,
        Fut: Future<Output = Result<T, ServiceError>> + Send + 'static,
        F: FnOnce(Result<T, ServiceError>) -> A + Send + 'static,
    {
        Self::stream(move |dispatch| async move {
            let result = match AssertUnwindSafe(work).catch_unwind().await {
                Ok(result) => result,
                Err(payload) => Err(ServiceError::from_panic(payload.as_ref())),
            };
            dispatch.send(complete(result));
        })
    }

    /// Run a future whose outcome the reducer does not need.
    pub fn fire_and_forget<Fut>(work: Fut) -> Self
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::stream(move |_| work)
    }

    /// Run a long-lived worker that may dispatch any number of actions.
    ///
    /// Used for subscriptions; the worker runs until it returns or its key
    /// (or owning scope) is cancelled.
    pub fn stream<F, Fut>(work: F) -> Self
    where
        F: FnOnce(Dispatch<A>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::Run(Task {
            key: None,
            scope: None,
            debounce: None,
            work: Box::new(move |dispatch| work(dispatch).boxed()),
        })
    }

    /// Combine effects. Empty merges collapse to [`Effect::None`].
    pub fn merge(effects: impl IntoIterator<Item = Effect<A>>) -> Self {
        let mut effects: Vec<_> = effects.into_iter().filter(|e| !e.is_none()).collect();
        match effects.len() {
            0 => Self::None,
            1 => effects.pop().unwrap_or_default(),
            _ => Self::Merge(effects),
        }
    }

    /// Abort everything registered under `key`.
    pub fn cancel(key: impl Into<EffectKey>) -> Self {
        Self::Cancel(key.into())
    }

    /// Run `first`, then synchronously dispatch actions derived from each
    /// action it produces.
    pub fn sequence<F>(first: Effect<A>, then: F) -> Self
    where
        F: Fn(&A) -> Vec<A> + Send + Sync + 'static,
    {
        let then: Arc<dyn Fn(&A) -> Vec<A> + Send + Sync> = Arc::new(then);
        first.sequence_with(&then)
    }

    fn sequence_with(self, then: &Arc<dyn Fn(&A) -> Vec<A> + Send + Sync>) -> Self {
        match self {
            Self::None => Self::None,
            Self::Send(action) => {
                let follow_ups = then(&action);
                Self::Merge(std::iter::once(action).chain(follow_ups).map(Self::Send).collect())
            },
            Self::Run(task) => {
                let then = Arc::clone(then);
                let work = task.work;
                Self::Run(Task {
                    work: Box::new(move |dispatch: Dispatch<A>| {
                        let chained = Dispatch::new(move |action: A| {
                            let follow_ups = then(&action);
                            dispatch.send(action);
                            for follow_up in follow_ups {
                                dispatch.send(follow_up);
                            }
                        });
                        work(chained)
                    }),
                    ..task
                })
            },
            Self::Merge(effects) => {
                Self::Merge(effects.into_iter().map(|e| e.sequence_with(then)).collect())
            },
            Self::Cancel(key) => Self::Cancel(key),
        }
    }

    /// Attach a dedup/cancellation key. Only affects [`Effect::Run`].
    #[must_use]
    pub fn keyed(self, key: impl Into<EffectKey>) -> Self {
        match self {
            Self::Run(mut task) => {
                task.key = Some(key.into());
                Self::Run(task)
            },
            other => other,
        }
    }

    /// Delay the work by `window`. Only affects [`Effect::Run`].
    ///
    /// Combine with [`Effect::keyed`]: a newer task with the same key arriving
    /// inside the window replaces this one.
    #[must_use]
    pub fn debounced(self, window: Duration) -> Self {
        match self {
            Self::Run(mut task) => {
                task.debounce = Some(window);
                Self::Run(task)
            },
            other => other,
        }
    }

    /// Combine with another effect.
    #[must_use]
    pub fn and(self, other: Effect<A>) -> Self {
        Self::merge([self, other])
    }

    /// Lift into a parent action type.
    pub fn map<B: Send + 'static>(self, f: impl Fn(A) -> B + Send + Sync + 'static) -> Effect<B> {
        let f: Arc<dyn Fn(A) -> B + Send + Sync> = Arc::new(f);
        self.map_with(&f)
    }

    fn map_with<B: Send + 'static>(self, f: &Arc<dyn Fn(A) -> B + Send + Sync>) -> Effect<B> {
        match self {
            Self::None => Effect::None,
            Self::Send(action) => Effect::Send(f(action)),
            Self::Run(task) => {
                let f = Arc::clone(f);
                let work = task.work;
                Effect::Run(Task {
                    key: task.key,
                    scope: task.scope,
                    debounce: task.debounce,
                    work: Box::new(move |dispatch: Dispatch<B>| {
                        work(Dispatch::new(move |action: A| dispatch.send(f(action))))
                    }),
                })
            },
            Self::Merge(effects) => {
                Effect::Merge(effects.into_iter().map(|e| e.map_with(f)).collect())
            },
            Self::Cancel(key) => Effect::Cancel(key),
        }
    }

    /// Re-root keys and scopes under an embedding feature's segment.
    #[must_use]
    pub fn scoped(self, segment: impl Into<Cow<'static, str>>) -> Self {
        self.scoped_with(&segment.into())
    }

    fn scoped_with(self, segment: &Cow<'static, str>) -> Self {
        match self {
            Self::Run(mut task) => {
                task.key = task.key.map(|k| k.within(segment.clone()));
                task.scope = Some(match task.scope {
                    Some(scope) => scope.within(segment.clone()),
                    None => EffectKey::new(segment.clone()),
                });
                Self::Run(task)
            },
            Self::Merge(effects) => {
                Self::Merge(effects.into_iter().map(|e| e.scoped_with(segment)).collect())
            },
            Self::Cancel(key) => Self::Cancel(key.within(segment.clone())),
            other @ (Self::None | Self::Send(_)) => other,
        }
    }
}

impl<A> Effect<A> {
    /// True for [`Effect::None`].
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Tasks this effect would spawn, depth first.
    pub fn tasks(&self) -> Vec<&Task<A>> {
        let mut out = Vec::new();
        self.walk(&mut |effect| {
            if let Self::Run(task) = effect {
                out.push(task);
            }
        });
        out
    }

    /// Actions this effect would dispatch synchronously, in order.
    pub fn sent(&self) -> Vec<&A> {
        let mut out = Vec::new();
        self.walk(&mut |effect| {
            if let Self::Send(action) = effect {
                out.push(action);
            }
        });
        out
    }

    /// Keys this effect would cancel.
    pub fn cancelled(&self) -> Vec<&EffectKey> {
        let mut out = Vec::new();
        self.walk(&mut |effect| {
            if let Self::Cancel(key) = effect {
                out.push(key);
            }
        });
        out
    }

    fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Self)) {
        match self {
            Self::Merge(effects) => effects.iter().for_each(|e| e.walk(visit)),
            other => visit(other),
        }
    }
}
