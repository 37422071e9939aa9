//! Reducers and feature composition.
//!
//! A [`Reducer`] is a pure state machine: it mutates its state in response to
//! an action and returns an [`Effect`] for the store to execute. It never
//! awaits and never performs I/O itself.
//!
//! Features form a tree. A parent owns each child's state either directly
//! (always present) or as `Option<ChildState>` (a sub-flow that opens and
//! closes). The helpers here route child actions and lift child effects:
//!
//! - [`scope`]: run a child reducer on an always-present slice of state
//! - [`scope_optional`]: same, but a no-op when the child is absent
//! - [`dismiss`]: close a sub-flow and cancel every effect scoped to it

use std::fmt;

use crate::{Effect, EffectKey};

/// Pure `(state, action) -> effect` function.
pub trait Reducer: Send + 'static {
    /// State owned by this feature.
    type State: Clone + Send + Sync + 'static;

    /// Actions this feature handles.
    type Action: fmt::Debug + Send + 'static;

    /// Apply `action` to `state` and describe the follow-up work.
    fn reduce(&self, state: &mut Self::State, action: Self::Action) -> Effect<Self::Action>;
}

/// Run a child reducer and lift its effect into the parent.
///
/// Child keys are re-rooted under `segment`, so children never collide with
/// siblings that use the same key names.
pub fn scope<R, P>(
    reducer: &R,
    state: &mut R::State,
    action: R::Action,
    segment: &'static str,
    embed: impl Fn(R::Action) -> P + Send + Sync + 'static,
) -> Effect<P>
where
    R: Reducer,
    P: Send + 'static,
{
    reducer.reduce(state, action).scoped(segment).map(embed)
}

/// Run a child reducer if its state is present.
///
/// An action addressed to an absent child is dropped. This is how late
/// results for a closed sub-flow are ignored.
pub fn scope_optional<R, P>(
    reducer: &R,
    slot: &mut Option<R::State>,
    action: R::Action,
    segment: &'static str,
    embed: impl Fn(R::Action) -> P + Send + Sync + 'static,
) -> Effect<P>
where
    R: Reducer,
    P: Send + 'static,
{
    match slot {
        Some(state) => scope(reducer, state, action, segment, embed),
        None => {
            tracing::trace!(scope = segment, ?action, "child state absent, action dropped");
            Effect::None
        },
    }
}

/// Close a sub-flow.
///
/// Clears the child state and cancels every effect the child scheduled
/// through [`scope`] or [`scope_optional`] under the same `segment`.
pub fn dismiss<S, P>(slot: &mut Option<S>, segment: &'static str) -> Effect<P>
where
    P: Send + 'static,
{
    if slot.take().is_some() { Effect::cancel(EffectKey::new(segment)) } else { Effect::None }
}
