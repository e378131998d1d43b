use std::{
    fmt::{Debug, Formatter},
    sync::Arc,
};

use parking_lot::RwLock;

use crate::{Context, CqrsError, Middleware, Pipeline, Result};

pub mod event;

pub use event::{AggregateEvent, SharedEvent};

struct RootState {
    events: Vec<SharedEvent>,
    apply_pipeline: Pipeline<SharedEvent, ()>,
    commit_pipeline: Pipeline<SharedEvent, ()>,
}

/// The `AggregateRoot` buffers the domain events of an entity until they are committed.
///
/// Embed one in your domain entity and build it from a factory. The lifecycle is:
///
/// - [`apply`](AggregateRoot::apply) appends an event to the uncommitted buffer, after running
///   the apply middlewares, which may veto it;
/// - [`commit`](AggregateRoot::commit) runs each buffered event's side effect, oldest first and
///   exactly once, each wrapped by the commit middlewares;
/// - [`load_from_history`](AggregateRoot::load_from_history) rebuilds an entity by replaying
///   already-stored events, without buffering them.
///
/// Every operation holds the root's lock for its whole duration, so concurrent applies and
/// commits on the same root are serialized. Middlewares and event effects must therefore not
/// call back into the same root.
pub struct AggregateRoot {
    state: RwLock<RootState>,
}

impl AggregateRoot {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RootState {
                events: Vec::new(),
                apply_pipeline: Pipeline::new(),
                commit_pipeline: Pipeline::new(),
            }),
        }
    }

    pub fn apply<E: AggregateEvent + 'static>(&self, event: E) -> Result<()> {
        self.apply_with_context(&Context::background(), event)
    }

    pub fn apply_with_context<E: AggregateEvent + 'static>(
        &self,
        ctx: &Context,
        event: E,
    ) -> Result<()> {
        let event: SharedEvent = Arc::new(event);
        let mut state = self.state.write();
        let RootState {
            events,
            apply_pipeline,
            ..
        } = &mut *state;

        apply_pipeline.run(ctx, &event, |_, event| {
            events.push(Arc::clone(event));
            Ok(())
        })
    }

    /// Appends the event to the buffer, skipping the apply middlewares.
    pub fn apply_without_middleware<E: AggregateEvent + 'static>(&self, event: E) {
        self.state.write().events.push(Arc::new(event));
    }

    pub fn commit(&self) -> Result<()> {
        self.commit_with_context(&Context::background())
    }

    /// Runs the buffered events' effects in order, each through the commit middlewares.
    ///
    /// On failure the error reports the index of the failing event. Events before it have been
    /// committed and leave the buffer; the failing event and everything after it stay buffered
    /// for a later attempt.
    ///
    /// An event whose effect has run counts as committed even if a middleware then fails, so a
    /// retry never runs the same effect twice. The middleware's error is still returned.
    pub fn commit_with_context(&self, ctx: &Context) -> Result<()> {
        let mut state = self.state.write();
        let RootState {
            events,
            commit_pipeline,
            ..
        } = &mut *state;

        drain_committed(events, |event, effect_ran| {
            commit_pipeline.run(ctx, event, |_, event| {
                event.handle()?;
                *effect_ran = true;
                Ok(())
            })
        })
    }

    /// Same ordering and failure guarantees as [`commit`](AggregateRoot::commit), without
    /// middlewares.
    pub fn commit_without_middleware(&self) -> Result<()> {
        let mut state = self.state.write();

        drain_committed(&mut state.events, |event, _| Ok(event.handle()?))
    }

    /// Replays historical events in order, running their effects without buffering them.
    ///
    /// Any uncommitted event is discarded first. Replay stops at the first failing effect;
    /// effects already replayed are not undone.
    pub fn load_from_history(&self, history: &[SharedEvent]) -> Result<()> {
        let mut state = self.state.write();
        state.events.clear();

        for (index, event) in history.iter().enumerate() {
            event
                .handle()
                .map_err(|error| CqrsError::EventEffectFailed {
                    index,
                    source: Box::new(error.into()),
                })?;
        }

        Ok(())
    }

    pub fn use_middleware_for_apply<M>(&self, middleware: M)
    where
        M: Middleware<SharedEvent, ()> + 'static,
    {
        self.state.write().apply_pipeline.push(Arc::new(middleware));
    }

    pub fn use_middleware_for_commit<M>(&self, middleware: M)
    where
        M: Middleware<SharedEvent, ()> + 'static,
    {
        self.state.write().commit_pipeline.push(Arc::new(middleware));
    }

    /// A snapshot of the events applied but not yet committed, oldest first.
    pub fn uncommitted_events(&self) -> Vec<SharedEvent> {
        self.state.read().events.clone()
    }

    pub fn has_uncommitted_events(&self) -> bool {
        !self.state.read().events.is_empty()
    }
}

impl Default for AggregateRoot {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for AggregateRoot {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("AggregateRoot")
            .field("uncommitted_events", &state.events)
            .field("apply_middlewares", &state.apply_pipeline.len())
            .field("commit_middlewares", &state.commit_pipeline.len())
            .finish()
    }
}

// Runs `commit` on each event in order, stopping at the first error. An event leaves the
// buffer once `commit` has flagged its effect as run, even if `commit` then fails.
fn drain_committed<F>(events: &mut Vec<SharedEvent>, mut commit: F) -> Result<()>
where
    F: FnMut(&SharedEvent, &mut bool) -> Result<()>,
{
    let failure = events.iter().enumerate().find_map(|(index, event)| {
        let mut effect_ran = false;
        commit(event, &mut effect_ran)
            .err()
            .map(|error| (index, effect_ran, error))
    });

    match failure {
        Some((index, effect_ran, error)) => {
            events.drain(..index + usize::from(effect_ran));
            Err(CqrsError::EventEffectFailed {
                index,
                source: Box::new(error),
            })
        }
        None => {
            events.clear();
            Ok(())
        }
    }
}
