use std::{fmt::Debug, sync::Arc};

/// The `AggregateEvent` trait defines a domain event buffered by an
/// [`AggregateRoot`](crate::AggregateRoot).
///
/// An event knows how to perform its own side effect (update a read model, write to a log,
/// persist a record...). The effect runs when the event is committed or replayed from history,
/// never when it is applied.
pub trait AggregateEvent: Debug + Send + Sync {
    /// Performs the event's side effect.
    fn handle(&self) -> anyhow::Result<()>;
}

/// How events are held by an aggregate root and passed to its middlewares.
pub type SharedEvent = Arc<dyn AggregateEvent>;
