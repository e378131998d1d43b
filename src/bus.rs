use std::sync::Arc;

use parking_lot::RwLock;

use crate::{Context, CqrsError, Message, MessageType, Middleware, Pipeline, Registry, Result};

/// A type-erased handler: receives any message and produces the bus result.
pub(crate) type Route<R> = Arc<dyn Fn(&dyn Message) -> Result<R> + Send + Sync>;

struct BusState<R> {
    routes: Registry<Route<R>>,
    pipeline: Pipeline<dyn Message, R>,
}

/// The engine shared by [`CommandBus`](crate::CommandBus) and [`QueryBus`](crate::QueryBus),
/// which differ only in `R`.
///
/// Registration and middleware changes take the write lock. Dispatch holds the read lock just
/// long enough to pick the route and snapshot the middlewares, so handlers run unlocked and may
/// dispatch through the same bus.
pub(crate) struct Bus<R> {
    state: RwLock<BusState<R>>,
}

impl<R: 'static> Bus<R> {
    pub(crate) fn new() -> Self {
        Self {
            state: RwLock::new(BusState {
                routes: Registry::new(),
                pipeline: Pipeline::new(),
            }),
        }
    }

    /// `declared` is what the handler says it handles, `accepted` what its `handle` takes.
    pub(crate) fn register(
        &self,
        declared: MessageType,
        accepted: MessageType,
        route: Route<R>,
    ) -> Result<()> {
        self.state.write().routes.insert_with(declared, || {
            if declared != accepted {
                return Err(CqrsError::InvalidHandlerContract { declared, accepted });
            }
            Ok(route)
        })
    }

    pub(crate) fn use_middleware(&self, middleware: Arc<dyn Middleware<dyn Message, R>>) {
        self.state.write().pipeline.push(middleware);
    }

    pub(crate) fn handles(&self, message_type: &MessageType) -> bool {
        self.state.read().routes.contains(message_type)
    }

    pub(crate) fn handler_count(&self) -> usize {
        self.state.read().routes.len()
    }

    pub(crate) fn dispatch(&self, ctx: &Context, message: &dyn Message) -> Result<R> {
        let (route, pipeline) = {
            let state = self.state.read();
            let route = Self::route_in(&state, message)?;
            (route, state.pipeline.clone())
        };

        pipeline.run(ctx, message, |_, message| route(message))
    }

    pub(crate) fn dispatch_without_middleware(&self, message: &dyn Message) -> Result<R> {
        let route = Self::route_in(&self.state.read(), message)?;

        route(message)
    }

    fn route_in(state: &BusState<R>, message: &dyn Message) -> Result<Route<R>> {
        let message_type = message.message_type();

        state
            .routes
            .get(&message_type)
            .cloned()
            .ok_or(CqrsError::HandlerNotFound(message_type))
    }
}

/// Wraps a typed handler call so it can be stored as a [`Route`].
pub(crate) fn route<M, R, F>(handle: F) -> Route<R>
where
    M: Message,
    F: Fn(&M) -> Result<R> + Send + Sync + 'static,
{
    Arc::new(move |message: &dyn Message| {
        let typed = message
            .downcast_ref::<M>()
            .ok_or_else(|| CqrsError::MessageTypeMismatch {
                expected: MessageType::of::<M>(),
                found: message.message_type(),
            })?;

        handle(typed)
    })
}
