use std::{
    any::{Any, type_name},
    sync::{Arc, OnceLock},
};

use crate::{
    Context, CqrsError, Message, MessageType, Middleware, Result,
    bus::{Bus, route},
};

/// The value flowing back through query middlewares. Typed dispatch downcasts it to the
/// query's `Output`.
pub type QueryResult = Box<dyn Any + Send>;

/// The `Query` trait marks a message expressing an intent to read state, together with the
/// type of the value it produces.
///
/// ## Example
///
/// ```rust
/// use mini_cqrs_bus::Query;
///
/// #[derive(Debug)]
/// struct GetUserById {
///     id: u64,
/// }
///
/// impl Query for GetUserById {
///     type Output = Option<String>;
/// }
/// ```
pub trait Query: Message {
    type Output: Send + 'static;
}

/// The `QueryHandler` trait binds a handler to the one query type it answers.
///
/// As with [`CommandHandler`](crate::CommandHandler), `declared_type` is the runtime routing tag
/// and must agree with `Self::Query` for registration to succeed.
pub trait QueryHandler: Send + Sync + 'static {
    type Query: Query;

    fn handle(&self, query: &Self::Query) -> Result<<Self::Query as Query>::Output>;

    fn declared_type(&self) -> MessageType {
        MessageType::of::<Self::Query>()
    }
}

/// Routes each query to exactly one [`QueryHandler`] and returns its result.
///
/// Middlewares see the result as an opaque [`QueryResult`], so a caching middleware can answer
/// without reaching the handler. If what comes back is not the query's `Output`,
/// [`dispatch`](QueryBus::dispatch) fails with
/// [`ResultTypeMismatch`](CqrsError::ResultTypeMismatch).
#[derive(Clone)]
pub struct QueryBus {
    inner: Arc<Bus<QueryResult>>,
}

impl QueryBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Bus::new()),
        }
    }

    /// The process-wide query bus, created on first access.
    pub fn global() -> &'static QueryBus {
        static GLOBAL: OnceLock<QueryBus> = OnceLock::new();
        GLOBAL.get_or_init(QueryBus::new)
    }

    pub fn register_handler<H: QueryHandler>(&self, handler: H) -> Result<()> {
        let declared = handler.declared_type();
        let accepted = MessageType::of::<H::Query>();

        self.inner.register(
            declared,
            accepted,
            route(move |query: &H::Query| {
                let output = handler.handle(query)?;
                Ok(Box::new(output) as QueryResult)
            }),
        )
    }

    /// Appends a middleware; it wraps every dispatch that starts after this call.
    pub fn use_middleware<M>(&self, middleware: M)
    where
        M: Middleware<dyn Message, QueryResult> + 'static,
    {
        self.inner.use_middleware(Arc::new(middleware));
    }

    pub fn dispatch<Q: Query>(&self, query: &Q) -> Result<Q::Output> {
        self.dispatch_with_context(&Context::background(), query)
    }

    pub fn dispatch_with_context<Q: Query>(&self, ctx: &Context, query: &Q) -> Result<Q::Output> {
        downcast::<Q>(self.inner.dispatch(ctx, query)?)
    }

    /// Calls the handler directly, skipping every middleware.
    pub fn dispatch_without_middleware<Q: Query>(&self, query: &Q) -> Result<Q::Output> {
        downcast::<Q>(self.inner.dispatch_without_middleware(query)?)
    }

    pub fn handles<Q: Query>(&self) -> bool {
        self.inner.handles(&MessageType::of::<Q>())
    }

    pub fn handler_count(&self) -> usize {
        self.inner.handler_count()
    }
}

impl Default for QueryBus {
    fn default() -> Self {
        Self::new()
    }
}

fn downcast<Q: Query>(result: QueryResult) -> Result<Q::Output> {
    result
        .downcast::<Q::Output>()
        .map(|output| *output)
        .map_err(|_| CqrsError::ResultTypeMismatch {
            expected: type_name::<Q::Output>(),
        })
}
