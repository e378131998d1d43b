use std::sync::{Arc, OnceLock};

use crate::{
    Context, Message, MessageType, Middleware, Result,
    bus::{Bus, route},
};

/// The `Command` trait marks a message expressing an intent to change state.
///
/// Dispatching a command yields only success or failure. Commands are routed by their concrete
/// type, so each command type gets its own struct.
///
/// ## Example
///
/// ```rust
/// use mini_cqrs_bus::Command;
///
/// #[derive(Debug)]
/// struct DeleteUser {
///     id: u64,
/// }
///
/// impl Command for DeleteUser {}
/// ```
pub trait Command: Message {}

/// The `CommandHandler` trait binds a handler to the one command type it executes.
///
/// The parameter and result shapes are checked by the compiler. `declared_type` is the runtime
/// tag the bus routes on; it defaults to `Self::Command` and overriding it with anything else
/// makes [`CommandBus::register_handler`] fail with
/// [`InvalidHandlerContract`](crate::CqrsError::InvalidHandlerContract).
pub trait CommandHandler: Send + Sync + 'static {
    /// The command this handler executes.
    type Command: Command;

    fn handle(&self, command: &Self::Command) -> Result<()>;

    fn declared_type(&self) -> MessageType {
        MessageType::of::<Self::Command>()
    }
}

/// Routes each command to exactly one [`CommandHandler`], through an ordered chain of
/// middlewares.
///
/// `CommandBus` is a cheap handle: clones share the same handlers and middlewares, which lets
/// a handler keep a clone around to dispatch further commands. Build one per application in the
/// composition root, or use [`CommandBus::global`] where a shared default is more convenient.
#[derive(Clone)]
pub struct CommandBus {
    inner: Arc<Bus<()>>,
}

impl CommandBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Bus::new()),
        }
    }

    /// The process-wide command bus, created on first access.
    pub fn global() -> &'static CommandBus {
        static GLOBAL: OnceLock<CommandBus> = OnceLock::new();
        GLOBAL.get_or_init(CommandBus::new)
    }

    pub fn register_handler<H: CommandHandler>(&self, handler: H) -> Result<()> {
        let declared = handler.declared_type();
        let accepted = MessageType::of::<H::Command>();

        self.inner.register(
            declared,
            accepted,
            route(move |command: &H::Command| handler.handle(command)),
        )
    }

    /// Appends a middleware; it wraps every dispatch that starts after this call.
    pub fn use_middleware<M>(&self, middleware: M)
    where
        M: Middleware<dyn Message, ()> + 'static,
    {
        self.inner.use_middleware(Arc::new(middleware));
    }

    pub fn dispatch(&self, command: &dyn Command) -> Result<()> {
        self.dispatch_with_context(&Context::background(), command)
    }

    pub fn dispatch_with_context(&self, ctx: &Context, command: &dyn Command) -> Result<()> {
        self.inner.dispatch(ctx, command)
    }

    /// Calls the handler directly, skipping every middleware.
    pub fn dispatch_without_middleware(&self, command: &dyn Command) -> Result<()> {
        self.inner.dispatch_without_middleware(command)
    }

    pub fn handles<C: Command>(&self) -> bool {
        self.inner.handles(&MessageType::of::<C>())
    }

    pub fn handler_count(&self) -> usize {
        self.inner.handler_count()
    }
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}
