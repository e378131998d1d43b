//! # Mini CQRS Bus
//!
//! A minimal, in-process implementation of the command/query separation pattern.
//!
//! - A [`CommandBus`] delivers each [`Command`] to the single [`CommandHandler`] registered
//!   for its type; dispatch yields only success or failure.
//! - A [`QueryBus`] does the same for [`Query`] messages, returning the handler's typed result.
//! - Both buses thread every message through an ordered chain of [`Middleware`]s, the first
//!   registered being the outermost.
//! - An [`AggregateRoot`] buffers [`AggregateEvent`]s and exposes separately middleware-wrapped
//!   apply and commit phases, plus replay from history.
//!
//! Everything happens synchronously on the caller's thread; there is no persistence or
//! transport.
//!
//! ## Example
//!
//! ```rust
//! use mini_cqrs_bus::{Command, CommandBus, CommandHandler, LoggingMiddleware, Result};
//!
//! #[derive(Debug)]
//! struct CreateUser {
//!     username: String,
//! }
//!
//! impl Command for CreateUser {}
//!
//! struct CreateUserHandler;
//!
//! impl CommandHandler for CreateUserHandler {
//!     type Command = CreateUser;
//!
//!     fn handle(&self, command: &CreateUser) -> Result<()> {
//!         println!("creating {}", command.username);
//!         Ok(())
//!     }
//! }
//!
//! let bus = CommandBus::new();
//! bus.use_middleware(LoggingMiddleware::new("commands"));
//! bus.register_handler(CreateUserHandler)?;
//!
//! bus.dispatch(&CreateUser { username: "jane".to_string() })?;
//! # Ok::<(), mini_cqrs_bus::CqrsError>(())
//! ```

mod bus;

pub mod aggregate;
pub mod command;
pub mod context;
pub mod error;
pub mod message;
pub mod middleware;
pub mod query;
pub mod registry;

pub use aggregate::*;
pub use command::*;
pub use context::*;
pub use error::*;
pub use message::*;
pub use middleware::{
    Middleware, Next, Pipeline, cancellation::CancellationGuard, cancellation::Timeout,
    logging::LoggingMiddleware,
};
pub use query::*;
pub use registry::*;
