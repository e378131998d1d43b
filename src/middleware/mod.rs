use std::sync::Arc;

use crate::{Context, Result};

pub mod cancellation;
pub mod logging;

/// The `Middleware` trait defines a cross-cutting unit wrapped around a terminal operation:
/// a bus handler, the append performed by [`AggregateRoot::apply`](crate::AggregateRoot::apply)
/// or the effect run by [`AggregateRoot::commit`](crate::AggregateRoot::commit).
///
/// A middleware either calls [`Next::run`] to continue down the chain, possibly doing work
/// before and after it, or returns without calling it to short-circuit the pipeline. `Next` is
/// consumed by `run`, so the rest of the chain executes at most once per invocation.
///
/// `M` is the message type flowing through the pipeline (`dyn Message` for the buses,
/// [`SharedEvent`](crate::SharedEvent) for the aggregate root) and `R` the value it produces.
///
/// ## Example
///
/// ```rust
/// use mini_cqrs_bus::{Context, Message, Middleware, Next, Result};
///
/// struct Audit;
///
/// impl Middleware<dyn Message, ()> for Audit {
///     fn execute(
///         &self,
///         ctx: &Context,
///         message: &dyn Message,
///         next: Next<'_, dyn Message, ()>,
///     ) -> Result<()> {
///         println!("-> {}", message.message_type());
///         let result = next.run(ctx, message);
///         println!("<- {}", message.message_type());
///         result
///     }
/// }
/// ```
pub trait Middleware<M: ?Sized, R>: Send + Sync {
    fn execute(&self, ctx: &Context, message: &M, next: Next<'_, M, R>) -> Result<R>;
}

/// The continuation handed to a [`Middleware`]: the remaining middlewares plus the terminal
/// operation.
pub struct Next<'a, M: ?Sized, R> {
    chain: &'a [Arc<dyn Middleware<M, R>>],
    terminal: &'a mut (dyn FnMut(&Context, &M) -> Result<R> + 'a),
}

impl<M: ?Sized, R> Next<'_, M, R> {
    pub fn run(self, ctx: &Context, message: &M) -> Result<R> {
        let Next { chain, terminal } = self;

        match chain.split_first() {
            Some((head, rest)) => head.execute(
                ctx,
                message,
                Next {
                    chain: rest,
                    terminal,
                },
            ),
            None => terminal(ctx, message),
        }
    }
}

/// An ordered list of middlewares.
///
/// The first middleware added is the outermost one: it runs first on the way in and last on
/// the way out.
pub struct Pipeline<M: ?Sized, R> {
    middlewares: Vec<Arc<dyn Middleware<M, R>>>,
}

impl<M: ?Sized, R> Pipeline<M, R> {
    pub fn new() -> Self {
        Self {
            middlewares: Vec::new(),
        }
    }

    pub fn push(&mut self, middleware: Arc<dyn Middleware<M, R>>) {
        self.middlewares.push(middleware);
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Threads `message` through every middleware and finally into `terminal`.
    pub fn run<F>(&self, ctx: &Context, message: &M, mut terminal: F) -> Result<R>
    where
        F: FnMut(&Context, &M) -> Result<R>,
    {
        Next {
            chain: &self.middlewares,
            terminal: &mut terminal,
        }
        .run(ctx, message)
    }
}

impl<M: ?Sized, R> Clone for Pipeline<M, R> {
    fn clone(&self) -> Self {
        Self {
            middlewares: self.middlewares.clone(),
        }
    }
}

impl<M: ?Sized, R> Default for Pipeline<M, R> {
    fn default() -> Self {
        Self::new()
    }
}
