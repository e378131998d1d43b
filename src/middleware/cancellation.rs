use std::time::Duration;

use crate::{Context, Middleware, Next, Result};

/// Refuses to go further down the chain once the [`Context`] is cancelled or expired.
#[derive(Clone, Copy, Debug, Default)]
pub struct CancellationGuard;

impl<M: ?Sized, R> Middleware<M, R> for CancellationGuard {
    fn execute(&self, ctx: &Context, message: &M, next: Next<'_, M, R>) -> Result<R> {
        ctx.check()?;
        next.run(ctx, message)
    }
}

/// Gives the rest of the chain a bounded amount of time.
///
/// The remaining middlewares see a context whose deadline is at most `timeout` from now. Nothing
/// is interrupted: a later [`CancellationGuard`], or a middleware checking the context itself,
/// is what turns the deadline into an error.
#[derive(Clone, Copy, Debug)]
pub struct Timeout(pub Duration);

impl<M: ?Sized, R> Middleware<M, R> for Timeout {
    fn execute(&self, ctx: &Context, message: &M, next: Next<'_, M, R>) -> Result<R> {
        let ctx = ctx.with_timeout(self.0);
        next.run(&ctx, message)
    }
}
