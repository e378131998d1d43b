use std::{
    fmt::Debug,
    time::{Duration, Instant},
};

use crate::{Context, Middleware, Next, Result};

/// Logs every message entering the pipeline and the outcome of the rest of the chain.
///
/// Works with any pipeline whose message is `Debug`: both buses, and the apply/commit phases of
/// an aggregate root. Register it first to have it observe the whole chain.
#[derive(Clone, Debug)]
pub struct LoggingMiddleware {
    pipeline: &'static str,
}

impl LoggingMiddleware {
    pub fn new(pipeline: &'static str) -> Self {
        Self { pipeline }
    }
}

impl<M, R> Middleware<M, R> for LoggingMiddleware
where
    M: ?Sized + Debug,
{
    fn execute(&self, ctx: &Context, message: &M, next: Next<'_, M, R>) -> Result<R> {
        let started = Instant::now();
        tracing::debug!(pipeline = self.pipeline, payload = ?message, "processing message");

        let result = next.run(ctx, message);
        let elapsed_us = micros(started.elapsed());

        match &result {
            Ok(_) => tracing::debug!(pipeline = self.pipeline, elapsed_us, "message processed"),
            Err(error) => tracing::warn!(
                pipeline = self.pipeline,
                elapsed_us,
                %error,
                payload = ?message,
                "message failed"
            ),
        }

        result
    }
}

// Saturates instead of truncating durations too long for a u64.
fn micros(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX)
}
