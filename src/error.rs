use thiserror::Error;

use crate::MessageType;

#[derive(Error, Debug)]
pub enum CqrsError {
    #[error("A handler for '{0}' has already been registered")]
    AlreadyRegistered(MessageType),

    #[error("Handler declares '{declared}' but its handle method accepts '{accepted}'")]
    InvalidHandlerContract {
        declared: MessageType,
        accepted: MessageType,
    },

    #[error("No handler registered for '{0}'")]
    HandlerNotFound(MessageType),

    #[error("Handler for '{expected}' received a '{found}'")]
    MessageTypeMismatch {
        expected: MessageType,
        found: MessageType,
    },

    #[error("Query result is not a '{expected}'")]
    ResultTypeMismatch { expected: &'static str },

    #[error("Event at index {index} failed to take effect: {source}")]
    EventEffectFailed {
        index: usize,
        #[source]
        source: Box<CqrsError>,
    },

    #[error("Context cancelled")]
    Cancelled,

    #[error("Context deadline exceeded")]
    DeadlineExceeded,

    // Anything raised by handlers, middlewares or event effects.
    #[error("Generic CQRS error: {0}")]
    Generic(#[from] anyhow::Error),
}

// Result alias within the library
pub type Result<T, E = CqrsError> = std::result::Result<T, E>;
