//! Resilience error types.

use thiserror::Error;

/// Result of a call made through a [`CircuitBreaker`](crate::CircuitBreaker).
#[derive(Debug, Error)]
pub enum CircuitError<E> {
    /// The breaker is open; the wrapped call was not attempted.
    #[error("circuit breaker '{name}' is open")]
    Open { name: &'static str },

    /// The wrapped call ran and failed.
    #[error(transparent)]
    Inner(E),
}

impl<E> CircuitError<E> {
    /// Returns true if the call was rejected by an open breaker.
    pub fn is_open(&self) -> bool {
        matches!(self, CircuitError::Open { .. })
    }
}

/// Errors returned when handing work to the retry scheduler.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    /// The background worker has stopped and no longer accepts tasks.
    #[error("retry worker is no longer running")]
    Closed,
}

/// A replay that could not produce a response at all.
#[derive(Debug, Error)]
#[error("replay of {handler} failed: {reason}")]
pub struct ReplayError {
    pub handler: &'static str,
    pub reason: String,
}

impl ReplayError {
    /// Creates a replay error for the named handler.
    pub fn new(handler: &'static str, reason: impl Into<String>) -> Self {
        Self {
            handler,
            reason: reason.into(),
        }
    }
}
