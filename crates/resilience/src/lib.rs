//! Resilience primitives for calls to backend services.
//!
//! - [`CircuitBreaker`] fails fast once an operation keeps failing, and
//!   [`CircuitBreakerRegistry`] holds one breaker per guarded operation.
//! - [`RetryScheduler`] and [`RetryWorker`] replay captured requests
//!   ([`RequestSnapshot`]) after a cooldown until they succeed.

pub mod breaker;
pub mod error;
pub mod registry;
pub mod scheduler;
pub mod snapshot;

pub use breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitState, DEFAULT_MAX_FAILURES,
    DEFAULT_RESET_TIMEOUT,
};
pub use error::{CircuitError, ReplayError, SchedulerError};
pub use registry::CircuitBreakerRegistry;
pub use scheduler::{
    DEFAULT_COOLDOWN, ReplayHandler, RetryConfig, RetryScheduler, RetryTask, RetryWorker,
};
pub use snapshot::RequestSnapshot;
