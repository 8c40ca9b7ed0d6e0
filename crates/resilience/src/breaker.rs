//! Consecutive-failure circuit breaker.
//!
//! A breaker guards one outbound operation. It trips OPEN once the failure
//! counter reaches `max_failures`, and a one-shot timer moves it to HALF_OPEN
//! after `reset_timeout`. HALF_OPEN lets every call through; the first success
//! closes the breaker and the first failure trips it again.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::task::AbortHandle;

use crate::error::CircuitError;

/// Default number of failures that trips a breaker.
pub const DEFAULT_MAX_FAILURES: u32 = 5;

/// Default time a tripped breaker stays OPEN.
pub const DEFAULT_RESET_TIMEOUT: Duration = Duration::from_secs(10);

/// State of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    /// Returns the state as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trip threshold and cooldown shared by every breaker in a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    pub max_failures: u32,
    pub reset_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            max_failures: DEFAULT_MAX_FAILURES,
            reset_timeout: DEFAULT_RESET_TIMEOUT,
        }
    }
}

#[derive(Debug)]
struct Circuit {
    state: CircuitState,
    failures: u32,
    /// Bumped on every trip and reset; a cooldown timer only acts on the
    /// generation it was started for.
    generation: u64,
    timer: Option<AbortHandle>,
}

#[derive(Debug)]
struct Shared {
    name: &'static str,
    config: CircuitBreakerConfig,
    circuit: Mutex<Circuit>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Circuit> {
        self.circuit.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn half_open(&self, generation: u64) {
        let mut circuit = self.lock();
        if circuit.generation == generation && circuit.state == CircuitState::Open {
            circuit.state = CircuitState::HalfOpen;
            circuit.timer = None;
        }
    }
}

/// A named circuit breaker. Cloning yields another handle to the same state.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    shared: Arc<Shared>,
}

impl CircuitBreaker {
    /// Creates a CLOSED breaker.
    pub fn new(name: &'static str, config: CircuitBreakerConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                name,
                config,
                circuit: Mutex::new(Circuit {
                    state: CircuitState::Closed,
                    failures: 0,
                    generation: 0,
                    timer: None,
                }),
            }),
        }
    }

    /// Returns the breaker's name.
    pub fn name(&self) -> &'static str {
        self.shared.name
    }

    /// Returns the current state.
    pub fn state(&self) -> CircuitState {
        self.shared.lock().state
    }

    /// Returns the current failure count.
    pub fn failure_count(&self) -> u32 {
        self.shared.lock().failures
    }

    /// Runs `op` through the breaker, counting every `Err` as a failure.
    pub async fn call<T, E, F, Fut>(&self, op: F) -> Result<T, CircuitError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.call_classified(|result: &Result<T, E>| result.is_err(), op)
            .await
    }

    /// Runs `op` through the breaker, counting only results for which
    /// `is_failure` returns true.
    ///
    /// An `Err` that is not classified as a failure still reaches the caller
    /// but counts as a success for the breaker.
    pub async fn call_classified<T, E, C, F, Fut>(
        &self,
        is_failure: C,
        op: F,
    ) -> Result<T, CircuitError<E>>
    where
        C: FnOnce(&Result<T, E>) -> bool,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if self.state() == CircuitState::Open {
            metrics::counter!("circuit_breaker_rejections_total", "breaker" => self.name())
                .increment(1);
            return Err(CircuitError::Open { name: self.name() });
        }

        let result = op().await;
        if is_failure(&result) {
            self.record_failure();
        } else {
            self.record_success();
        }
        result.map_err(CircuitError::Inner)
    }

    fn record_success(&self) {
        let mut circuit = self.shared.lock();
        // A call that started before the trip does not close the breaker.
        if circuit.state == CircuitState::Open {
            return;
        }
        circuit.failures = 0;
        circuit.state = CircuitState::Closed;
        if let Some(timer) = circuit.timer.take() {
            timer.abort();
            circuit.generation += 1;
        }
    }

    fn record_failure(&self) {
        let mut circuit = self.shared.lock();
        if circuit.state == CircuitState::Open {
            return;
        }
        circuit.failures = circuit.failures.saturating_add(1);
        if circuit.failures >= self.shared.config.max_failures {
            self.trip(&mut circuit);
        }
    }

    fn trip(&self, circuit: &mut Circuit) {
        circuit.state = CircuitState::Open;
        circuit.generation += 1;
        if let Some(stale) = circuit.timer.take() {
            stale.abort();
        }

        let shared: Weak<Shared> = Arc::downgrade(&self.shared);
        let generation = circuit.generation;
        let cooldown = self.shared.config.reset_timeout;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(cooldown).await;
            if let Some(shared) = shared.upgrade() {
                shared.half_open(generation);
            }
        });
        circuit.timer = Some(timer.abort_handle());

        metrics::counter!("circuit_breaker_trips_total", "breaker" => self.name()).increment(1);
    }
}
