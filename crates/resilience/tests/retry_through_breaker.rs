use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use http::StatusCode;
use resilience::{
    CircuitBreaker, CircuitBreakerConfig, CircuitError, CircuitState, ReplayError, ReplayHandler,
    RequestSnapshot, RetryConfig, RetryScheduler,
};

/// Replays through a breaker in front of a backend that can be switched off.
struct GuardedReplay {
    breaker: CircuitBreaker,
    backend_up: Arc<AtomicBool>,
    backend_calls: Arc<AtomicUsize>,
}

#[async_trait]
impl ReplayHandler for GuardedReplay {
    fn name(&self) -> &'static str {
        "guarded"
    }

    async fn replay(&self, _request: &RequestSnapshot) -> Result<StatusCode, ReplayError> {
        let result = self
            .breaker
            .call(|| async {
                self.backend_calls.fetch_add(1, Ordering::SeqCst);
                if self.backend_up.load(Ordering::SeqCst) {
                    Ok(StatusCode::NO_CONTENT)
                } else {
                    Err("connection refused")
                }
            })
            .await;

        match result {
            Ok(status) => Ok(status),
            Err(CircuitError::Open { name }) => Err(ReplayError::new("guarded", name)),
            Err(CircuitError::Inner(reason)) => Err(ReplayError::new("guarded", reason)),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_replays_wait_out_an_open_breaker() {
    let breaker = CircuitBreaker::new(
        "backend.update",
        CircuitBreakerConfig {
            max_failures: 2,
            reset_timeout: Duration::from_secs(10),
        },
    );
    let backend_up = Arc::new(AtomicBool::new(false));
    let backend_calls = Arc::new(AtomicUsize::new(0));
    let handler = Arc::new(GuardedReplay {
        breaker: breaker.clone(),
        backend_up: backend_up.clone(),
        backend_calls: backend_calls.clone(),
    });

    let (scheduler, worker) = RetryScheduler::new(RetryConfig {
        cooldown: Duration::from_secs(2),
    });
    worker.spawn();
    scheduler
        .schedule_after_cooldown(handler, RequestSnapshot::new("PUT", "/books", "max"))
        .unwrap();

    // Replays at 2s and 4s reach the backend and trip the breaker.
    tokio::time::sleep(Duration::from_millis(4001)).await;
    assert_eq!(backend_calls.load(Ordering::SeqCst), 2);
    assert_eq!(breaker.state(), CircuitState::Open);

    // Replays while open are rejected without touching the backend.
    tokio::time::sleep(Duration::from_secs(8)).await;
    assert_eq!(backend_calls.load(Ordering::SeqCst), 2);
    assert_eq!(scheduler.pending(), 1);

    backend_up.store(true, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(4)).await;

    assert_eq!(backend_calls.load(Ordering::SeqCst), 3);
    assert_eq!(breaker.state(), CircuitState::Closed);
    assert_eq!(scheduler.pending(), 0);
}
