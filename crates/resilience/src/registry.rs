//! Breakers keyed by operation, built once at startup.

use std::collections::HashMap;

use crate::breaker::{CircuitBreaker, CircuitBreakerConfig};

/// A fixed set of circuit breakers, one per guarded operation.
///
/// The set of keys is decided at construction; the registry is then shared
/// read-only and each breaker carries its own lock.
#[derive(Debug, Clone, Default)]
pub struct CircuitBreakerRegistry {
    breakers: HashMap<&'static str, CircuitBreaker>,
}

impl CircuitBreakerRegistry {
    /// Creates one breaker per key, all with the same configuration.
    pub fn new(config: CircuitBreakerConfig, keys: impl IntoIterator<Item = &'static str>) -> Self {
        let breakers = keys
            .into_iter()
            .map(|key| (key, CircuitBreaker::new(key, config)))
            .collect();
        Self { breakers }
    }

    /// Returns the breaker guarding `key`.
    pub fn get(&self, key: &str) -> Option<&CircuitBreaker> {
        self.breakers.get(key)
    }

    /// Returns all registered keys, sorted.
    pub fn keys(&self) -> Vec<&'static str> {
        let mut keys: Vec<_> = self.breakers.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    /// Returns the number of breakers.
    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    /// Returns true if no breakers are registered.
    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }
}
