//! Domain error types.

use thiserror::Error;

use crate::reservation::ReservationStatus;

/// Errors raised by domain rules.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    /// Taking one more book would exceed the user's star count.
    #[error("reservations over limit: {active} active with {stars} stars")]
    QuotaExceeded { active: usize, stars: u32 },

    /// The requested status change is not allowed.
    #[error("invalid reservation status transition: {from} -> {to}")]
    InvalidStatusTransition {
        from: ReservationStatus,
        to: ReservationStatus,
    },
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;
