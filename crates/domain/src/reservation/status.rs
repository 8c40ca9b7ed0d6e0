//! Reservation status state machine.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};

/// The status of a reservation.
///
/// State transitions:
/// ```text
/// Rented ──┬──► Returned
///          └──► Expired
///
/// Returned / Expired ──► Rented   (compensation only)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    /// The book is with the reader.
    #[default]
    Rented,

    /// The book came back late (terminal state).
    Expired,

    /// The book came back on time (terminal state).
    Returned,
}

impl ReservationStatus {
    /// Returns true if a forward transition to `to` is allowed.
    pub fn can_transition_to(&self, to: ReservationStatus) -> bool {
        matches!(
            (self, to),
            (
                ReservationStatus::Rented,
                ReservationStatus::Returned | ReservationStatus::Expired
            )
        )
    }

    /// Validates a forward transition to `to`.
    pub fn transition_to(self, to: ReservationStatus) -> Result<ReservationStatus> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(DomainError::InvalidStatusTransition { from: self, to })
        }
    }

    /// Returns the wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Rented => "RENTED",
            ReservationStatus::Expired => "EXPIRED",
            ReservationStatus::Returned => "RETURNED",
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
