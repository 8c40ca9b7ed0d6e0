//! Domain model for the library gateway.
//!
//! The gateway stores nothing itself; these types describe what it reads from
//! and writes to the catalog, reservation and rating services, plus the rules
//! it applies between those calls:
//! - [`ReservationStatus`] transitions (RENTED → RETURNED | EXPIRED, with a
//!   compensating revert back to RENTED)
//! - the reservation quota ([`check_quota`])
//! - the return evaluation ([`ReturnOutcome`])

pub mod catalog;
pub mod error;
pub mod rating;
pub mod reservation;

pub use catalog::{Book, Library};
pub use error::{DomainError, Result};
pub use rating::{Rating, check_quota};
pub use reservation::{
    BookCondition, CreateReservation, LATE_RETURN_PENALTY, ON_TIME_RETURN_BONUS, Reservation,
    ReservationStatus, ReturnBook, ReturnOutcome,
};
