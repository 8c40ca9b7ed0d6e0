//! Reservations and the rules for taking and returning books.

mod model;
mod returns;
mod status;

pub use model::{CreateReservation, Reservation};
pub use returns::{BookCondition, LATE_RETURN_PENALTY, ON_TIME_RETURN_BONUS, ReturnBook, ReturnOutcome};
pub use status::ReservationStatus;
