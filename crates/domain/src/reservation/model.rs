//! Reservation records as exchanged with the reservation service.

use chrono::NaiveDate;
use common::{BookUid, LibraryUid, ReservationUid};
use serde::{Deserialize, Serialize};

use super::status::ReservationStatus;

/// A reservation of one book from one library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub reservation_uid: ReservationUid,
    pub status: ReservationStatus,
    pub start_date: NaiveDate,
    /// Due date.
    pub till_date: NaiveDate,
    pub book_uid: BookUid,
    pub library_uid: LibraryUid,
}

impl Reservation {
    /// Returns true if the book is still with the reader.
    pub fn is_active(&self) -> bool {
        self.status == ReservationStatus::Rented
    }
}

/// Body of a reservation request, forwarded to the reservation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservation {
    pub book_uid: BookUid,
    pub library_uid: LibraryUid,
    pub till_date: NaiveDate,
}
