//! Response bodies assembled by the sagas.

use chrono::NaiveDate;
use common::{BookUid, LibraryUid, ReservationUid};
use domain::{Book, Library, Reservation, ReservationStatus};
use serde::Serialize;

/// `{"stars": n}`, as embedded in reservation responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StarsView {
    pub stars: u32,
}

/// A created reservation with bare book and library identifiers.
///
/// Returned when enrichment is unavailable or the saga was deferred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationSummary {
    pub reservation_uid: ReservationUid,
    pub status: ReservationStatus,
    pub start_date: NaiveDate,
    pub till_date: NaiveDate,
    pub book_uid: BookUid,
    pub library_uid: LibraryUid,
    pub rating: StarsView,
}

impl ReservationSummary {
    pub fn new(reservation: &Reservation, stars: u32) -> Self {
        Self {
            reservation_uid: reservation.reservation_uid,
            status: reservation.status,
            start_date: reservation.start_date,
            till_date: reservation.till_date,
            book_uid: reservation.book_uid,
            library_uid: reservation.library_uid,
            rating: StarsView { stars },
        }
    }
}

/// A created reservation with full book and library details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationDetails {
    pub reservation_uid: ReservationUid,
    pub status: ReservationStatus,
    pub start_date: NaiveDate,
    pub till_date: NaiveDate,
    pub book: Book,
    pub library: Library,
    pub rating: StarsView,
}

/// One entry of a user's enriched reservation list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationEntry {
    pub reservation_uid: ReservationUid,
    pub status: ReservationStatus,
    pub start_date: NaiveDate,
    pub till_date: NaiveDate,
    pub book: Book,
    pub library: Library,
}

impl ReservationEntry {
    pub fn new(reservation: &Reservation, book: Book, library: Library) -> Self {
        Self {
            reservation_uid: reservation.reservation_uid,
            status: reservation.status,
            start_date: reservation.start_date,
            till_date: reservation.till_date,
            book,
            library,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_wire_shape() {
        let reservation = Reservation {
            reservation_uid: ReservationUid::new(),
            status: ReservationStatus::Rented,
            start_date: NaiveDate::from_ymd_opt(2021, 10, 1).unwrap(),
            till_date: NaiveDate::from_ymd_opt(2021, 10, 11).unwrap(),
            book_uid: BookUid::new(),
            library_uid: LibraryUid::new(),
        };
        let json = serde_json::to_value(ReservationSummary::new(&reservation, 75)).unwrap();

        assert_eq!(json["status"], "RENTED");
        assert_eq!(json["tillDate"], "2021-10-11");
        assert_eq!(json["bookUid"], reservation.book_uid.to_string());
        assert_eq!(json["rating"], serde_json::json!({ "stars": 75 }));
    }
}
