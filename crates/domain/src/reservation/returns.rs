//! Evaluation of a returned book.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::status::ReservationStatus;

/// Star adjustment for a book returned after its due date.
pub const LATE_RETURN_PENALTY: i32 = -10;

/// Star adjustment applied when nothing else changed the rating.
pub const ON_TIME_RETURN_BONUS: i32 = 1;

/// Physical condition of a returned book, ordered from worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookCondition {
    Bad,
    Good,
    Excellent,
}

/// Body of a return request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnBook {
    pub condition: BookCondition,
    /// Day the book was handed back.
    pub date: NaiveDate,
}

/// What a return does to the reservation and to the reader's rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReturnOutcome {
    pub late: bool,
    pub status: ReservationStatus,
    pub star_delta: i32,
}

impl ReturnOutcome {
    /// Evaluates a return on `returned_on` against the `due` date.
    ///
    /// Returning on the due date is on time. A delta that sums to zero is
    /// bumped to [`ON_TIME_RETURN_BONUS`], so the rating always moves.
    pub fn evaluate(due: NaiveDate, returned_on: NaiveDate) -> Self {
        let late = returned_on > due;
        let mut star_delta = 0;
        let status = if late {
            star_delta += LATE_RETURN_PENALTY;
            ReservationStatus::Expired
        } else {
            ReservationStatus::Returned
        };

        if star_delta == 0 {
            star_delta = ON_TIME_RETURN_BONUS;
        }

        Self {
            late,
            status,
            star_delta,
        }
    }
}
