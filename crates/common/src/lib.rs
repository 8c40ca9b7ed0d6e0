//! Identifier types shared by every gateway crate.

pub mod types;

pub use types::{BookUid, LibraryUid, ReservationUid, USER_NAME_HEADER, UserName};
