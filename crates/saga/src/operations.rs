//! Names of guarded operations and saga steps.
//!
//! Breaker keys identify one (dependency, operation) pair each. Step names
//! label log events, metrics and errors.

/// Catalog: fetch books by uid batch.
pub const FETCH_BOOKS_BY_UIDS: &str = "catalog.books_by_uids";

/// Catalog: fetch libraries by uid batch.
pub const FETCH_LIBRARIES_BY_UIDS: &str = "catalog.libraries_by_uids";

/// Catalog: list libraries.
pub const LIST_LIBRARIES: &str = "catalog.list_libraries";

/// Catalog: list a library's books.
pub const LIST_LIBRARY_BOOKS: &str = "catalog.list_library_books";

/// Reservations: fetch a user's reservations.
pub const FETCH_USER_RESERVATIONS: &str = "reservations.by_user";

/// Reservations: fetch one reservation.
pub const FETCH_RESERVATION: &str = "reservations.by_uid";

/// Rating: fetch a user's rating.
pub const FETCH_RATING: &str = "rating.by_user";

/// Every operation guarded by a circuit breaker.
pub const BREAKER_KEYS: [&str; 7] = [
    FETCH_BOOKS_BY_UIDS,
    FETCH_LIBRARIES_BY_UIDS,
    LIST_LIBRARIES,
    LIST_LIBRARY_BOOKS,
    FETCH_USER_RESERVATIONS,
    FETCH_RESERVATION,
    FETCH_RATING,
];

pub const SAGA_RESERVE: &str = "reserve_book";
pub const SAGA_RETURN: &str = "return_book";

pub const STEP_CREATE_RATING: &str = "create_rating";
pub const STEP_CREATE_RESERVATION: &str = "create_reservation";
pub const STEP_DECREMENT_AVAILABLE: &str = "decrement_available_count";
pub const STEP_DELETE_RESERVATION: &str = "delete_reservation";
pub const STEP_SET_STATUS: &str = "set_reservation_status";
pub const STEP_INCREMENT_AVAILABLE: &str = "increment_available_count";
pub const STEP_UPDATE_STARS: &str = "update_stars";
pub const STEP_REVERT_STATUS: &str = "revert_reservation_status";
pub const STEP_REVERT_AVAILABLE: &str = "revert_available_count";
