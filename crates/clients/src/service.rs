use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use common::{BookUid, LibraryUid, ReservationUid, UserName};
use domain::{Book, CreateReservation, Library, Rating, Reservation, ReservationStatus};
use http::StatusCode;
use serde::de::DeserializeOwned;

use crate::Result;

/// A successful backend response kept as raw bytes, for relaying verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl RawResponse {
    /// Creates a raw response.
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Decodes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Query parameters for listing libraries, passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryQuery {
    pub city: Option<String>,
    pub page: Option<String>,
    pub size: Option<String>,
}

/// Query parameters for listing a library's books, passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookQuery {
    pub page: Option<String>,
    pub size: Option<String>,
    pub show_all: Option<String>,
}

/// Catalog (library) service operations.
///
/// Every call carries the caller's identity. Any non-success answer comes
/// back as [`ServiceError::Upstream`](crate::ServiceError::Upstream).
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Lists libraries, relaying the service's answer.
    async fn list_libraries(&self, user: &UserName, query: &LibraryQuery) -> Result<RawResponse>;

    /// Lists one library's books, relaying the service's answer.
    async fn list_library_books(
        &self,
        user: &UserName,
        library_uid: LibraryUid,
        query: &BookQuery,
    ) -> Result<RawResponse>;

    /// Looks up books by uid. Unknown uids are simply absent from the map.
    async fn books_by_uids(
        &self,
        user: &UserName,
        uids: &[BookUid],
    ) -> Result<HashMap<BookUid, Book>>;

    /// Looks up libraries by uid. Unknown uids are simply absent from the map.
    async fn libraries_by_uids(
        &self,
        user: &UserName,
        uids: &[LibraryUid],
    ) -> Result<HashMap<LibraryUid, Library>>;

    /// Adds `delta` (may be negative) to a book's available count in a library.
    async fn update_available_count(
        &self,
        user: &UserName,
        library_uid: LibraryUid,
        book_uid: BookUid,
        delta: i32,
    ) -> Result<()>;
}

/// Reservation service operations.
#[async_trait]
pub trait ReservationService: Send + Sync {
    /// Lists a user's reservations, optionally filtered by status.
    async fn user_reservations(
        &self,
        user: &UserName,
        status: Option<ReservationStatus>,
    ) -> Result<Vec<Reservation>>;

    /// Fetches one reservation.
    async fn reservation(&self, user: &UserName, uid: ReservationUid) -> Result<Reservation>;

    /// Creates a reservation for the user.
    async fn create_reservation(
        &self,
        user: &UserName,
        request: &CreateReservation,
    ) -> Result<Reservation>;

    /// Deletes a reservation.
    async fn delete_reservation(&self, user: &UserName, uid: ReservationUid) -> Result<()>;

    /// Sets a reservation's status.
    async fn update_status(
        &self,
        user: &UserName,
        uid: ReservationUid,
        status: ReservationStatus,
    ) -> Result<()>;
}

/// Rating service operations.
#[async_trait]
pub trait RatingService: Send + Sync {
    /// Fetches a user's rating, relaying the service's answer.
    async fn rating_raw(&self, user: &UserName) -> Result<RawResponse>;

    /// Fetches and decodes a user's rating.
    async fn rating(&self, user: &UserName) -> Result<Rating> {
        self.rating_raw(user).await?.json()
    }

    /// Creates a rating with the service's default star count.
    async fn create_rating(&self, user: &UserName) -> Result<Rating>;

    /// Adds `delta` (may be negative) to a user's star count.
    async fn update_stars(&self, user: &UserName, delta: i32) -> Result<()>;
}
