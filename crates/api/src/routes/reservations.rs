//! Reservation listing and the reserve / return sagas.
//!
//! Write handlers capture the request as a [`RequestSnapshot`] so the saga
//! can hand it to the retry worker unchanged.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{OriginalUri, Path, State};
use axum::http::Method;
use clients::{CatalogService, RatingService, ReservationService};
use resilience::RequestSnapshot;
use saga::RESERVATION_UID_PARAM;

use crate::AppState;
use crate::extract::CurrentUser;
use crate::response::Relay;

/// GET /api/v1/reservations
#[tracing::instrument(skip_all)]
pub async fn list<C, R, Ra>(
    State(state): State<Arc<AppState<C, R, Ra>>>,
    CurrentUser(user): CurrentUser,
) -> Relay
where
    C: CatalogService + Clone + 'static,
    R: ReservationService + Clone + 'static,
    Ra: RatingService + Clone + 'static,
{
    Relay(state.coordinator.list_reservations(&user).await)
}

/// POST /api/v1/reservations
pub async fn create<C, R, Ra>(
    State(state): State<Arc<AppState<C, R, Ra>>>,
    CurrentUser(user): CurrentUser,
    method: Method,
    OriginalUri(uri): OriginalUri,
    body: Bytes,
) -> Relay
where
    C: CatalogService + Clone + 'static,
    R: ReservationService + Clone + 'static,
    Ra: RatingService + Clone + 'static,
{
    let request =
        RequestSnapshot::new(method.as_str(), uri.path(), user.as_str()).with_body(body.to_vec());
    Relay(state.coordinator.reserve_book(request).await)
}

/// POST /api/v1/reservations/{reservationUid}/return
pub async fn return_book<C, R, Ra>(
    State(state): State<Arc<AppState<C, R, Ra>>>,
    CurrentUser(user): CurrentUser,
    Path(reservation_uid): Path<String>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    body: Bytes,
) -> Relay
where
    C: CatalogService + Clone + 'static,
    R: ReservationService + Clone + 'static,
    Ra: RatingService + Clone + 'static,
{
    let request = RequestSnapshot::new(method.as_str(), uri.path(), user.as_str())
        .with_path_param(RESERVATION_UID_PARAM, reservation_uid)
        .with_body(body.to_vec());
    Relay(state.coordinator.return_book(request).await)
}
