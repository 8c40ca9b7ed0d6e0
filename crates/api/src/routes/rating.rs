//! The caller's rating, relayed from the rating service.

use std::sync::Arc;

use axum::extract::State;
use clients::{CatalogService, RatingService, ReservationService};

use crate::AppState;
use crate::extract::CurrentUser;
use crate::response::Relay;

/// GET /api/v1/rating
#[tracing::instrument(skip_all)]
pub async fn get<C, R, Ra>(
    State(state): State<Arc<AppState<C, R, Ra>>>,
    CurrentUser(user): CurrentUser,
) -> Relay
where
    C: CatalogService + Clone + 'static,
    R: ReservationService + Clone + 'static,
    Ra: RatingService + Clone + 'static,
{
    Relay(state.coordinator.rating(&user).await)
}
