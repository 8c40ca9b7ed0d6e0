//! Library and book listings, relayed from the catalog service.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use clients::{BookQuery, CatalogService, LibraryQuery, RatingService, ReservationService};
use common::LibraryUid;
use serde::Deserialize;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::CurrentUser;
use crate::response::Relay;

#[derive(Debug, Deserialize)]
pub struct LibrariesParams {
    pub city: Option<String>,
    pub page: Option<String>,
    pub size: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BooksParams {
    pub page: Option<String>,
    pub size: Option<String>,
    pub show_all: Option<String>,
}

/// GET /api/v1/libraries
#[tracing::instrument(skip_all)]
pub async fn list<C, R, Ra>(
    State(state): State<Arc<AppState<C, R, Ra>>>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<LibrariesParams>,
) -> Relay
where
    C: CatalogService + Clone + 'static,
    R: ReservationService + Clone + 'static,
    Ra: RatingService + Clone + 'static,
{
    let query = LibraryQuery {
        city: params.city,
        page: params.page,
        size: params.size,
    };
    Relay(state.coordinator.list_libraries(&user, &query).await)
}

/// GET /api/v1/libraries/{libraryUid}/books
#[tracing::instrument(skip(state, params))]
pub async fn books<C, R, Ra>(
    State(state): State<Arc<AppState<C, R, Ra>>>,
    CurrentUser(user): CurrentUser,
    Path(library_uid): Path<String>,
    Query(params): Query<BooksParams>,
) -> Result<Relay, ApiError>
where
    C: CatalogService + Clone + 'static,
    R: ReservationService + Clone + 'static,
    Ra: RatingService + Clone + 'static,
{
    let library_uid = LibraryUid::parse(&library_uid).map_err(|e| ApiError::InvalidPath {
        name: "libraryUid",
        reason: e.to_string(),
    })?;
    let query = BookQuery {
        page: params.page,
        size: params.size,
        show_all: params.show_all,
    };
    Ok(Relay(
        state
            .coordinator
            .list_library_books(&user, library_uid, &query)
            .await,
    ))
}
