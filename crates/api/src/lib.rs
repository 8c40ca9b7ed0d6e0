//! HTTP front end of the library gateway.
//!
//! Exposes the `/api/v1` routes over the saga coordinator, with structured
//! logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod extract;
pub mod response;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use clients::{
    CatalogService, HttpBackends, HttpCatalogService, HttpRatingService, HttpReservationService,
    RatingService, ReservationService,
};
use metrics_exporter_prometheus::PrometheusHandle;
use resilience::{RetryScheduler, RetryWorker};
use saga::{SagaCoordinator, breaker_registry};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;

/// Shared application state accessible from all handlers.
pub struct AppState<C, R, Ra> {
    pub coordinator: SagaCoordinator<C, R, Ra>,
}

/// State over the real backend services.
pub type HttpState = AppState<HttpCatalogService, HttpReservationService, HttpRatingService>;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<C, R, Ra>(
    state: Arc<AppState<C, R, Ra>>,
    metrics_handle: PrometheusHandle,
) -> Router
where
    C: CatalogService + Clone + 'static,
    R: ReservationService + Clone + 'static,
    Ra: RatingService + Clone + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    let api = Router::new()
        .route("/libraries", get(routes::libraries::list::<C, R, Ra>))
        .route(
            "/libraries/{libraryUid}/books",
            get(routes::libraries::books::<C, R, Ra>),
        )
        .route(
            "/reservations",
            get(routes::reservations::list::<C, R, Ra>)
                .post(routes::reservations::create::<C, R, Ra>),
        )
        .route(
            "/reservations/{reservationUid}/return",
            post(routes::reservations::return_book::<C, R, Ra>),
        )
        .route("/rating", get(routes::rating::get::<C, R, Ra>))
        .with_state(state);

    Router::new()
        .route("/manage/health", get(routes::health::check))
        .nest("/api/v1", api)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Builds the coordinator over HTTP backends, plus the retry worker that
/// must be spawned for deferred requests to be replayed.
pub fn create_http_state(config: &Config) -> clients::Result<(Arc<HttpState>, RetryWorker)> {
    let backends = HttpBackends::from_config(&config.backends)?;
    let (scheduler, worker) = RetryScheduler::new(config.retry);
    let coordinator = SagaCoordinator::new(
        backends.catalog,
        backends.reservations,
        backends.ratings,
        breaker_registry(config.breaker),
        scheduler,
    );
    Ok((Arc::new(AppState { coordinator }), worker))
}
