//! Saga coordinator: breaker-guarded reads and the entry points shared by
//! the reserve and return workflows.

use std::future::Future;
use std::sync::Arc;

use clients::{
    BookQuery, CatalogService, LibraryQuery, RatingService, ReservationService, ServiceError,
};
use common::{BookUid, LibraryUid, UserName};
use domain::ReservationStatus;
use futures_util::future;
use http::StatusCode;
use resilience::{CircuitBreakerConfig, CircuitBreakerRegistry, CircuitError, RetryScheduler};

use crate::operations;
use crate::response::GatewayResponse;
use crate::views::ReservationEntry;

/// Orchestrates calls to the catalog, reservation and rating services.
///
/// Reads go through the circuit breaker registered for their operation.
/// Writes are never guarded; their failures drive compensation instead.
/// Cloning is cheap and shares breakers and the retry queue.
#[derive(Clone)]
pub struct SagaCoordinator<C, R, Ra> {
    pub(crate) catalog: C,
    pub(crate) reservations: R,
    pub(crate) ratings: Ra,
    pub(crate) breakers: Arc<CircuitBreakerRegistry>,
    pub(crate) scheduler: RetryScheduler,
}

/// Builds one breaker for every guarded operation.
pub fn breaker_registry(config: CircuitBreakerConfig) -> CircuitBreakerRegistry {
    CircuitBreakerRegistry::new(config, operations::BREAKER_KEYS)
}

impl<C, R, Ra> SagaCoordinator<C, R, Ra>
where
    C: CatalogService + Clone + 'static,
    R: ReservationService + Clone + 'static,
    Ra: RatingService + Clone + 'static,
{
    /// Creates a coordinator over the three services.
    pub fn new(
        catalog: C,
        reservations: R,
        ratings: Ra,
        breakers: CircuitBreakerRegistry,
        scheduler: RetryScheduler,
    ) -> Self {
        Self {
            catalog,
            reservations,
            ratings,
            breakers: Arc::new(breakers),
            scheduler,
        }
    }

    /// Returns the breaker registry.
    pub fn breakers(&self) -> &CircuitBreakerRegistry {
        &self.breakers
    }

    /// Returns the retry scheduler handle.
    pub fn scheduler(&self) -> &RetryScheduler {
        &self.scheduler
    }

    /// Runs a read through the breaker registered under `key`.
    ///
    /// Only infrastructure failures count against the breaker; a 4xx answer
    /// is passed through and treated as a healthy response.
    pub(crate) async fn guarded<T, F, Fut>(&self, key: &'static str, op: F) -> clients::Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = clients::Result<T>>,
    {
        let Some(breaker) = self.breakers.get(key) else {
            tracing::warn!(operation = key, "no circuit breaker registered");
            return op().await;
        };

        breaker
            .call_classified(
                |result: &clients::Result<T>| {
                    matches!(result, Err(e) if e.is_infrastructure())
                },
                op,
            )
            .await
            .map_err(|e| match e {
                CircuitError::Open { name } => ServiceError::CircuitOpen(name),
                CircuitError::Inner(e) => e,
            })
    }

    /// Lists libraries through the breaker, relaying the catalog's answer.
    #[tracing::instrument(skip(self, query), fields(user = %user))]
    pub async fn list_libraries(&self, user: &UserName, query: &LibraryQuery) -> GatewayResponse {
        let result = self
            .guarded(operations::LIST_LIBRARIES, || {
                self.catalog.list_libraries(user, query)
            })
            .await;
        relay(operations::LIST_LIBRARIES, result)
    }

    /// Lists a library's books through the breaker, relaying the catalog's answer.
    #[tracing::instrument(skip(self, query), fields(user = %user))]
    pub async fn list_library_books(
        &self,
        user: &UserName,
        library_uid: LibraryUid,
        query: &BookQuery,
    ) -> GatewayResponse {
        let result = self
            .guarded(operations::LIST_LIBRARY_BOOKS, || {
                self.catalog.list_library_books(user, library_uid, query)
            })
            .await;
        relay(operations::LIST_LIBRARY_BOOKS, result)
    }

    /// Fetches the caller's rating through the breaker, relaying the answer.
    #[tracing::instrument(skip(self), fields(user = %user))]
    pub async fn rating(&self, user: &UserName) -> GatewayResponse {
        let result = self
            .guarded(operations::FETCH_RATING, || self.ratings.rating_raw(user))
            .await;
        relay(operations::FETCH_RATING, result)
    }

    /// Lists the caller's RENTED reservations with book and library details.
    ///
    /// Failing to fetch the reservations fails the request. Failing to fetch
    /// the details, or finding any of them missing, degrades the answer to
    /// the bare reservation list.
    #[tracing::instrument(skip(self), fields(user = %user))]
    pub async fn list_reservations(&self, user: &UserName) -> GatewayResponse {
        let reservations = match self
            .guarded(operations::FETCH_USER_RESERVATIONS, || {
                self.reservations
                    .user_reservations(user, Some(ReservationStatus::Rented))
            })
            .await
        {
            Ok(reservations) => reservations,
            Err(e) => {
                tracing::warn!(error = %e, "failed to fetch reservations");
                return crate::SagaError::service(operations::FETCH_USER_RESERVATIONS, e)
                    .into_response();
            }
        };

        let mut book_uids: Vec<BookUid> = reservations.iter().map(|r| r.book_uid).collect();
        let mut library_uids: Vec<LibraryUid> =
            reservations.iter().map(|r| r.library_uid).collect();
        book_uids.sort_unstable();
        book_uids.dedup();
        library_uids.sort_unstable();
        library_uids.dedup();

        let (books, libraries) = future::join(
            self.guarded(operations::FETCH_BOOKS_BY_UIDS, || {
                self.catalog.books_by_uids(user, &book_uids)
            }),
            self.guarded(operations::FETCH_LIBRARIES_BY_UIDS, || {
                self.catalog.libraries_by_uids(user, &library_uids)
            }),
        )
        .await;

        let (books, libraries) = match (books, libraries) {
            (Ok(books), Ok(libraries)) => (books, libraries),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(error = %e, "catalog unavailable, returning bare reservations");
                return GatewayResponse::json(StatusCode::OK, &reservations);
            }
        };

        let entries: Option<Vec<ReservationEntry>> = reservations
            .iter()
            .map(|r| {
                let book = books.get(&r.book_uid)?.clone();
                let library = libraries.get(&r.library_uid)?.clone();
                Some(ReservationEntry::new(r, book, library))
            })
            .collect();

        match entries {
            Some(entries) => GatewayResponse::json(StatusCode::OK, &entries),
            None => {
                tracing::warn!("catalog is missing entries, returning bare reservations");
                GatewayResponse::json(StatusCode::OK, &reservations)
            }
        }
    }
}

fn relay(
    operation: &'static str,
    result: clients::Result<clients::RawResponse>,
) -> GatewayResponse {
    match result {
        Ok(response) => response.into(),
        Err(e) => {
            tracing::warn!(operation, error = %e, "proxied read failed");
            crate::SagaError::service(operation, e).into_response()
        }
    }
}
