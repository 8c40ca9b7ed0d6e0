//! Reserve-a-book saga.
//!
//! Steps, in order:
//! 1. Fetch the caller's RENTED reservations
//! 2. Fetch the caller's rating, creating it on first use
//! 3. Check the quota
//! 4. Create the reservation
//! 5. Decrement the book's available count (compensated by deleting the
//!    reservation)
//! 6. Enrich the answer with book and library details (best effort)

use std::sync::Arc;

use clients::{CatalogService, RatingService, ReservationService, ServiceError};
use common::UserName;
use domain::{CreateReservation, Reservation, ReservationStatus, check_quota};
use futures_util::future;
use http::StatusCode;
use resilience::RequestSnapshot;

use crate::coordinator::SagaCoordinator;
use crate::error::{Result, SagaError};
use crate::operations;
use crate::replay::ReserveReplay;
use crate::response::GatewayResponse;
use crate::views::{ReservationDetails, ReservationSummary, StarsView};

impl<C, R, Ra> SagaCoordinator<C, R, Ra>
where
    C: CatalogService + Clone + 'static,
    R: ReservationService + Clone + 'static,
    Ra: RatingService + Clone + 'static,
{
    /// Runs the reserve saga for a captured `POST /reservations` request.
    ///
    /// The body must be a [`CreateReservation`]. When the availability update
    /// fails after the reservation was created, the reservation is deleted,
    /// the request is queued for replay and the caller gets the created
    /// reservation with bare identifiers.
    #[tracing::instrument(
        skip_all,
        fields(
            saga = operations::SAGA_RESERVE,
            user = %request.user_name,
            attempt = request.attempt
        )
    )]
    pub async fn reserve_book(&self, request: RequestSnapshot) -> GatewayResponse {
        metrics::counter!("saga_executions_total", "saga" => operations::SAGA_RESERVE)
            .increment(1);
        let started = std::time::Instant::now();

        let (outcome, response) = match self.run_reserve(&request).await {
            Ok((outcome, response)) => (outcome, response),
            Err(e) => {
                tracing::warn!(error = %e, "reserve saga failed");
                ("failed", e.into_response())
            }
        };

        metrics::counter!("saga_reserve_total", "outcome" => outcome).increment(1);
        metrics::histogram!("saga_duration_seconds", "saga" => operations::SAGA_RESERVE)
            .record(started.elapsed().as_secs_f64());
        response
    }

    async fn run_reserve(
        &self,
        request: &RequestSnapshot,
    ) -> Result<(&'static str, GatewayResponse)> {
        let user = UserName::new(request.user_name.clone());
        let body: CreateReservation = request
            .json()
            .map_err(|e| SagaError::InvalidRequest(e.to_string()))?;

        // 1. Active reservations
        let active = self
            .guarded(operations::FETCH_USER_RESERVATIONS, || {
                self.reservations
                    .user_reservations(&user, Some(ReservationStatus::Rented))
            })
            .await
            .map_err(|e| SagaError::service(operations::FETCH_USER_RESERVATIONS, e))?;

        // 2. Rating, created on first use
        let stars = self.stars_for(&user).await?;

        // 3. Quota
        check_quota(active.len(), stars)?;

        // 4. Create
        tracing::info!(step = operations::STEP_CREATE_RESERVATION, "saga step started");
        let reservation = self
            .reservations
            .create_reservation(&user, &body)
            .await
            .map_err(|e| SagaError::service(operations::STEP_CREATE_RESERVATION, e))?;

        // 5. Take the copy off the shelf
        tracing::info!(
            step = operations::STEP_DECREMENT_AVAILABLE,
            reservation_uid = %reservation.reservation_uid,
            "saga step started"
        );
        if let Err(e) = self
            .catalog
            .update_available_count(&user, reservation.library_uid, reservation.book_uid, -1)
            .await
        {
            return self
                .compensate_reservation(request, &user, &reservation, stars, e)
                .await;
        }

        // 6. Enrichment
        Ok(self.enrich(&user, &reservation, stars).await)
    }

    /// Reads the caller's star count, creating a rating if none exists.
    async fn stars_for(&self, user: &UserName) -> Result<u32> {
        match self
            .guarded(operations::FETCH_RATING, || self.ratings.rating(user))
            .await
        {
            Ok(rating) => Ok(rating.stars),
            Err(e) if e.is_not_found() => {
                tracing::info!(
                    step = operations::STEP_CREATE_RATING,
                    "creating rating for new user"
                );
                let rating = self
                    .ratings
                    .create_rating(user)
                    .await
                    .map_err(|e| SagaError::service(operations::STEP_CREATE_RATING, e))?;
                Ok(rating.stars)
            }
            Err(e) => Err(SagaError::service(operations::FETCH_RATING, e)),
        }
    }

    /// Undoes step 4 after step 5 failed, then decides how to answer.
    async fn compensate_reservation(
        &self,
        request: &RequestSnapshot,
        user: &UserName,
        reservation: &Reservation,
        stars: u32,
        cause: ServiceError,
    ) -> Result<(&'static str, GatewayResponse)> {
        tracing::warn!(
            step = operations::STEP_DECREMENT_AVAILABLE,
            error = %cause,
            "saga step failed, deleting reservation"
        );
        metrics::counter!(
            "saga_compensations_total",
            "step" => operations::STEP_DELETE_RESERVATION
        )
        .increment(1);

        if let Err(e) = self
            .reservations
            .delete_reservation(user, reservation.reservation_uid)
            .await
        {
            tracing::error!(
                step = operations::STEP_DELETE_RESERVATION,
                reservation_uid = %reservation.reservation_uid,
                error = %e,
                "compensation failed"
            );
            return Err(SagaError::CompensationFailed {
                step: operations::STEP_DELETE_RESERVATION,
                source: e,
            });
        }

        if request.is_replay() {
            // A 4xx answer ends the replay; anything else keeps the task queued.
            if !cause.is_retryable() {
                return Err(SagaError::service(
                    operations::STEP_DECREMENT_AVAILABLE,
                    cause,
                ));
            }
            return Err(SagaError::Deferred {
                step: operations::STEP_DECREMENT_AVAILABLE,
            });
        }

        let handler = Arc::new(ReserveReplay::new(self.clone()));
        self.scheduler
            .schedule_after_cooldown(handler, request.clone())?;

        Ok((
            "deferred",
            GatewayResponse::json(StatusCode::OK, &ReservationSummary::new(reservation, stars)),
        ))
    }

    /// Builds the success answer, falling back to bare identifiers when the
    /// catalog cannot describe the book or library.
    async fn enrich(
        &self,
        user: &UserName,
        reservation: &Reservation,
        stars: u32,
    ) -> (&'static str, GatewayResponse) {
        let book_uids = [reservation.book_uid];
        let library_uids = [reservation.library_uid];
        let (books, libraries) = future::join(
            self.guarded(operations::FETCH_BOOKS_BY_UIDS, || {
                self.catalog.books_by_uids(user, &book_uids)
            }),
            self.guarded(operations::FETCH_LIBRARIES_BY_UIDS, || {
                self.catalog.libraries_by_uids(user, &library_uids)
            }),
        )
        .await;

        let book = books
            .inspect_err(|e| tracing::warn!(error = %e, "book details unavailable"))
            .ok()
            .and_then(|mut books| books.remove(&reservation.book_uid));
        let library = libraries
            .inspect_err(|e| tracing::warn!(error = %e, "library details unavailable"))
            .ok()
            .and_then(|mut libraries| libraries.remove(&reservation.library_uid));

        match (book, library) {
            (Some(book), Some(library)) => {
                tracing::info!(
                    reservation_uid = %reservation.reservation_uid,
                    "reservation completed"
                );
                let details = ReservationDetails {
                    reservation_uid: reservation.reservation_uid,
                    status: reservation.status,
                    start_date: reservation.start_date,
                    till_date: reservation.till_date,
                    book,
                    library,
                    rating: StarsView { stars },
                };
                ("completed", GatewayResponse::json(StatusCode::OK, &details))
            }
            _ => (
                "degraded",
                GatewayResponse::json(StatusCode::OK, &ReservationSummary::new(reservation, stars)),
            ),
        }
    }
}
