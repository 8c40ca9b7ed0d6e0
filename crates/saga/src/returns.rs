//! Return-a-book saga.
//!
//! Steps, in order:
//! 1. Fetch the reservation
//! 2. Evaluate the return (late or not, target status, star delta)
//! 3. Set the reservation's status
//! 4. Increment the book's available count
//! 5. Apply the star delta to the caller's rating
//!
//! A failure in step 4 or 5 undoes the applied steps in reverse order. If
//! every undo succeeds the request is queued for replay and the caller gets
//! 204; if any undo fails the caller gets 500.

use std::sync::Arc;

use clients::{CatalogService, RatingService, ReservationService, ServiceError};
use common::{ReservationUid, UserName};
use domain::{Reservation, ReservationStatus, ReturnBook, ReturnOutcome};
use resilience::RequestSnapshot;

use crate::coordinator::SagaCoordinator;
use crate::error::{Result, SagaError};
use crate::operations;
use crate::replay::ReturnReplay;
use crate::response::GatewayResponse;

/// Path parameter naming the reservation being returned.
pub const RESERVATION_UID_PARAM: &str = "reservationUid";

/// Mutations of the return saga that have a compensating action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Applied {
    Status,
    Available,
}

impl<C, R, Ra> SagaCoordinator<C, R, Ra>
where
    C: CatalogService + Clone + 'static,
    R: ReservationService + Clone + 'static,
    Ra: RatingService + Clone + 'static,
{
    /// Runs the return saga for a captured `POST /reservations/{uid}/return`.
    ///
    /// The request carries the reservation uid as a path parameter and a
    /// [`ReturnBook`] body. Answers 204 on success and after a successful
    /// compensation.
    #[tracing::instrument(
        skip_all,
        fields(
            saga = operations::SAGA_RETURN,
            user = %request.user_name,
            attempt = request.attempt
        )
    )]
    pub async fn return_book(&self, request: RequestSnapshot) -> GatewayResponse {
        metrics::counter!("saga_executions_total", "saga" => operations::SAGA_RETURN)
            .increment(1);
        let started = std::time::Instant::now();

        let (outcome, response) = match self.run_return(&request).await {
            Ok(outcome) => (outcome, GatewayResponse::no_content()),
            Err(e) => {
                tracing::warn!(error = %e, "return saga failed");
                ("failed", e.into_response())
            }
        };

        metrics::counter!("saga_return_total", "outcome" => outcome).increment(1);
        metrics::histogram!("saga_duration_seconds", "saga" => operations::SAGA_RETURN)
            .record(started.elapsed().as_secs_f64());
        response
    }

    async fn run_return(&self, request: &RequestSnapshot) -> Result<&'static str> {
        let user = UserName::new(request.user_name.clone());
        let uid = request
            .path_param(RESERVATION_UID_PARAM)
            .ok_or_else(|| SagaError::InvalidRequest("missing reservation uid".to_string()))
            .and_then(|raw| {
                ReservationUid::parse(raw).map_err(|e| SagaError::InvalidRequest(e.to_string()))
            })?;

        // 1. Reservation
        let reservation = self
            .guarded(operations::FETCH_RESERVATION, || {
                self.reservations.reservation(&user, uid)
            })
            .await
            .map_err(|e| SagaError::service(operations::FETCH_RESERVATION, e))?;

        // 2. Evaluate
        let body: ReturnBook = request
            .json()
            .map_err(|e| SagaError::InvalidRequest(e.to_string()))?;
        let outcome = ReturnOutcome::evaluate(reservation.till_date, body.date);
        let target = reservation.status.transition_to(outcome.status)?;
        tracing::info!(
            reservation_uid = %uid,
            condition = ?body.condition,
            late = outcome.late,
            star_delta = outcome.star_delta,
            "return evaluated"
        );

        // 3. Status
        tracing::info!(step = operations::STEP_SET_STATUS, status = %target, "saga step started");
        self.reservations
            .update_status(&user, uid, target)
            .await
            .map_err(|e| SagaError::service(operations::STEP_SET_STATUS, e))?;

        // 4. Back on the shelf
        tracing::info!(step = operations::STEP_INCREMENT_AVAILABLE, "saga step started");
        if let Err(e) = self
            .catalog
            .update_available_count(&user, reservation.library_uid, reservation.book_uid, 1)
            .await
        {
            return self
                .compensate_return(
                    request,
                    &user,
                    &reservation,
                    &[Applied::Status],
                    operations::STEP_INCREMENT_AVAILABLE,
                    e,
                )
                .await;
        }

        // 5. Rating
        tracing::info!(
            step = operations::STEP_UPDATE_STARS,
            delta = outcome.star_delta,
            "saga step started"
        );
        if let Err(e) = self.ratings.update_stars(&user, outcome.star_delta).await {
            return self
                .compensate_return(
                    request,
                    &user,
                    &reservation,
                    &[Applied::Status, Applied::Available],
                    operations::STEP_UPDATE_STARS,
                    e,
                )
                .await;
        }

        tracing::info!(reservation_uid = %uid, "return completed");
        Ok("completed")
    }

    /// Undoes `applied` in reverse order, then decides how to answer.
    async fn compensate_return(
        &self,
        request: &RequestSnapshot,
        user: &UserName,
        reservation: &Reservation,
        applied: &[Applied],
        failed_step: &'static str,
        cause: ServiceError,
    ) -> Result<&'static str> {
        tracing::warn!(step = failed_step, error = %cause, "saga step failed, compensating");

        for step in applied.iter().rev() {
            let (name, result) = match step {
                Applied::Available => (
                    operations::STEP_REVERT_AVAILABLE,
                    self.catalog
                        .update_available_count(
                            user,
                            reservation.library_uid,
                            reservation.book_uid,
                            -1,
                        )
                        .await,
                ),
                Applied::Status => (
                    operations::STEP_REVERT_STATUS,
                    self.reservations
                        .update_status(
                            user,
                            reservation.reservation_uid,
                            ReservationStatus::Rented,
                        )
                        .await,
                ),
            };
            metrics::counter!("saga_compensations_total", "step" => name).increment(1);

            if let Err(e) = result {
                tracing::error!(
                    step = name,
                    reservation_uid = %reservation.reservation_uid,
                    error = %e,
                    "compensation failed"
                );
                return Err(SagaError::CompensationFailed {
                    step: name,
                    source: e,
                });
            }
            tracing::info!(step = name, "compensation step completed");
        }

        if request.is_replay() {
            // A 4xx answer ends the replay; anything else keeps the task queued.
            if !cause.is_retryable() {
                return Err(SagaError::service(failed_step, cause));
            }
            return Err(SagaError::Deferred { step: failed_step });
        }

        let handler = Arc::new(ReturnReplay::new(self.clone()));
        self.scheduler
            .schedule_after_cooldown(handler, request.clone())?;
        Ok("deferred")
    }
}
