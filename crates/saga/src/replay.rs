//! Retry-worker adapters that re-run a saga from its captured request.

use async_trait::async_trait;
use clients::{CatalogService, RatingService, ReservationService};
use http::StatusCode;
use resilience::{ReplayError, ReplayHandler, RequestSnapshot};

use crate::coordinator::SagaCoordinator;
use crate::operations;

/// Replays the reserve saga.
pub struct ReserveReplay<C, R, Ra> {
    coordinator: SagaCoordinator<C, R, Ra>,
}

impl<C, R, Ra> ReserveReplay<C, R, Ra> {
    pub fn new(coordinator: SagaCoordinator<C, R, Ra>) -> Self {
        Self { coordinator }
    }
}

#[async_trait]
impl<C, R, Ra> ReplayHandler for ReserveReplay<C, R, Ra>
where
    C: CatalogService + Clone + 'static,
    R: ReservationService + Clone + 'static,
    Ra: RatingService + Clone + 'static,
{
    fn name(&self) -> &'static str {
        operations::SAGA_RESERVE
    }

    async fn replay(&self, request: &RequestSnapshot) -> Result<StatusCode, ReplayError> {
        Ok(self.coordinator.reserve_book(request.clone()).await.status)
    }
}

/// Replays the return saga.
pub struct ReturnReplay<C, R, Ra> {
    coordinator: SagaCoordinator<C, R, Ra>,
}

impl<C, R, Ra> ReturnReplay<C, R, Ra> {
    pub fn new(coordinator: SagaCoordinator<C, R, Ra>) -> Self {
        Self { coordinator }
    }
}

#[async_trait]
impl<C, R, Ra> ReplayHandler for ReturnReplay<C, R, Ra>
where
    C: CatalogService + Clone + 'static,
    R: ReservationService + Clone + 'static,
    Ra: RatingService + Clone + 'static,
{
    fn name(&self) -> &'static str {
        operations::SAGA_RETURN
    }

    async fn replay(&self, request: &RequestSnapshot) -> Result<StatusCode, ReplayError> {
        Ok(self.coordinator.return_book(request.clone()).await.status)
    }
}
