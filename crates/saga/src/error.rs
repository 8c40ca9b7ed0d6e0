//! Saga error types.

use clients::ServiceError;
use domain::DomainError;
use http::StatusCode;
use resilience::SchedulerError;
use thiserror::Error;

use crate::response::{FAILED_TO_PARSE, GatewayResponse, OVER_LIMIT};

/// Errors that end a saga or a gateway read.
#[derive(Debug, Error)]
pub enum SagaError {
    /// A backend call failed and nothing needed undoing.
    #[error("{operation} failed: {source}")]
    Service {
        operation: &'static str,
        #[source]
        source: ServiceError,
    },

    /// A business rule refused the request.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// The request payload or path could not be understood.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Undoing an applied step failed; remote state may be inconsistent.
    #[error("Compensation step '{step}' failed: {source}")]
    CompensationFailed {
        step: &'static str,
        #[source]
        source: ServiceError,
    },

    /// A replayed request failed again after compensation; the retry worker
    /// keeps the task.
    #[error("Step '{step}' failed again during replay")]
    Deferred { step: &'static str },

    /// The retry worker is gone.
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),
}

impl SagaError {
    pub(crate) fn service(operation: &'static str, source: ServiceError) -> Self {
        SagaError::Service { operation, source }
    }

    /// Returns the status code the caller receives.
    pub fn status(&self) -> StatusCode {
        match self {
            SagaError::Service { source, .. } => {
                source.status().unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            SagaError::Domain(DomainError::QuotaExceeded { .. }) => StatusCode::BAD_REQUEST,
            SagaError::Domain(DomainError::InvalidStatusTransition { .. }) => StatusCode::CONFLICT,
            SagaError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            SagaError::Deferred { .. } => StatusCode::SERVICE_UNAVAILABLE,
            SagaError::CompensationFailed { .. } | SagaError::Scheduler(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Converts the error into the response sent to the caller.
    ///
    /// Backend answers are relayed verbatim; infrastructure failures collapse
    /// into the generic failure body.
    pub fn into_response(self) -> GatewayResponse {
        let status = self.status();
        match self {
            SagaError::Service {
                source: ServiceError::Upstream { status, body },
                ..
            } => GatewayResponse::raw(status, body),
            SagaError::Domain(DomainError::QuotaExceeded { .. }) => {
                GatewayResponse::message(status, OVER_LIMIT)
            }
            SagaError::InvalidRequest(_) => GatewayResponse::message(status, FAILED_TO_PARSE),
            SagaError::Domain(DomainError::InvalidStatusTransition { .. }) => {
                GatewayResponse::message(status, "reservation is not rented")
            }
            SagaError::Deferred { .. } => GatewayResponse::message(status, "retry pending"),
            _ => GatewayResponse::failure(),
        }
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
