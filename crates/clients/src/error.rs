use bytes::Bytes;
use http::StatusCode;
use thiserror::Error;

/// Outcome of a failed call to a backend service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The circuit breaker for this operation is open; no call was made.
    #[error("circuit breaker is open for {0}")]
    CircuitOpen(&'static str),

    /// The service answered with a non-success status.
    #[error("upstream responded with {status}")]
    Upstream { status: StatusCode, body: Bytes },

    /// The request never produced a response (connect, timeout, read).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body did not match the expected shape.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// A configured base URL cannot have path segments appended.
    #[error("invalid backend url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ServiceError {
    /// Creates an upstream error from a status and body.
    pub fn upstream(status: StatusCode, body: impl Into<Bytes>) -> Self {
        ServiceError::Upstream {
            status,
            body: body.into(),
        }
    }

    /// Returns the upstream status, if the service answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ServiceError::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true if the service answered 404.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    /// Returns true if this failure says something about the health of the
    /// dependency rather than about the request.
    ///
    /// Counted by circuit breakers. A 4xx is a business answer and is not.
    pub fn is_infrastructure(&self) -> bool {
        match self {
            ServiceError::Transport(_) | ServiceError::Decode(_) => true,
            ServiceError::Upstream { status, .. } => status.is_server_error(),
            ServiceError::CircuitOpen(_) | ServiceError::InvalidUrl(_) => false,
        }
    }

    /// Returns true if the same call may succeed later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::CircuitOpen(_)) || self.is_infrastructure()
    }
}

/// Result type for backend calls.
pub type Result<T> = std::result::Result<T, ServiceError>;
