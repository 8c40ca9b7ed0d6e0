//! Transport-neutral response produced by every gateway operation.

use bytes::Bytes;
use clients::RawResponse;
use http::StatusCode;
use serde::Serialize;

/// Body for requests that failed for reasons the caller cannot act on.
pub const FAILED_TO_PROCESS: &str = "failed to process request";

/// Body for reservations refused by the quota rule.
pub const OVER_LIMIT: &str = "reservations over limit";

/// Body for requests whose payload could not be read.
pub const FAILED_TO_PARSE: &str = "failed to parse request";

/// Response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Empty,
    Json(serde_json::Value),
    /// Relayed from a backend byte for byte.
    Raw(Bytes),
}

/// Status code and body to send back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayResponse {
    pub status: StatusCode,
    pub body: ResponseBody,
}

impl GatewayResponse {
    /// Serializes `value` as a JSON body.
    pub fn json<T: Serialize>(status: StatusCode, value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => Self {
                status,
                body: ResponseBody::Json(value),
            },
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize response");
                Self::failure()
            }
        }
    }

    /// `{"message": ...}` with the given status.
    pub fn message(status: StatusCode, message: &str) -> Self {
        Self {
            status,
            body: ResponseBody::Json(serde_json::json!({ "message": message })),
        }
    }

    /// Generic 500.
    pub fn failure() -> Self {
        Self::message(StatusCode::INTERNAL_SERVER_ERROR, FAILED_TO_PROCESS)
    }

    /// 204 without a body.
    pub fn no_content() -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            body: ResponseBody::Empty,
        }
    }

    /// Status and body passed through untouched.
    pub fn raw(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: ResponseBody::Raw(body.into()),
        }
    }

    /// Returns the JSON body, if any. Raw bodies are parsed on demand.
    pub fn json_body(&self) -> Option<serde_json::Value> {
        match &self.body {
            ResponseBody::Json(value) => Some(value.clone()),
            ResponseBody::Raw(bytes) => serde_json::from_slice(bytes).ok(),
            ResponseBody::Empty => None,
        }
    }
}

impl From<RawResponse> for GatewayResponse {
    fn from(response: RawResponse) -> Self {
        Self::raw(response.status, response.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_body() {
        let response = GatewayResponse::failure();
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.json_body().unwrap(),
            serde_json::json!({ "message": "failed to process request" })
        );
    }

    #[test]
    fn test_raw_body_is_kept_verbatim() {
        let response = GatewayResponse::raw(StatusCode::NOT_FOUND, "not json at all");
        assert_eq!(response.body, ResponseBody::Raw(Bytes::from("not json at all")));
        assert!(response.json_body().is_none());
    }
}
