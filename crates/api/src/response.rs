//! Conversion of coordinator responses into HTTP responses.

use axum::Json;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use saga::{GatewayResponse, ResponseBody};

/// Sends a [`GatewayResponse`] as is.
///
/// Relayed backend bodies are passed through byte for byte and labelled as
/// JSON, which is what every backend speaks.
#[derive(Debug)]
pub struct Relay(pub GatewayResponse);

impl IntoResponse for Relay {
    fn into_response(self) -> Response {
        let GatewayResponse { status, body } = self.0;
        match body {
            ResponseBody::Empty => status.into_response(),
            ResponseBody::Json(value) => (status, Json(value)).into_response(),
            ResponseBody::Raw(bytes) => {
                (status, [(CONTENT_TYPE, "application/json")], bytes).into_response()
            }
        }
    }
}
