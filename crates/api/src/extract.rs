//! Request extractors.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::{USER_NAME_HEADER, UserName};

use crate::error::ApiError;

/// The caller's identity, taken from the `X-User-Name` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub UserName);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_NAME_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|name| !name.trim().is_empty())
            .map(|name| CurrentUser(UserName::from(name)))
            .ok_or(ApiError::MissingUserName)
    }
}
