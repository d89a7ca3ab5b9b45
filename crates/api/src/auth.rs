//! Caller identity.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::UserId;

use crate::error::ApiError;

/// Header carrying the authenticated user id, set by the upstream gateway.
pub const USER_HEADER: &str = "x-user-id";

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserId);

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_HEADER)
            .ok_or_else(|| ApiError::Unauthorized(format!("missing {USER_HEADER} header")))?;
        let id = value
            .to_str()
            .map_err(|_| ApiError::Unauthorized(format!("invalid {USER_HEADER} header")))?
            .trim();
        if id.is_empty() {
            return Err(ApiError::Unauthorized(format!("empty {USER_HEADER} header")));
        }
        Ok(CurrentUser(UserId::new(id)))
    }
}
