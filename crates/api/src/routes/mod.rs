//! HTTP route handlers.

pub mod items;
pub mod orders;
pub mod payments;
pub mod system;

use std::str::FromStr;

use crate::error::ApiError;

/// Parses an identifier taken from the request path.
fn parse_id<T: FromStr>(raw: &str, what: &str) -> Result<T, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid {what} id: {raw}")))
}
