//! Caller identity.
//!
//! Authentication is handled upstream by the identity provider, which
//! forwards the verified user id in the `X-User-Id` header.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::ApiError;

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller. Rejects with 401 when the header is missing or
/// blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserId(pub String);

impl<S> FromRequestParts<S> for UserId
where
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &S,
  ) -> Result<Self, Self::Rejection> {
    let user_id = parts
      .headers
      .get(USER_ID_HEADER)
      .and_then(|v| v.to_str().ok())
      .map(str::trim)
      .filter(|v| !v.is_empty())
      .ok_or(ApiError::Unauthorized)?;
    Ok(UserId(user_id.to_owned()))
  }
}
