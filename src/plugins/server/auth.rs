use axum::{extract::FromRequestParts, http::request::Parts};

use crate::prelude::*;

/// Header the identity provider fills with the verified account id.
pub const ACCOUNT_HEADER: &str = "x-account-id";

/// Caller identity, trusted as injected upstream.
#[derive(Debug, Clone)]
pub struct Principal(pub String);

impl<S: Send + Sync> FromRequestParts<S> for Principal {
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &S,
  ) -> Result<Self, Self::Rejection> {
    let id = parts
      .headers
      .get(ACCOUNT_HEADER)
      .and_then(|value| value.to_str().ok())
      .map(str::trim)
      .filter(|id| !id.is_empty())
      .ok_or(Error::Unauthorized)?;

    Ok(Self(id.to_string()))
  }
}
