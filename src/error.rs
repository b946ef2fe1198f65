use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Conflict {
  #[error("Share link exhausted")]
  Exhausted,
  #[error("Guest upload already claimed")]
  AlreadyClaimed,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("Database error: {0}")]
  Database(#[from] sea_orm::DbErr),

  #[error("Build not found")]
  BuildNotFound,

  #[error("Share link not found")]
  LinkNotFound,

  #[error("Guest upload not found")]
  UploadNotFound,

  #[error("Missing caller identity")]
  Unauthorized,

  #[error("Caller does not own this build")]
  Forbidden,

  #[error("{0}")]
  Conflict(#[from] Conflict),

  #[error("Invalid input: {0}")]
  Validation(String),

  #[error("Guest upload expired")]
  Expired,

  #[error("Internal error: {0}")]
  Internal(String),
}

impl Error {
  pub fn validation(msg: impl Into<String>) -> Self {
    Self::Validation(msg.into())
  }

  fn status(&self) -> StatusCode {
    match self {
      Error::BuildNotFound | Error::LinkNotFound | Error::UploadNotFound => {
        StatusCode::NOT_FOUND
      }
      Error::Unauthorized => StatusCode::UNAUTHORIZED,
      Error::Forbidden => StatusCode::FORBIDDEN,
      Error::Conflict(_) => StatusCode::CONFLICT,
      Error::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
      Error::Expired => StatusCode::GONE,
      Error::Database(_) | Error::Internal(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let status = self.status();

    // never leak storage details to clients
    let message = match &self {
      Error::Database(err) => {
        tracing::error!("Database error: {err}");
        "Database error".to_string()
      }
      Error::Internal(err) => {
        tracing::error!("Internal error: {err}");
        "Internal error".to_string()
      }
      other => other.to_string(),
    };

    let body = json::json!({
      "success": false,
      "error": message
    });

    (status, axum::Json(body)).into_response()
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
