use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::models::ErrorBody;

/// BackendError
///
/// Failure of a single call to the hosted backend. Every repository method
/// returns this instead of swallowing the error, so callers decide between a
/// JSON error and a redirect explicitly.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BackendError {
    /// The backend rejected the query (bad column, RLS violation, constraint).
    #[error("{0}")]
    Query(String),
    /// The backend could not be reached or the connection failed mid-query.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for BackendError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db) => BackendError::Query(db.message().to_string()),
            sqlx::Error::RowNotFound
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::Decode(_)
            | sqlx::Error::TypeNotFound { .. } => BackendError::Query(err.to_string()),
            other => BackendError::Unavailable(other.to_string()),
        }
    }
}

/// ApiError
///
/// The error half of every JSON handler. Renders as `{ "error": "..." }` with
/// an HTTP status derived from the variant.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authentication required")]
    Unauthenticated,
    #[error("admin access required")]
    Forbidden,
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("notification failed: {0}")]
    Notification(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Backend(BackendError::Query(_)) => StatusCode::BAD_REQUEST,
            ApiError::Backend(BackendError::Unavailable(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Notification(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
