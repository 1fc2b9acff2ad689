//! Error types for the Ops API.
//!
//! Three client-visible classes, mapped to HTTP statuses:
//! - input/domain validation → 400 (never retried automatically)
//! - lifecycle conflicts → 409 (never coerced into another transition)
//! - everything else → 500 (soft consistency losses are logged upstream
//!   and never reach here)

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use supper_core::{CoreError, ValidationError};
use supper_db::{DbError, OrderActionError};

/// Ops API errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::Validation(msg.into())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(inner) => ApiError::Validation(inner.to_string()),
            CoreError::InvalidTransition { .. } => ApiError::Conflict(err.to_string()),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            other => {
                error!(error = %other, "Database error");
                ApiError::Internal(other.to_string())
            }
        }
    }
}

impl From<OrderActionError> for ApiError {
    fn from(err: OrderActionError) -> Self {
        match err {
            OrderActionError::Domain(inner) => inner.into(),
            OrderActionError::Db(inner) => inner.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_stays_a_conflict() {
        let err = ApiError::from(CoreError::InvalidTransition {
            action: "accept".into(),
            status: "preparing".into(),
        });
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[test]
    fn test_validation_maps_to_validation() {
        let err = ApiError::from(ValidationError::UnsupportedAction {
            action: "refund".into(),
        });
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn test_db_not_found_maps_to_not_found() {
        let err = ApiError::from(DbError::not_found("Order", "o1"));
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
