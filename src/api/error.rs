//! Request-level failures and their HTTP mapping.
//!
//! Every handler returns `Result<_, ApiError>`; the body is always
//! `{"error": <message>}`. Database errors are logged and surfaced as `500`
//! without leaking details.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

/// SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// SQLSTATE for `foreign_key_violation`.
const FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Debug)]
pub enum ApiError {
    /// Malformed or missing input.
    Validation(&'static str),
    /// No caller identity could be resolved.
    Unauthenticated,
    /// Login credential mismatch; same message for unknown email and bad password.
    InvalidCredentials,
    Conflict(&'static str),
    NotFound(&'static str),
    MethodNotSupported,
    Internal(&'static str),
    Database(sqlx::Error),
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotSupported => StatusCode::METHOD_NOT_ALLOWED,
            Self::Internal(_) | Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Self::Validation(message)
            | Self::Conflict(message)
            | Self::NotFound(message)
            | Self::Internal(message) => message,
            Self::Unauthenticated => "Not authenticated",
            Self::InvalidCredentials => "Invalid email or password",
            Self::MethodNotSupported => "Method not allowed",
            Self::Database(_) => "Internal server error",
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::Database(err) => error!("Database error: {err}"),
            Self::Internal(message) => error!("Internal error: {message}"),
            _ => (),
        }

        (self.status(), Json(json!({ "error": self.message() }))).into_response()
    }
}

/// Returns `true` when `err` is a Postgres unique constraint violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    sqlstate_is(err, UNIQUE_VIOLATION)
}

/// Returns `true` when `err` is a Postgres foreign key violation.
pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    sqlstate_is(err, FOREIGN_KEY_VIOLATION)
}

fn sqlstate_is(err: &sqlx::Error, code: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some(code),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    #[test]
    fn status_mapping() {
        assert_eq!(
            ApiError::Validation("x").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::InvalidCredentials.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::Conflict("x").status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::NotFound("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::MethodNotSupported.status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            ApiError::Database(sqlx::Error::RowNotFound).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn body_carries_error_message() -> anyhow::Result<()> {
        let response = ApiError::Conflict("User already exists").into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body = to_bytes(response.into_body(), usize::MAX).await?;
        let value: Value = serde_json::from_slice(&body)?;
        assert_eq!(value["error"], "User already exists");
        Ok(())
    }

    #[tokio::test]
    async fn database_details_are_not_leaked() -> anyhow::Result<()> {
        let response = ApiError::from(sqlx::Error::PoolTimedOut).into_response();
        let body = to_bytes(response.into_body(), usize::MAX).await?;
        let value: Value = serde_json::from_slice(&body)?;
        assert_eq!(value["error"], "Internal server error");
        Ok(())
    }

    #[test]
    fn non_database_errors_are_not_constraint_violations() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
        assert!(!is_foreign_key_violation(&sqlx::Error::PoolClosed));
    }
}
