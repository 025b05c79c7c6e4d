use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::utils::{ApiResponse, error_codes, error_to_api_response};

/// Application error with a machine-readable kind. Handlers and engine code
/// match on the variant, never on the message text.
#[derive(Debug)]
pub enum AppError {
    Unauthorized,
    /// Entity absent, or hidden from this caller. Both collapse to the same
    /// message so non-members cannot probe for existence.
    NotFound(&'static str),
    /// Entity visible but the caller lacks the required role.
    Forbidden(&'static str),
    /// Request is valid HTTP but violates a business rule.
    Client(&'static str),
    /// A write collided with existing state in a way silent success would
    /// misrepresent.
    Conflict(&'static str),
    Database(sqlx::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Database(e)
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Client(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// True when the error is a unique-constraint violation at the store level.
/// Join/accept flows treat this as "already a member" rather than a failure.
pub fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// True when the error is a foreign-key violation, e.g. adding a friend row
/// pointing at a user that does not exist.
pub fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (code, message) = match self {
            AppError::Unauthorized => (error_codes::AUTH_FAILED, "Unauthorized".to_string()),
            AppError::NotFound(msg) => (error_codes::NOT_FOUND, msg.to_string()),
            AppError::Forbidden(msg) => (error_codes::PERMISSION_DENIED, msg.to_string()),
            AppError::Client(msg) => (error_codes::VALIDATION_ERROR, msg.to_string()),
            AppError::Conflict(msg) => (error_codes::CONFLICT, msg.to_string()),
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                // Store-level detail never reaches the client
                (error_codes::INTERNAL_ERROR, "Internal server error".to_string())
            }
        };

        let body: Json<ApiResponse<()>> = error_to_api_response(code, message);
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_the_error_kind() {
        assert_eq!(
            AppError::NotFound("Game not found").status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Forbidden("Only admins can update a group").status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::Client("Group is invite only").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn database_errors_hide_detail_from_the_client() {
        let resp = AppError::Database(sqlx::Error::RowNotFound).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
