use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

use crate::auth::AuthError;
use crate::services::TicketingError;
use crate::store::StoreError;
use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Sold out: {0}")]
    SoldOut(String),

    #[error("Already used: {0}")]
    AlreadyUsed(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error")]
    DatabaseError(#[from] StoreError),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error")]
    InternalServerError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::SoldOut(_) | AppError::AlreadyUsed(_) | AppError::Conflict(_) => {
                StatusCode::CONFLICT
            }
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::AuthError(_) => "AUTH_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::SoldOut(_) => "SOLD_OUT",
            AppError::AlreadyUsed(_) => "ALREADY_USED",
            AppError::Conflict(_) => "CONFLICT",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            AppError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    // Expected business outcomes log at warn; only failures we did not anticipate log at error.
    fn log(&self) {
        match self {
            AppError::ValidationError(msg)
            | AppError::AuthError(msg)
            | AppError::NotFound(msg)
            | AppError::SoldOut(msg)
            | AppError::AlreadyUsed(msg)
            | AppError::Conflict(msg) => {
                warn!(code = self.code(), message = %msg, "Request rejected");
            }
            AppError::ServiceUnavailable(msg) | AppError::InternalServerError(msg) => {
                error!(error = ?self, message = %msg, "Application error");
            }
            AppError::DatabaseError(e) => {
                error!(error = ?e, "Database error");
            }
        }
    }
}

impl From<TicketingError> for AppError {
    fn from(err: TicketingError) -> Self {
        let message = err.to_string();
        match err {
            TicketingError::InvalidInput(_) => AppError::ValidationError(message),
            TicketingError::TicketTypeNotFound(_) | TicketingError::TicketNotFound => {
                AppError::NotFound(message)
            }
            TicketingError::SoldOut { .. } => AppError::SoldOut(message),
            TicketingError::AlreadyUsed { .. } => AppError::AlreadyUsed(message),
            TicketingError::NotOnSale { .. } | TicketingError::Conflict(_) => {
                AppError::Conflict(message)
            }
            TicketingError::Transient { .. } => AppError::ServiceUnavailable(message),
            TicketingError::Store(e) => AppError::DatabaseError(e),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match &err {
            AuthError::TokenGeneration(msg) => AppError::InternalServerError(msg.clone()),
            AuthError::MissingCredentials | AuthError::ExpiredToken => {
                AppError::AuthError(err.to_string())
            }
            AuthError::InvalidToken(detail) => {
                warn!(detail = %detail, "Bearer token rejected");
                AppError::AuthError("invalid token".to_string())
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Log internal details
        self.log();

        // Only expose high-level message to the client
        let public_message = match &self {
            AppError::ValidationError(msg)
            | AppError::AuthError(msg)
            | AppError::NotFound(msg)
            | AppError::SoldOut(msg)
            | AppError::AlreadyUsed(msg)
            | AppError::Conflict(msg)
            | AppError::ServiceUnavailable(msg) => msg.clone(),
            AppError::DatabaseError(_) => "A database error occurred".to_string(),
            AppError::InternalServerError(_) => "An internal error occurred".to_string(),
        };

        error_response(code, public_message, None, status)
    }
}
