//! Error taxonomy shared by every component and its mapping to HTTP responses.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use derive_more::Display;
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;

/// Message used for every bearer token failure, whatever the cause.
pub const AUTH_REQUIRED: &str = "Authentication required";

#[derive(Debug, Display)]
pub enum AppError {
    /// Missing or malformed input.
    #[display(fmt = "{}", _0)]
    Validation(String),
    /// A uniqueness rule was violated.
    #[display(fmt = "{}", _0)]
    Conflict(String),
    /// Missing, invalid or expired token, or bad credentials.
    #[display(fmt = "{}", _0)]
    Authentication(String),
    /// Authenticated but not allowed.
    #[display(fmt = "{}", _0)]
    Authorization(String),
    #[display(fmt = "{}", _0)]
    NotFound(String),
    /// Opaque failure. The message is safe to show to a client.
    #[display(fmt = "{}", _0)]
    Server(String),
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "ValidationError",
            AppError::Conflict(_) => "ConflictError",
            AppError::Authentication(_) => "AuthenticationError",
            AppError::Authorization(_) => "AuthorizationError",
            AppError::NotFound(_) => "NotFoundError",
            AppError::Server(_) => "ServerError",
        }
    }

    pub fn unauthenticated() -> Self {
        AppError::Authentication(AUTH_REQUIRED.to_owned())
    }

    pub fn forbidden() -> Self {
        AppError::Authorization("Access denied".to_owned())
    }

    /// Maps a failed insert or update. Unique index violations become
    /// `Conflict` with the given message, anything else is a server error.
    pub fn from_write(err: DbErr, conflict_message: &str) -> Self {
        if is_unique_violation(&err) {
            log::debug!("unique constraint violation: {}", err);
            AppError::Conflict(conflict_message.to_owned())
        } else {
            err.into()
        }
    }
}

impl std::error::Error for AppError {}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        log::error!("database error: {}", err);
        AppError::Server("Internal server error".to_owned())
    }
}

/// True when the store rejected a write because of a unique index.
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    kind: &'a str,
    message: String,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            kind: self.kind(),
            message: self.to_string(),
        })
    }
}
