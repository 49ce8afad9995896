//!
//! # Custom Error Handling
//!
//! This module defines the custom error type `AppError` used throughout the application.
//! Every handler returns `Result<_, AppError>`, so each failure reaches the client as the
//! same `{"error": ...}` JSON shape with a status code picked from the variant.
//!
//! Server-side failures (database, storage, anything unexpected) are logged with their
//! cause. The cause is echoed back in a `"cause"` field only outside production.
//!
//! `From` implementations cover `sqlx::Error`, `validator::ValidationErrors`,
//! `jsonwebtoken::errors::Error`, `bcrypt::BcryptError`, `actix_multipart::MultipartError`
//! and `StorageError`, so handlers can use `?` throughout.

use actix_multipart::MultipartError;
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use std::fmt;
use validator::ValidationErrors;

use crate::config::Environment;
use crate::storage::StorageError;

/// Postgres SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// Represents all possible errors that can occur within the application.
#[derive(Debug)]
pub enum AppError {
    /// Authentication failed or is missing (HTTP 401).
    Unauthorized(String),
    /// The caller is authenticated but does not own the resource (HTTP 403).
    Forbidden(String),
    /// Malformed or invalid request (HTTP 400).
    BadRequest(String),
    /// The requested resource does not exist (HTTP 404).
    NotFound(String),
    /// The write collides with existing state (HTTP 409).
    Conflict(String),
    /// Payload failed `validator` rules (HTTP 400).
    ValidationError(String),
    /// Unexpected server-side error (HTTP 500). Carries the cause.
    InternalServerError(String),
    /// A `sqlx` failure (HTTP 500). Carries the cause.
    DatabaseError(String),
    /// A blob store failure (HTTP 500). Carries the cause.
    StorageError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
            AppError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database Error: {}", msg),
            AppError::StorageError(msg) => write!(f, "Storage Error: {}", msg),
        }
    }
}

impl AppError {
    /// The client-facing message and, for server-side errors, the hidden cause.
    fn parts(&self) -> (&str, Option<&str>) {
        match self {
            AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::BadRequest(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::ValidationError(msg) => (msg, None),
            AppError::InternalServerError(cause) => ("Internal server error", Some(cause)),
            AppError::DatabaseError(cause) => ("Database error", Some(cause)),
            AppError::StorageError(cause) => ("Storage error", Some(cause)),
        }
    }

    fn body(&self, environment: Environment) -> serde_json::Value {
        let (message, cause) = self.parts();
        match cause {
            Some(cause) if !environment.is_production() => json!({
                "error": message,
                "cause": cause
            }),
            _ => json!({ "error": message }),
        }
    }
}

/// Converts `AppError` variants into `HttpResponse` objects.
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) | AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InternalServerError(_)
            | AppError::DatabaseError(_)
            | AppError::StorageError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("{}", self);
        }
        HttpResponse::build(status).json(self.body(Environment::current()))
    }
}

/// `RowNotFound` becomes `NotFound` and unique violations become `Conflict`.
/// Everything else is a `DatabaseError`.
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> AppError {
        match error {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".into()),
            sqlx::Error::Database(ref db_err)
                if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) =>
            {
                AppError::Conflict("Resource already exists".into())
            }
            _ => AppError::DatabaseError(error.to_string()),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        AppError::ValidationError(error.to_string())
    }
}

/// JWT failures (bad signature, expired, malformed) are authentication failures.
impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(error: jsonwebtoken::errors::Error) -> AppError {
        AppError::Unauthorized(error.to_string())
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> AppError {
        AppError::InternalServerError(error.to_string())
    }
}

/// A broken multipart body is the client's fault.
impl From<MultipartError> for AppError {
    fn from(error: MultipartError) -> AppError {
        AppError::BadRequest(format!("Invalid multipart body: {}", error))
    }
}

impl From<StorageError> for AppError {
    fn from(error: StorageError) -> AppError {
        match error {
            StorageError::NotFound(key) => AppError::NotFound(format!("Image {} not found", key)),
            StorageError::InvalidKey(key) => AppError::NotFound(format!("Image {} not found", key)),
            StorageError::Io(e) => AppError::StorageError(e.to_string()),
        }
    }
}
