use actix_web::error::BlockingError;
use actix_web::http::{header, StatusCode};
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use crate::models::db_operations::DbError;
use crate::models::feedback_filter::FilterError;
use crate::models::{ApiResponse, UnknownVariant};

pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error.";

/// Every failure the HTTP layer can report. Renders as
/// `{ "success": false, "message": ... }` with the matching status code.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Invalid feedback ID.")]
    MalformedId,
    #[error("Too many feedback submissions from this IP, please try again later.")]
    RateLimited { retry_after_secs: u64 },
    #[error("Database error: {0}")]
    Database(#[from] DbError),
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("Password hashing error: {0}")]
    Hashing(#[from] bcrypt::BcryptError),
    #[error("Token signing error: {0}")]
    TokenSigning(jsonwebtoken::errors::Error),
    #[error("Blocking task failed: {0}")]
    Blocking(#[from] BlockingError),
    #[error("{0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn feedback_not_found() -> Self {
        ApiError::NotFound("Feedback not found.".to_string())
    }

    pub fn is_internal(&self) -> bool {
        self.status_code() == StatusCode::INTERNAL_SERVER_ERROR
    }

    /// Message shown to the client. Internal failures never leak detail here.
    pub fn public_message(&self) -> String {
        if self.is_internal() {
            INTERNAL_ERROR_MESSAGE.to_string()
        } else {
            self.to_string()
        }
    }
}

impl From<UnknownVariant> for ApiError {
    fn from(e: UnknownVariant) -> Self {
        ApiError::Validation(e.to_string())
    }
}

impl From<FilterError> for ApiError {
    fn from(e: FilterError) -> Self {
        ApiError::Validation(e.to_string())
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(e: rusqlite::Error) -> Self {
        ApiError::Database(DbError::Rusqlite(e))
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::MalformedId => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Database(_)
            | ApiError::Pool(_)
            | ApiError::Hashing(_)
            | ApiError::TokenSigning(_)
            | ApiError::Blocking(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.is_internal() {
            log::error!("Request failed: {}", self);
        }

        let mut builder = HttpResponse::build(self.status_code());
        if let ApiError::RateLimited { retry_after_secs } = self {
            builder.insert_header((header::RETRY_AFTER, retry_after_secs.to_string()));
        }
        builder.json(ApiResponse::failure(&self.public_message()))
    }
}
