use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Rating data missing, unreadable, or empty. No model can be built.
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    /// A single rating or item record failed shape validation.
    #[error("Malformed record at line {line}: {reason}")]
    MalformedRecord { line: u64, reason: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn malformed(line: u64, reason: impl Into<String>) -> Self {
        AppError::MalformedRecord {
            line,
            reason: reason.into(),
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let code = self.status_code();
        HttpResponse::build(code).json(ErrorResponse {
            error: self.to_string(),
            code: code.as_u16(),
        })
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::DataUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::MalformedRecord { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Configuration(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
