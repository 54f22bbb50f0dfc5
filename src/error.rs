use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Decoding error: {0}")]
    DecodingError(String),
    #[error("Provider error: {0}")]
    ProviderError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Body returned for every failed request.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

impl ImageServiceError {
    /// Message safe to hand back to the caller. Upstream and internal
    /// failures are reduced to a fixed message; the full error is logged.
    pub fn detail(&self) -> String {
        match self {
            ImageServiceError::ValidationError(msg) | ImageServiceError::DecodingError(msg) => {
                msg.clone()
            }
            ImageServiceError::ProviderError(_) => "Image provider request failed.".to_string(),
            ImageServiceError::ConfigError(_) => "Service is misconfigured.".to_string(),
            ImageServiceError::SerializationError(_) => "Internal server error.".to_string(),
        }
    }
}

impl ResponseError for ImageServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ImageServiceError::ValidationError(_) | ImageServiceError::DecodingError(_) => {
                StatusCode::BAD_REQUEST
            }
            ImageServiceError::ProviderError(_) => StatusCode::BAD_GATEWAY,
            ImageServiceError::ConfigError(_) | ImageServiceError::SerializationError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("Request failed with {}: {}", status.as_u16(), self);
        } else {
            log::warn!("Rejected request with {}: {}", status.as_u16(), self);
        }

        HttpResponse::build(status).json(ErrorResponse {
            detail: self.detail(),
        })
    }
}

impl From<serde_json::Error> for ImageServiceError {
    fn from(err: serde_json::Error) -> Self {
        ImageServiceError::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for ImageServiceError {
    fn from(err: reqwest::Error) -> Self {
        ImageServiceError::ProviderError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ImageServiceError>;
