//! Mapping of core errors onto HTTP responses.
//!
//! | Error | Status | Code |
//! |-------|--------|------|
//! | `RegistryError::BatchNotFound` | 404 | `BATCH_NOT_FOUND` |
//! | `PriceLookupError::NotFound` | 404 | `PRICE_NOT_FOUND` |
//! | `RegistryError::EmptyOrMalformedChunk` | 400 | `MALFORMED_CHUNK` |
//! | Body over the configured limit | 413 | `PAYLOAD_TOO_LARGE` |
//! | Any other JSON body rejection | 400 | `MALFORMED_CHUNK` |

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use super::response::ErrorResponse;
use crate::application::ports::PriceLookupError;
use crate::application::services::RegistryError;

/// Message returned when a batch id is not live.
pub const BATCH_NOT_FOUND_MESSAGE: &str = "Batch not found";

/// Message returned when no price exists for an instrument.
pub const PRICE_NOT_FOUND_MESSAGE: &str = "Price not found";

/// Error returned by HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Core registry error.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// Price lookup error.
    #[error(transparent)]
    Lookup(#[from] PriceLookupError),
    /// Request body could not be decoded.
    #[error("malformed request body: {0}")]
    Body(String),
    /// Request body exceeded the configured size limit.
    #[error("request body too large: {0}")]
    BodyTooLarge(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::BodyTooLarge(rejection.body_text())
        } else {
            Self::Body(rejection.body_text())
        }
    }
}

impl ApiError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Registry(RegistryError::BatchNotFound(_)) | Self::Lookup(_) => {
                StatusCode::NOT_FOUND
            }
            Self::Registry(RegistryError::EmptyOrMalformedChunk(_)) | Self::Body(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::BodyTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    /// Machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Registry(RegistryError::BatchNotFound(_)) => "BATCH_NOT_FOUND",
            Self::Registry(RegistryError::EmptyOrMalformedChunk(_)) | Self::Body(_) => {
                "MALFORMED_CHUNK"
            }
            Self::BodyTooLarge(_) => "PAYLOAD_TOO_LARGE",
            Self::Lookup(_) => "PRICE_NOT_FOUND",
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Registry(RegistryError::BatchNotFound(id)) => {
                format!("{BATCH_NOT_FOUND_MESSAGE}: {id}")
            }
            Self::Lookup(PriceLookupError::NotFound(key)) => {
                format!("{PRICE_NOT_FOUND_MESSAGE}: {key}")
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_client_error() {
            tracing::debug!(code = self.code(), error = %self, "Request rejected");
        }
        let body = ErrorResponse {
            code: self.code().to_string(),
            message: self.message(),
        };
        (status, Json(body)).into_response()
    }
}
