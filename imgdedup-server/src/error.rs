//! API error handling module
//!
//! Provides a unified error type for all API endpoints with structured error variants.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use imgdedup_core::{DedupError, RejectReason};
use thiserror::Error;

/// API error type with structured variants for different error categories
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request - client provided invalid input
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Upload exceeds the configured size limit
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Well-formed upload whose content is not a usable image
    #[error("Unprocessable image: {0}")]
    Unprocessable(String),

    /// Internal server error - unexpected server-side failure
    #[error("Internal error: {0}")]
    Internal(String),

    /// Service unavailable - the repository cannot be reached
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Engine error surfaced from the admission pipeline
    #[error("Dedup error: {0}")]
    Dedup(#[from] DedupError),
}

impl ApiError {
    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Create a payload too large error
    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::PayloadTooLarge(message.into())
    }

    /// Create an internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a service unavailable error
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    /// Map a pipeline rejection: undecodable content is 422, a short read is 400
    pub fn rejected(reason: &RejectReason) -> Self {
        match reason {
            RejectReason::Decode(m) => Self::Unprocessable(m.clone()),
            RejectReason::Io(m) => Self::BadRequest(format!("Upload could not be read: {}", m)),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Dedup(ref e) => match e {
                // Input problems that escaped the pipeline's own classification
                DedupError::Decode(_) => StatusCode::UNPROCESSABLE_ENTITY,
                DedupError::Io(_) => StatusCode::BAD_REQUEST,

                // Backend unreachable or failing → 503
                DedupError::Repository(_) => StatusCode::SERVICE_UNAVAILABLE,

                DedupError::DuplicateKey(_) => StatusCode::CONFLICT,

                // Server-side failures → 500
                DedupError::Persistence(_)
                | DedupError::IncompleteFingerprint(_)
                | DedupError::InvalidFingerprint(_)
                | DedupError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Get the error code for programmatic error handling
    fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "INVALID_INPUT",
            Self::PayloadTooLarge(_) => "FILE_TOO_LARGE",
            Self::Unprocessable(_) => "INVALID_IMAGE",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::Dedup(ref e) => match e {
                DedupError::Decode(_) => "INVALID_IMAGE",
                DedupError::Io(_) => "READ_ERROR",
                DedupError::Repository(_) => "REPOSITORY_UNAVAILABLE",
                DedupError::DuplicateKey(_) => "DUPLICATE_KEY",
                DedupError::Persistence(_) => "STORAGE_ERROR",
                DedupError::IncompleteFingerprint(_) | DedupError::InvalidFingerprint(_) => {
                    "FINGERPRINT_ERROR"
                }
                DedupError::Internal(_) => "INTERNAL_ERROR",
            },
        }
    }

    /// Get sanitized error message for client response
    fn client_message(&self) -> String {
        match self {
            // Engine errors may carry paths and SQL details
            Self::Dedup(ref e) => match e {
                DedupError::Decode(_) => "File is not a valid image".to_string(),
                DedupError::Io(_) => "Upload could not be read".to_string(),
                DedupError::Repository(_) => "Fingerprint repository unavailable".to_string(),
                DedupError::DuplicateKey(_) => "Image was stored concurrently".to_string(),
                DedupError::Persistence(_) => "Failed to store image".to_string(),
                DedupError::IncompleteFingerprint(_) | DedupError::InvalidFingerprint(_) => {
                    "Failed to calculate similarity".to_string()
                }
                DedupError::Internal(_) => "Server error".to_string(),
            },
            Self::Internal(_) => "Server error".to_string(),
            Self::BadRequest(m)
            | Self::PayloadTooLarge(m)
            | Self::Unprocessable(m)
            | Self::ServiceUnavailable(m) => m.clone(),
        }
    }

    /// Get the error category for logging
    fn error_category(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::PayloadTooLarge(_) => "payload_too_large",
            Self::Unprocessable(_) => "unprocessable",
            Self::Internal(_) => "internal",
            Self::ServiceUnavailable(_) => "service_unavailable",
            Self::Dedup(_) => "dedup",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let category = self.error_category();
        let code = self.error_code();
        let internal_message = self.to_string();
        let client_message = self.client_message();

        // Log based on severity, always including internal details
        match &self {
            Self::BadRequest(_) | Self::PayloadTooLarge(_) | Self::Unprocessable(_) => {
                tracing::warn!(
                    status = %status,
                    category = category,
                    code = code,
                    error = %internal_message,
                    "Client error"
                );
            }
            Self::ServiceUnavailable(_) => {
                tracing::warn!(
                    status = %status,
                    category = category,
                    code = code,
                    error = %internal_message,
                    "Service unavailable"
                );
            }
            Self::Internal(_) => {
                tracing::error!(
                    status = %status,
                    category = category,
                    code = code,
                    error = %internal_message,
                    "Server error"
                );
            }
            Self::Dedup(_) => {
                tracing::error!(
                    status = %status,
                    category = category,
                    code = code,
                    error = %internal_message,
                    client_message = %client_message,
                    "Dedup error (internal details logged)"
                );
            }
        }

        let body = serde_json::json!({
            "status": "error",
            "error": client_message,
            "code": code,
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejections_map_to_client_statuses() {
        let decode = ApiError::rejected(&RejectReason::Decode("bad header".into()));
        assert_eq!(decode.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(decode.error_code(), "INVALID_IMAGE");

        let io = ApiError::rejected(&RejectReason::Io("unexpected eof".into()));
        assert_eq!(io.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_engine_failures_are_server_errors() {
        let persistence = ApiError::from(DedupError::Persistence("disk full".into()));
        assert_eq!(persistence.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(persistence.error_code(), "STORAGE_ERROR");

        let repo = ApiError::from(DedupError::Repository("pool timed out".into()));
        assert_eq!(repo.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_client_message_hides_internal_details() {
        let err = ApiError::from(DedupError::Persistence("/srv/uploads/ab/cd: EACCES".into()));
        assert!(!err.client_message().contains("/srv"));
        assert_eq!(ApiError::internal("join error").client_message(), "Server error");
    }

    #[test]
    fn test_payload_too_large() {
        let err = ApiError::payload_too_large("File too large (max 16MB)");
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.client_message(), "File too large (max 16MB)");
    }
}
