//! Error kinds surfaced by the booking core

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::models::ApiResponse;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ArmoraError {
    /// Malformed or missing input. Nothing was written.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("unauthorized: {0}")]
    Auth(String),

    /// The provider reports the intent in a non-succeeded state.
    #[error("payment not completed (provider status: {status})")]
    PaymentNotCompleted { status: String },

    #[error("payment provider unavailable: {0}")]
    PaymentProviderUnavailable(String),

    #[error("invalid webhook signature: {0}")]
    InvalidSignature(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// A required integration is not configured on this deployment.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl ArmoraError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ArmoraError::Validation(_) => StatusCode::BAD_REQUEST,
            ArmoraError::Auth(_) => StatusCode::UNAUTHORIZED,
            ArmoraError::PaymentNotCompleted { .. } => StatusCode::BAD_REQUEST,
            ArmoraError::PaymentProviderUnavailable(_) => StatusCode::BAD_GATEWAY,
            ArmoraError::InvalidSignature(_) => StatusCode::BAD_REQUEST,
            ArmoraError::NotFound(_) => StatusCode::NOT_FOUND,
            ArmoraError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ArmoraError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ArmoraError::Validation(_) => "VALIDATION_ERROR",
            ArmoraError::Auth(_) => "AUTH_ERROR",
            ArmoraError::PaymentNotCompleted { .. } => "PAYMENT_NOT_COMPLETED",
            ArmoraError::PaymentProviderUnavailable(_) => "PAYMENT_PROVIDER_UNAVAILABLE",
            ArmoraError::InvalidSignature(_) => "INVALID_SIGNATURE",
            ArmoraError::NotFound(_) => "NOT_FOUND",
            ArmoraError::Unavailable(_) => "SERVICE_UNAVAILABLE",
            ArmoraError::Storage(_) => "STORAGE_ERROR",
        }
    }
}

impl From<validator::ValidationErrors> for ArmoraError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ArmoraError::Validation(errors.to_string())
    }
}

impl IntoResponse for ArmoraError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            // Storage details stay in the logs.
            ArmoraError::Storage(e) => {
                tracing::error!(error = %e, "storage failure");
                "Internal storage error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ApiResponse::<()>::failure(self.code(), message))).into_response()
    }
}

pub type ArmoraResult<T> = Result<T, ArmoraError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_not_completed_echoes_status() {
        let err = ArmoraError::PaymentNotCompleted {
            status: "processing".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("processing"));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ArmoraError::Auth("missing token".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ArmoraError::PaymentProviderUnavailable("timeout".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ArmoraError::NotFound("booking".into()).status_code(),
            StatusCode::NOT_FOUND
        );
    }
}
