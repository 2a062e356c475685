//! Authentication error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Authentication error
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("Rate limit exceeded (remaining: {remaining})")]
    RateLimited { remaining: i64 },

    /// Wrong code, no code, or expired code. Deliberately undifferentiated.
    #[error("Invalid or expired OTP")]
    OtpNotFoundOrExpired,

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("User not found")]
    UserNotFound,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AuthError {
    /// HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::OtpNotFoundOrExpired => StatusCode::BAD_REQUEST,

            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,

            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,

            Self::Unauthorized | Self::InvalidToken | Self::TokenExpired => {
                StatusCode::UNAUTHORIZED
            }

            Self::UserNotFound => StatusCode::NOT_FOUND,

            Self::BackendUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,

            Self::Signing(_) | Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable error code for clients
    pub fn error_code(&self) -> &str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::PayloadTooLarge => "payload_too_large",
            Self::RateLimited { .. } => "rate_limited",
            Self::OtpNotFoundOrExpired => "invalid_otp",
            Self::BackendUnavailable(_) => "backend_unavailable",
            Self::Signing(_) => "server_error",
            Self::Unauthorized => "unauthorized",
            Self::InvalidToken => "invalid_token",
            Self::TokenExpired => "token_expired",
            Self::UserNotFound => "not_found",
            Self::Config(_) => "server_error",
        }
    }

    /// User facing message
    pub fn user_message(&self) -> &str {
        match self {
            Self::Validation(_) => "Invalid request",
            Self::PayloadTooLarge => "Request body too large",
            Self::RateLimited { .. } => "Rate limit exceeded",
            Self::OtpNotFoundOrExpired => "Invalid or expired OTP",
            Self::BackendUnavailable(_) => "Service temporarily unavailable",
            Self::Signing(_) | Self::Config(_) => "Internal server error",
            Self::Unauthorized => "Authentication required",
            Self::InvalidToken => "Invalid access token",
            Self::TokenExpired => "Access token expired",
            Self::UserNotFound => "User not found",
        }
    }

    /// Detail safe to return to the caller. Backend and signing details stay in the logs.
    fn public_details(&self) -> Option<String> {
        match self {
            Self::Validation(reason) => Some(reason.clone()),
            Self::BackendUnavailable(_) | Self::Signing(_) | Self::Config(_) => None,
            other => Some(other.to_string()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let mut body = json!({
            "code": self.error_code(),
            "message": self.user_message(),
        });
        if let Some(details) = self.public_details() {
            body["details"] = json!(details);
        }
        if let Self::RateLimited { remaining } = self {
            body["remaining"] = json!(remaining);
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            AuthError::Validation("phone".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::RateLimited { remaining: -1 }.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(AuthError::OtpNotFoundOrExpired.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::TokenExpired.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthError::BackendUnavailable("io".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn test_backend_detail_not_exposed() {
        let response =
            AuthError::BackendUnavailable("connection refused 10.0.0.5:6379".into()).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(!text.contains("10.0.0.5"));
        assert!(text.contains("backend_unavailable"));
    }

    #[tokio::test]
    async fn test_rate_limited_body_carries_remaining() {
        let response = AuthError::RateLimited { remaining: -2 }.into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["remaining"], -2);
        assert_eq!(body["code"], "rate_limited");
    }
}
