//! Error types for the payproglobal-rs library.
//!
//! This module defines all error types that can occur while building checkout
//! links, validating IPN notifications and talking to the provider API.

use reqwest::StatusCode;
use thiserror::Error;

/// Main error type for PayPro Global operations.
#[derive(Error, Debug)]
pub enum PayProError {
    /// Error during HTTP request/response handling
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Error during JSON serialization/deserialization
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error during Base64 encoding/decoding
    #[error("Base64 error: {0}")]
    Base64Error(#[from] base64::DecodeError),

    /// Error parsing URL
    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    /// Invalid or incomplete configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The SKU has no provider product behind it
    #[error("Unsupported SKU: {0}")]
    UnsupportedSku(String),

    /// Checkout currency is not accepted by the provider and no USD rate exists for it
    #[error("No USD conversion rate available for currency: {0}")]
    MissingConversionRate(String),

    /// IPN signature did not match
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Provider API answered with a non-success HTTP status
    #[error("Provider request failed with status {status}: {body}")]
    TransportError {
        /// HTTP status returned by the provider
        status: u16,
        /// Response body as received
        body: String,
    },

    /// Provider API answered 2xx but reported `isSuccess: false`
    #[error("Provider rejected request: {}", .errors.join("; "))]
    ProviderRejected {
        /// Error messages reported by the provider
        errors: Vec<String>,
    },

    /// Notification field present but not in the expected shape
    #[error("Invalid notification: {0}")]
    InvalidNotification(String),

    /// Missing required field
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// Encryption or decryption of product parameters failed
    #[error("Crypto error: {0}")]
    CryptoError(String),
}

impl PayProError {
    /// HTTP status a webhook receiver should answer with for this error.
    ///
    /// Authentication failures map to 403 so the provider can tell them apart
    /// from transient server errors.
    pub fn status_code(&self) -> StatusCode {
        match self {
            PayProError::AuthenticationFailed(_) => StatusCode::FORBIDDEN,
            PayProError::InvalidNotification(_) | PayProError::MissingField(_) => {
                StatusCode::BAD_REQUEST
            }
            PayProError::TransportError { .. }
            | PayProError::ProviderRejected { .. }
            | PayProError::HttpError(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns true for errors that cannot be fixed by retrying with the same input.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            PayProError::ConfigError(_)
                | PayProError::UnsupportedSku(_)
                | PayProError::MissingConversionRate(_)
        )
    }
}

/// Result type alias for PayPro Global operations.
pub type Result<T> = std::result::Result<T, PayProError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PayProError::UnsupportedSku("enterprise".to_string());
        assert_eq!(err.to_string(), "Unsupported SKU: enterprise");

        let err = PayProError::ProviderRejected {
            errors: vec!["Subscription not found".to_string(), "Bad id".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Provider rejected request: Subscription not found; Bad id"
        );
    }

    #[test]
    fn test_error_conversion() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: PayProError = json_err.into();
        assert!(matches!(err, PayProError::JsonError(_)));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            PayProError::AuthenticationFailed("bad signature".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            PayProError::MissingField("ORDER_ID".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            PayProError::TransportError {
                status: 500,
                body: String::new()
            }
            .status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            PayProError::CryptoError("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_configuration_errors() {
        assert!(PayProError::UnsupportedSku("enterprise".into()).is_configuration_error());
        assert!(PayProError::MissingConversionRate("XYZ".into()).is_configuration_error());
        assert!(!PayProError::AuthenticationFailed("x".into()).is_configuration_error());
    }
}
