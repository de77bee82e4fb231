use thiserror::Error;

use super::common::ApiErrorDetails;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("API returned error (HTTP {status}): {message}")]
    ApiError {
        status: u16,
        message: String,
        #[source]
        details: Option<Box<ApiErrorDetails>>,
    },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Authentication failed (HTTP {0}), check the API key")]
    AuthError(u16),

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Too many requests, rate limited")]
    RateLimited,

    #[error("Service unavailable, retry later")]
    ServiceUnavailable,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_not_found_reports_not_found() {
        assert!(ApiError::NotFound("/api/certificates/Certificates-1".into()).is_not_found());
        assert!(!ApiError::RateLimited.is_not_found());
        assert!(!ApiError::ApiError {
            status: 400,
            message: "bad".into(),
            details: None,
        }
        .is_not_found());
    }

    #[test]
    fn api_error_message_includes_status() {
        let err = ApiError::ApiError {
            status: 409,
            message: "Name must be unique".into(),
            details: None,
        };
        assert_eq!(
            err.to_string(),
            "API returned error (HTTP 409): Name must be unique"
        );
    }
}
