//! Error types for indy-client

use thiserror::Error;

/// Errors that can occur talking to the repository service or the SSO server
#[derive(Error, Debug)]
pub enum IndyError {
    /// Transport-level failure (connect, TLS, timeout)
    #[error("HTTP error: {0}")]
    Http(String),

    /// The service answered with a status the caller did not expect
    #[error("{method} {url} returned {status}: {body}")]
    UnexpectedStatus {
        method: &'static str,
        url: String,
        status: u16,
        body: String,
    },

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Promotion call succeeded at the HTTP level but the service reported an error
    #[error("Promotion from {source_key} rejected: {message}")]
    PromotionRejected { source_key: String, message: String },

    /// Store key could not be parsed
    #[error("Invalid store key: {0}")]
    InvalidStoreKey(String),

    /// Base URL could not be parsed or joined
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// SSO section is incomplete for the selected grant type
    #[error("SSO is misconfigured: {0}")]
    SsoMisconfigured(String),

    /// Token endpoint answered without an access token
    #[error("SSO token response did not contain an access_token")]
    MissingAccessToken,
}

impl From<reqwest::Error> for IndyError {
    fn from(err: reqwest::Error) -> Self {
        IndyError::Http(err.to_string())
    }
}

impl From<url::ParseError> for IndyError {
    fn from(err: url::ParseError) -> Self {
        IndyError::InvalidUrl(err.to_string())
    }
}

impl IndyError {
    /// Whether this error came from the service rejecting a promotion.
    pub fn is_rejection(&self) -> bool {
        matches!(self, IndyError::PromotionRejected { .. })
    }
}
