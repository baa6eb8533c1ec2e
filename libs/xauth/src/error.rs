//! Error types for the authentication flows

use crate::account::AccountState;
use thiserror::Error;

/// Errors that can occur while running an authentication flow
#[derive(Error, Debug)]
pub enum XAuthError {
    /// A caller-supplied value was empty or malformed
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The response body was expected to be JSON but was not
    #[error("Response is not valid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A token, verifier or field could not be found in a response
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// The OAuth1 request token was rejected by the authenticate page
    #[error("The oauth_token is invalid or has expired")]
    InvalidOAuthToken,

    /// The authorize page reported that the account is suspended
    #[error("This account is suspended")]
    AccountSuspended,

    /// A CSRF challenge was issued but no CSRF cookie was set
    #[error("CSRF token required but no ct0 cookie was found")]
    MissingCsrfCookie,

    /// The API classified the session credential
    #[error("token state: {0}")]
    AccountState(AccountState),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// TLS client construction failed
    #[error("TLS error: {0}")]
    Tls(String),

    /// File I/O error
    #[error("File I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// TOML deserialization error
    #[error("TOML deserialization error: {0}")]
    TomlDeError(#[from] toml::de::Error),
}

impl XAuthError {
    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an extraction error
    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// The account classification carried by this error, if any
    pub fn account_state(&self) -> Option<AccountState> {
        match self {
            Self::AccountState(state) => Some(*state),
            Self::AccountSuspended => Some(AccountState::Suspended),
            _ => None,
        }
    }
}

/// Result type alias for authentication operations
pub type XAuthResult<T> = Result<T, XAuthError>;
