// Error handling module
// Defines the error kinds surfaced by the token store, credential manager and telemetry fetcher

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the ecobee core
#[derive(Error, Debug)]
pub enum EcobeeError {
    /// No token file yet (expected on first run)
    #[error("Token file not found: {}", .0.display())]
    TokenFileNotFound(PathBuf),

    /// Token file present but unreadable or not a valid token pair
    #[error("Token file is corrupt: {} ({reason})", path.display())]
    TokenFileCorrupt { path: PathBuf, reason: String },

    /// Token file could not be written
    #[error("Failed to write token file {}: {source}", path.display())]
    TokenFileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Refusing to persist a pair with an empty field
    #[error("Token pair is incomplete, refusing to persist it")]
    IncompleteTokenPair,

    /// Network-level failure talking to a provider
    #[error("Transport error ({kind}): {source}")]
    Transport {
        kind: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// Provider reachable but the payload was malformed
    #[error("Failed to decode {context}: {source}")]
    Decode {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Token endpoint issued a lifetime that cannot be turned into an expiry instant
    #[error("Token response has an invalid expires_in: {0}")]
    InvalidExpiry(i64),

    /// Provider reported status code 14 for the access token
    #[error("Access token expired")]
    ExpiredToken,

    /// Provider asked us to slow down
    #[error("Rate limited by ecobee: {0}")]
    RateLimited(String),

    /// Provider error code we have no handling for
    #[error("Unaccounted for error from ecobee: {error} - {description}")]
    Unaccounted { error: String, description: String },

    /// Refresh token was rejected, the app must be re-authorized
    #[error("Unable to refresh tokens: {error} - {description}")]
    RefreshRejected { error: String, description: String },

    /// A refresh was needed but no refresh token is held
    #[error("Refresh required but no refresh token is available; re-authorize the app")]
    MissingRefreshToken,
}

impl EcobeeError {
    /// Whether the caller may recover automatically (refresh + one retry)
    pub fn is_retryable(&self) -> bool {
        matches!(self, EcobeeError::ExpiredToken)
    }

    /// Whether a fresh PIN authorization would resolve the failure
    pub fn needs_reauthorization(&self) -> bool {
        matches!(
            self,
            EcobeeError::RefreshRejected { .. }
                | EcobeeError::MissingRefreshToken
                | EcobeeError::TokenFileCorrupt { .. }
        )
    }
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, EcobeeError>;
