// Authentication types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Grant types accepted by the ecobee token endpoint
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GrantType {
    /// One-time exchange of the PIN-derived authorization code
    EcobeePin,
    /// Renewal using the current refresh token
    RefreshToken,
}

impl GrantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantType::EcobeePin => "ecobeePin",
            GrantType::RefreshToken => "refresh_token",
        }
    }
}

/// Access/refresh token pair, as persisted in the token file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }

    /// Both halves present
    pub fn is_complete(&self) -> bool {
        !self.access_token.is_empty() && !self.refresh_token.is_empty()
    }
}

/// In-memory credential state owned by the credential manager
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CredentialState {
    pub tokens: TokenPair,
    /// Unknown when the pair was loaded from disk
    pub expires_at: Option<DateTime<Utc>>,
}

/// Token endpoint success response
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OAuthResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub scope: String,
    pub refresh_token: String,
}

/// Token endpoint error envelope
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AuthErrorResponse {
    pub error: String,
    pub error_description: String,
}

/// Provider error codes with dedicated handling
pub const INVALID_GRANT: &str = "invalid_grant";
pub const SLOW_DOWN: &str = "slow_down";

/// Outcome of a token endpoint call
#[derive(Debug)]
pub enum GrantOutcome {
    Issued(OAuthResponse),
    Rejected(AuthErrorResponse),
}
