use chrono::{DateTime, Duration, Utc};
use std::path::Path;

use super::refresh;
use super::store;
use super::types::{
    CredentialState, GrantOutcome, GrantType, OAuthResponse, TokenPair, INVALID_GRANT, SLOW_DOWN,
};
use crate::error::{EcobeeError, Result};
use crate::http_client::EcobeeHttpClient;

/// Credential manager
/// Owns the token pair and its expiry for the lifetime of the poller, and keeps
/// the token file in step with it.
///
/// Mutating operations take `&mut self`; callers sharing a manager across tasks
/// must serialize `obtain`/`refresh` themselves, since ecobee invalidates a
/// refresh token once it has been used.
pub struct CredentialManager {
    /// HTTP client for token endpoint requests
    http: EcobeeHttpClient,

    /// Current tokens and expiry
    state: CredentialState,
}

impl CredentialManager {
    /// Create a manager with no credentials held yet
    pub fn new(http: EcobeeHttpClient) -> Self {
        Self::with_state(http, CredentialState::default())
    }

    /// Create a manager seeded with previously held state
    pub fn with_state(http: EcobeeHttpClient, state: CredentialState) -> Self {
        Self { http, state }
    }

    pub fn state(&self) -> &CredentialState {
        &self.state
    }

    pub fn into_state(self) -> CredentialState {
        self.state
    }

    pub fn tokens(&self) -> &TokenPair {
        &self.state.tokens
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.state.expires_at
    }

    /// Check if the access token is expired
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Check expiry against an explicit instant
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.state.expires_at {
            None => true, // No expiration info, assume expired
            Some(exp) => now >= exp,
        }
    }

    /// Produce a usable token pair
    ///
    /// A pair already on disk is returned as-is; staleness is discovered by the
    /// thermostat call, not checked here. Without a token file the PIN-derived
    /// authorization code is exchanged for a new pair.
    pub async fn obtain(
        &mut self,
        api_key: &str,
        auth_code: &str,
        location: &Path,
    ) -> Result<TokenPair> {
        if store::exists(location) {
            tracing::info!("Using existing tokens from {}", location.display());
            let tokens = store::load(location)?;
            self.state = CredentialState {
                tokens: tokens.clone(),
                expires_at: None,
            };
            return Ok(tokens);
        }

        tracing::info!("No token file at {}, exchanging authorization code", location.display());

        let outcome =
            refresh::request_grant(&self.http, GrantType::EcobeePin, auth_code, api_key).await?;
        let issued_at = Utc::now();

        match outcome {
            GrantOutcome::Issued(response) => self.accept(response, issued_at, location),
            GrantOutcome::Rejected(e) if e.error == INVALID_GRANT => {
                tracing::warn!("Authorization code rejected (invalid_grant), attempting refresh");
                let refresh_token = self.state.tokens.refresh_token.clone();
                self.refresh_with(api_key, &refresh_token, location).await
            }
            GrantOutcome::Rejected(e) if e.error == SLOW_DOWN => {
                tracing::error!("ecobee is rate limiting: {}", e.error_description);
                Err(EcobeeError::RateLimited(e.error_description))
            }
            GrantOutcome::Rejected(e) => Err(EcobeeError::Unaccounted {
                error: e.error,
                description: e.error_description,
            }),
        }
    }

    /// Exchange the refresh token stored at `location` for a new pair
    pub async fn refresh(&mut self, api_key: &str, location: &Path) -> Result<TokenPair> {
        let existing = store::load(location)?;
        self.refresh_with(api_key, &existing.refresh_token, location).await
    }

    async fn refresh_with(
        &mut self,
        api_key: &str,
        refresh_token: &str,
        location: &Path,
    ) -> Result<TokenPair> {
        if refresh_token.is_empty() {
            tracing::error!("Refresh requested but no refresh token is held");
            return Err(EcobeeError::MissingRefreshToken);
        }

        tracing::info!("Refreshing ecobee tokens...");

        let outcome =
            refresh::request_grant(&self.http, GrantType::RefreshToken, refresh_token, api_key)
                .await?;
        let issued_at = Utc::now();

        match outcome {
            GrantOutcome::Issued(response) => self.accept(response, issued_at, location),
            GrantOutcome::Rejected(e) => {
                tracing::error!("Unable to refresh tokens: {} - {}", e.error, e.error_description);
                Err(EcobeeError::RefreshRejected {
                    error: e.error,
                    description: e.error_description,
                })
            }
        }
    }

    /// Record newly issued tokens in memory and on disk
    fn accept(
        &mut self,
        response: OAuthResponse,
        issued_at: DateTime<Utc>,
        location: &Path,
    ) -> Result<TokenPair> {
        let expires_at = expiry_instant(issued_at, response.expires_in)?;

        let tokens = TokenPair::new(response.access_token, response.refresh_token);
        store::save(&tokens, location)?;

        self.state = CredentialState {
            tokens: tokens.clone(),
            expires_at: Some(expires_at),
        };

        tracing::info!(
            "Tokens issued (access: {}...), expires: {}",
            tokens.access_token.get(..8).unwrap_or(&tokens.access_token),
            expires_at.to_rfc3339()
        );

        Ok(tokens)
    }
}

/// `issued_at + expires_in`, rejecting negative or out-of-range lifetimes
fn expiry_instant(issued_at: DateTime<Utc>, expires_in: i64) -> Result<DateTime<Utc>> {
    if expires_in < 0 {
        return Err(EcobeeError::InvalidExpiry(expires_in));
    }

    Duration::try_seconds(expires_in)
        .and_then(|lifetime| issued_at.checked_add_signed(lifetime))
        .ok_or(EcobeeError::InvalidExpiry(expires_in))
}
