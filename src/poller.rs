// One poll cycle: credentials, thermostat fetch, and the single refresh-and-retry

use std::path::PathBuf;

use crate::auth::CredentialManager;
use crate::error::Result;
use crate::http_client::EcobeeHttpClient;
use crate::models::ecobee::ThermostatSnapshot;
use crate::thermostat;

/// Credentials a poll cycle needs
#[derive(Debug, Clone)]
pub struct PollSettings {
    pub api_key: String,
    /// PIN-derived code, only used when no token file exists yet
    pub auth_code: String,
    pub token_file: PathBuf,
}

/// Drives the credential manager and thermostat fetcher
pub struct Poller {
    http: EcobeeHttpClient,
    credentials: CredentialManager,
    settings: PollSettings,
}

impl Poller {
    pub fn new(http: EcobeeHttpClient, settings: PollSettings) -> Self {
        let credentials = CredentialManager::new(http.clone());
        Self::with_credentials(http, credentials, settings)
    }

    pub fn with_credentials(
        http: EcobeeHttpClient,
        credentials: CredentialManager,
        settings: PollSettings,
    ) -> Self {
        Self {
            http,
            credentials,
            settings,
        }
    }

    pub fn credentials(&self) -> &CredentialManager {
        &self.credentials
    }

    /// Fetch readings for every registered thermostat
    ///
    /// An expired access token triggers exactly one refresh and one more fetch.
    /// If ecobee still reports the token as expired, `ExpiredToken` is returned.
    pub async fn poll_once(&mut self) -> Result<Vec<ThermostatSnapshot>> {
        let PollSettings {
            api_key,
            auth_code,
            token_file,
        } = &self.settings;

        let tokens = self
            .credentials
            .obtain(api_key, auth_code, token_file)
            .await?;

        match thermostat::fetch_all(&self.http, &tokens.access_token).await {
            Err(e) if e.is_retryable() => {
                tracing::warn!("Refreshing tokens and retrying thermostat request once");
                let tokens = self.credentials.refresh(api_key, token_file).await?;

                thermostat::fetch_all(&self.http, &tokens.access_token)
                    .await
                    .inspect_err(|e| {
                        if e.is_retryable() {
                            tracing::error!("Access token still expired after refresh, giving up");
                        }
                    })
            }
            result => result,
        }
    }
}
