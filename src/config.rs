use anyhow::{Context, Result};
use clap::Parser;
use dialoguer::{Confirm, Input, Password};
use serde::Deserialize;
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};

use crate::http_client::{Endpoints, DEFAULT_API_BASE, DEFAULT_WEATHER_BASE};
use crate::influx::InfluxSettings;
use crate::poller::PollSettings;
use crate::weather::WeatherSettings;

const CONFIG_FILE_NAME: &str = "ecobee.yml";
const DEFAULT_TOKEN_FILE: &str = "tokens.json";

/// ecobee poller - thermostat telemetry to InfluxDB
#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to ecobee.yml (default: ./, /etc/ecobee/, ~/.ecobee/)
    #[arg(short = 'c', long, env = "ECOBEE_CONFIG")]
    pub config: Option<PathBuf>,

    /// ecobee application API key
    #[arg(short = 'k', long, env = "ECOBEE_API_KEY")]
    pub api_key: Option<String>,

    /// Authorization code from the PIN grant (first run only)
    #[arg(short = 'a', long, env = "ECOBEE_AUTH_CODE")]
    pub auth_code: Option<String>,

    /// Where access/refresh tokens are persisted
    #[arg(short = 't', long, env = "ECOBEE_TOKEN_FILE")]
    pub token_file: Option<String>,

    /// ecobee API base URL
    #[arg(long, env = "ECOBEE_API_URL")]
    pub api_url: Option<String>,

    /// InfluxDB URI (readings are printed to stdout when unset)
    #[arg(long, env = "INFLUXDB_URI")]
    pub influxdb_uri: Option<String>,

    /// InfluxDB API token
    #[arg(long, env = "INFLUXDB_TOKEN")]
    pub influxdb_token: Option<String>,

    /// InfluxDB bucket
    #[arg(long, env = "INFLUXDB_BUCKET")]
    pub influxdb_bucket: Option<String>,

    /// InfluxDB organization
    #[arg(long, env = "INFLUXDB_ORG")]
    pub influxdb_org: Option<String>,

    /// OpenWeatherMap API key for outside temperature
    #[arg(long, env = "OWM_API_KEY")]
    pub owm_api_key: Option<String>,

    /// US zip code for outside temperature
    #[arg(long, env = "OWM_ZIP_CODE")]
    pub owm_zip_code: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// HTTP connect timeout in seconds
    #[arg(long, env = "HTTP_CONNECT_TIMEOUT", default_value = "10")]
    pub http_connect_timeout: u64,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value = "30")]
    pub http_timeout: u64,
}

/// Settings read from ecobee.yml
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileSettings {
    pub api_token: Option<String>,
    pub auth_code: Option<String>,
    pub token_file: Option<String>,
    pub api_url: Option<String>,
    pub influxdb_uri: Option<String>,
    pub influxdb_token: Option<String>,
    pub influxdb_bucket: Option<String>,
    pub influxdb_org: Option<String>,
    pub owm_api_key: Option<String>,
    pub owm_zip_code: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Config {
    // ecobee credentials
    pub api_key: String,
    pub auth_code: Option<String>,
    pub token_file: PathBuf,

    // HTTP client
    pub endpoints: Endpoints,
    pub http_connect_timeout: u64,
    pub http_request_timeout: u64,

    // Collaborators
    pub influx: Option<InfluxSettings>,
    pub weather: Option<WeatherSettings>,

    // Logging
    pub log_level: String,
    pub log_format: LogFormat,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LogFormat {
    Text,
    Json,
}

impl Config {
    /// Load configuration from all sources with priority: CLI > ENV > ecobee.yml > defaults
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let mut args = CliArgs::parse();

        let file = match find_config_file(args.config.as_deref())? {
            Some(path) => load_file_settings(&path)?,
            None => FileSettings::default(),
        };

        if needs_interactive_setup(&args, &file) {
            let interactive = run_interactive_setup()?;
            args.api_key = Some(interactive.api_key);
            args.auth_code = Some(interactive.auth_code);
            args.token_file = Some(interactive.token_file);
        }

        Self::from_sources(args, file)
    }

    /// Merge CLI/env arguments over file settings
    pub fn from_sources(args: CliArgs, file: FileSettings) -> Result<Self> {
        let api_key = args
            .api_key
            .or(file.api_token)
            .filter(|k| !k.is_empty())
            .context("API key is required (use -k, set ECOBEE_API_KEY, or api_token in ecobee.yml)")?;

        let token_file = args
            .token_file
            .or(file.token_file)
            .map(|s| expand_tilde(&s))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKEN_FILE));

        let endpoints = Endpoints {
            api_base: args
                .api_url
                .or(file.api_url)
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            weather_base: DEFAULT_WEATHER_BASE.to_string(),
        };

        let influx = match args.influxdb_uri.or(file.influxdb_uri) {
            Some(uri) => Some(InfluxSettings {
                uri,
                token: args
                    .influxdb_token
                    .or(file.influxdb_token)
                    .context("INFLUXDB_TOKEN is required when INFLUXDB_URI is set")?,
                org: args
                    .influxdb_org
                    .or(file.influxdb_org)
                    .context("INFLUXDB_ORG is required when INFLUXDB_URI is set")?,
                bucket: args
                    .influxdb_bucket
                    .or(file.influxdb_bucket)
                    .context("INFLUXDB_BUCKET is required when INFLUXDB_URI is set")?,
            }),
            None => None,
        };

        let weather = match (
            args.owm_api_key.or(file.owm_api_key),
            args.owm_zip_code.or(file.owm_zip_code),
        ) {
            (Some(api_key), Some(zip_code)) => Some(WeatherSettings { api_key, zip_code }),
            _ => None,
        };

        Ok(Config {
            api_key,
            auth_code: args.auth_code.or(file.auth_code),
            token_file,
            endpoints,
            http_connect_timeout: args.http_connect_timeout,
            http_request_timeout: args.http_timeout,
            influx,
            weather,
            log_level: args.log_level,
            log_format: parse_log_format(&args.log_format),
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        // Without a token file the PIN-derived code is the only way to get tokens
        if !self.token_file.exists() && self.auth_code.as_deref().unwrap_or("").is_empty() {
            anyhow::bail!(
                "No token file at {} and no authorization code configured (use -a or set ECOBEE_AUTH_CODE)",
                self.token_file.display()
            );
        }

        Ok(())
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            api_key: self.api_key.clone(),
            auth_code: self.auth_code.clone().unwrap_or_default(),
            token_file: self.token_file.clone(),
        }
    }
}

/// Locate ecobee.yml: explicit path, then ./, /etc/ecobee/, ~/.ecobee/
fn find_config_file(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.exists() {
            anyhow::bail!("Config file does not exist: {}", path.display());
        }
        return Ok(Some(path.to_path_buf()));
    }

    let mut candidates = vec![
        PathBuf::from(CONFIG_FILE_NAME),
        PathBuf::from("/etc/ecobee").join(CONFIG_FILE_NAME),
    ];
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".ecobee").join(CONFIG_FILE_NAME));
    }

    Ok(candidates.into_iter().find(|p| p.is_file()))
}

/// Read ecobee.yml
fn load_file_settings(path: &Path) -> Result<FileSettings> {
    tracing::debug!("Reading config file {}", path.display());

    ::config::Config::builder()
        .add_source(::config::File::from(path))
        .build()
        .with_context(|| format!("Failed to read config file: {}", path.display()))?
        .try_deserialize()
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Expand tilde (~) in file paths to user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Parse log format from string
fn parse_log_format(s: &str) -> LogFormat {
    match s.to_lowercase().as_str() {
        "json" => LogFormat::Json,
        _ => LogFormat::Text,
    }
}

// === Interactive Setup ===

/// Interactive setup runs when no source supplies an API key and a human is at the terminal
fn needs_interactive_setup(args: &CliArgs, file: &FileSettings) -> bool {
    args.api_key.is_none() && file.api_token.is_none() && std::io::stdin().is_terminal()
}

/// Configuration collected from interactive setup
#[derive(Debug, Clone)]
pub struct InteractiveConfig {
    pub api_key: String,
    pub auth_code: String,
    pub token_file: String,
}

/// Run interactive setup to collect required configuration
pub fn run_interactive_setup() -> Result<InteractiveConfig> {
    println!();
    println!("ecobee poller - first time setup");
    println!();
    println!("No configuration found. Create an app in the ecobee developer portal,");
    println!("authorize it with its PIN, then enter the API key and authorization code.");
    println!();

    let api_key: String = Password::new()
        .with_prompt("ecobee API key")
        .interact()
        .context("Failed to read API key")?;

    if api_key.is_empty() {
        anyhow::bail!("API key cannot be empty");
    }

    let auth_code: String = Input::new()
        .with_prompt("Authorization code")
        .interact_text()
        .context("Failed to read authorization code")?;

    let token_file: String = Input::new()
        .with_prompt("Token file")
        .default(DEFAULT_TOKEN_FILE.to_string())
        .interact_text()
        .context("Failed to read token file path")?;

    let config = InteractiveConfig {
        api_key,
        auth_code,
        token_file,
    };

    println!();
    let save = Confirm::new()
        .with_prompt(format!("Save configuration to {}?", CONFIG_FILE_NAME))
        .default(true)
        .interact()
        .context("Failed to read save confirmation")?;

    if save {
        save_config_file(&config, Path::new(CONFIG_FILE_NAME))?;
        println!("Configuration saved to {}", CONFIG_FILE_NAME);
    }

    println!();
    Ok(config)
}

/// Write an ecobee.yml holding the interactive answers
fn save_config_file(config: &InteractiveConfig, path: &Path) -> Result<()> {
    // JSON strings are valid YAML double-quoted scalars
    let quote = |s: &str| serde_json::to_string(s).unwrap_or_default();

    let content = format!(
        r#"# ecobee poller configuration
# Generated by interactive setup

api_token: {}
auth_code: {}
token_file: {}

# Optional InfluxDB output
# influxdb_uri: "http://localhost:8086"
# influxdb_token: ""
# influxdb_bucket: ""
# influxdb_org: ""

# Optional outside temperature
# owm_api_key: ""
# owm_zip_code: ""
"#,
        quote(&config.api_key),
        quote(&config.auth_code),
        quote(&config.token_file),
    );

    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(())
}
