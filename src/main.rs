use anyhow::Result;
use serde_json::json;

use ecobee_poller::config::{Config, LogFormat};
use ecobee_poller::http_client::EcobeeHttpClient;
use ecobee_poller::influx::InfluxWriter;
use ecobee_poller::models::ecobee::ThermostatSnapshot;
use ecobee_poller::poller::Poller;
use ecobee_poller::weather;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load configuration first (for log level)
    let config = Config::load()?;

    init_logging(&config);

    config.validate()?;

    tracing::info!("ecobee poller starting...");
    tracing::debug!("Token file: {}", config.token_file.display());

    let http = EcobeeHttpClient::new(
        config.endpoints.clone(),
        config.http_connect_timeout,
        config.http_request_timeout,
    )?;

    let mut poller = Poller::new(http.clone(), config.poll_settings());

    let thermostats = match poller.poll_once().await {
        Ok(thermostats) => thermostats,
        Err(e) => {
            tracing::error!("Failed to retrieve thermostats: {}", e);
            if e.needs_reauthorization() {
                tracing::error!("");
                tracing::error!("The stored tokens can no longer be used. To re-authorize:");
                tracing::error!("   1. Request a new PIN for the app in the ecobee developer portal");
                tracing::error!("   2. Enter the PIN under My Apps in the ecobee web portal");
                tracing::error!(
                    "   3. Remove {} and run again with the new authorization code",
                    config.token_file.display()
                );
                tracing::error!("");
            }
            anyhow::bail!("Polling failed: {}", e);
        }
    };

    tracing::info!("Retrieved {} thermostats", thermostats.len());

    let outside_temperature = match &config.weather {
        Some(settings) => match weather::current_temperature(&http, settings).await {
            Ok(temp) => temp,
            Err(e) => {
                tracing::error!("Error getting weather: {:#}", e);
                None
            }
        },
        None => None,
    };

    match &config.influx {
        Some(settings) => {
            let writer = InfluxWriter::new(http.client().clone(), settings.clone());
            for thermostat in &thermostats {
                if let Err(e) = writer.store_temperature(thermostat).await {
                    tracing::error!("Failed to store readings for {}: {:#}", thermostat.name, e);
                }

                if let Some(temp) = outside_temperature {
                    if let Err(e) = writer.store_outside_temperature(temp, &thermostat.name).await {
                        tracing::error!(
                            "Failed to store outside temperature for {}: {:#}",
                            thermostat.name,
                            e
                        );
                    }
                }
            }
        }
        None => print_readings(&thermostats, outside_temperature),
    }

    Ok(())
}

/// Initialize logging with the configured level and format
fn init_logging(config: &Config) {
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(true)
        .with_line_number(true);

    match config.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

/// Print readings as JSON lines on stdout
fn print_readings(thermostats: &[ThermostatSnapshot], outside_temperature: Option<f64>) {
    for t in thermostats {
        let line = json!({
            "identifier": t.identifier,
            "name": t.name,
            "connected": t.connected,
            "actual_temperature": t.actual_temperature_degrees(),
            "actual_humidity": t.actual_humidity,
            "desired_heat": t.desired_heat_degrees(),
            "desired_cool": t.desired_cool_degrees(),
            "outside_temperature": outside_temperature,
        });
        println!("{}", line);
    }
}
