// InfluxDB v2 writer for thermostat and outside temperature readings

use anyhow::{Context, Result};
use chrono::Utc;
use reqwest::Client;

use crate::models::ecobee::ThermostatSnapshot;

const MEASUREMENT: &str = "stat";

/// Connection settings for the InfluxDB v2 write API
#[derive(Debug, Clone, PartialEq)]
pub struct InfluxSettings {
    pub uri: String,
    pub token: String,
    pub org: String,
    pub bucket: String,
}

/// Writes readings as line protocol points
pub struct InfluxWriter {
    client: Client,
    settings: InfluxSettings,
}

impl InfluxWriter {
    pub fn new(client: Client, settings: InfluxSettings) -> Self {
        Self { client, settings }
    }

    /// Store desired heat, desired cool and actual temperature for a thermostat
    ///
    /// Values are written in degrees; the snapshot's raw tenths are scaled here.
    pub async fn store_temperature(&self, snapshot: &ThermostatSnapshot) -> Result<()> {
        let line = temperature_point(snapshot, Utc::now().timestamp());
        self.write(&line).await?;
        tracing::info!("Wrote {} readings to influx", snapshot.name);
        Ok(())
    }

    /// Store the current outside temperature alongside a thermostat's readings
    pub async fn store_outside_temperature(&self, temperature: f64, name: &str) -> Result<()> {
        let line = outside_temperature_point(temperature, name, Utc::now().timestamp());
        self.write(&line).await?;
        tracing::info!("Wrote outside temperature for {} to influx", name);
        Ok(())
    }

    async fn write(&self, body: &str) -> Result<()> {
        let url = format!("{}/api/v2/write", self.settings.uri.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Token {}", self.settings.token))
            .header("Content-Type", "text/plain; charset=utf-8")
            .query(&[
                ("org", self.settings.org.as_str()),
                ("bucket", self.settings.bucket.as_str()),
                ("precision", "s"),
            ])
            .body(body.to_string())
            .send()
            .await
            .context("Failed to send write request to InfluxDB")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Error writing point to influx: {} - {}", status, error_text);
            anyhow::bail!("InfluxDB write failed: {} - {}", status, error_text);
        }

        Ok(())
    }
}

/// Line protocol point for a thermostat's temperatures
fn temperature_point(snapshot: &ThermostatSnapshot, timestamp: i64) -> String {
    format!(
        "{},ecobee_thermostat_name={},unit=temperature ecobee_actual_temperature={},ecobee_desired_cool={},ecobee_desired_heat={} {}",
        MEASUREMENT,
        escape_tag(&snapshot.name),
        snapshot.actual_temperature_degrees(),
        snapshot.desired_cool_degrees(),
        snapshot.desired_heat_degrees(),
        timestamp
    )
}

/// Line protocol point for the outside temperature
fn outside_temperature_point(temperature: f64, name: &str, timestamp: i64) -> String {
    format!(
        "{},ecobee_thermostat_name={},unit=temperature current_outside_temperature={} {}",
        MEASUREMENT,
        escape_tag(name),
        temperature,
        timestamp
    )
}

/// Escape commas, equals signs and spaces in tag values
fn escape_tag(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, ',' | '=' | ' ') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
