use serde::{Deserialize, Serialize};

/// Payload status code ecobee uses for an expired access token
pub const STATUS_TOKEN_EXPIRED: i64 = 14;

// ==================================================================================================
// Request Models
// ==================================================================================================

/// Body of the `json` query parameter sent to the thermostat endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ThermostatRequest {
    pub selection: Selection,
}

/// Which thermostats to return and what to include
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub selection_type: String,
    pub selection_match: String,
    pub include_alerts: bool,
    pub include_runtime: bool,
}

impl ThermostatRequest {
    /// All registered thermostats with runtime data
    pub fn registered_with_runtime() -> Self {
        Self {
            selection: Selection {
                selection_type: "registered".to_string(),
                selection_match: String::new(),
                include_alerts: false,
                include_runtime: true,
            },
        }
    }
}

// ==================================================================================================
// Response Models
// ==================================================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThermostatsResponse {
    pub thermostat_list: Vec<Thermostat>,
    pub page: Page,
    pub status: Status,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Status {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Page {
    pub page: i64,
    pub total_pages: i64,
    pub page_size: i64,
    pub total: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Thermostat {
    pub identifier: String,
    pub name: String,
    pub thermostat_rev: String,
    pub runtime: Runtime,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Runtime {
    pub connected: bool,
    pub actual_temperature: i64,
    pub actual_humidity: i64,
    pub desired_heat: i64,
    pub desired_cool: i64,
}

// ==================================================================================================
// Snapshot
// ==================================================================================================

/// Readings for one thermostat from a single fetch
///
/// Temperatures are kept in ecobee's raw tenths of a degree; use the
/// `*_degrees` accessors for the scaled values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThermostatSnapshot {
    pub identifier: String,
    pub name: String,
    pub revision: String,
    pub connected: bool,
    pub actual_temperature: i64,
    pub actual_humidity: i64,
    pub desired_heat: i64,
    pub desired_cool: i64,
}

impl From<Thermostat> for ThermostatSnapshot {
    fn from(t: Thermostat) -> Self {
        Self {
            identifier: t.identifier,
            name: t.name,
            revision: t.thermostat_rev,
            connected: t.runtime.connected,
            actual_temperature: t.runtime.actual_temperature,
            actual_humidity: t.runtime.actual_humidity,
            desired_heat: t.runtime.desired_heat,
            desired_cool: t.runtime.desired_cool,
        }
    }
}

impl ThermostatSnapshot {
    pub fn actual_temperature_degrees(&self) -> f64 {
        tenths_to_degrees(self.actual_temperature)
    }

    pub fn desired_heat_degrees(&self) -> f64 {
        tenths_to_degrees(self.desired_heat)
    }

    pub fn desired_cool_degrees(&self) -> f64 {
        tenths_to_degrees(self.desired_cool)
    }
}

/// Convert ecobee's integer tenths of a degree to degrees
pub fn tenths_to_degrees(raw: i64) -> f64 {
    raw as f64 / 10.0
}
