use serde::Deserialize;

/// OpenWeatherMap current weather response (only the fields we read)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CurrentWeather {
    /// Numeric on success, a string such as "404" on errors
    pub cod: serde_json::Value,
    pub name: String,
    pub main: MainReadings,
}

impl CurrentWeather {
    /// Whether the lookup succeeded
    pub fn is_ok(&self) -> bool {
        match &self.cod {
            serde_json::Value::Number(n) => n.as_i64() == Some(200),
            serde_json::Value::String(s) => s == "200",
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MainReadings {
    pub temp: f64,
    pub humidity: f64,
}
