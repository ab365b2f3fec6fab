// Outside temperature lookup (OpenWeatherMap current weather by zip code)

use anyhow::{Context, Result};

use crate::http_client::EcobeeHttpClient;
use crate::models::weather::CurrentWeather;

/// OpenWeatherMap settings
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSettings {
    pub api_key: String,
    pub zip_code: String,
}

/// Current outside temperature in Fahrenheit, `None` when the lookup was rejected
pub async fn current_temperature(
    http: &EcobeeHttpClient,
    settings: &WeatherSettings,
) -> Result<Option<f64>> {
    let zip = format!("{},US", settings.zip_code);
    let request = http.client().get(http.endpoints().weather_url()).query(&[
        ("zip", zip.as_str()),
        ("units", "imperial"),
        ("lang", "en"),
        ("appid", settings.api_key.as_str()),
    ]);

    let (_, body) = http
        .send(request)
        .await
        .context("Failed to request current weather")?;

    let weather: CurrentWeather =
        serde_json::from_str(&body).context("Failed to parse current weather response")?;

    if !weather.is_ok() {
        tracing::warn!(cod = %weather.cod, "Weather lookup was rejected");
        return Ok(None);
    }

    tracing::debug!(
        "Outside temperature in {}: {}",
        weather.name,
        weather.main.temp
    );
    Ok(Some(weather.main.temp))
}
