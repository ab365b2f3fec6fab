// Thermostat telemetry fetch

use crate::error::{EcobeeError, Result};
use crate::http_client::EcobeeHttpClient;
use crate::models::ecobee::{
    ThermostatRequest, ThermostatSnapshot, ThermostatsResponse, STATUS_TOKEN_EXPIRED,
};

/// Retrieve all registered thermostats with their runtime readings
///
/// Returns `EcobeeError::ExpiredToken` when ecobee reports status code 14 in the
/// payload. The HTTP status is ignored for this purpose, since ecobee answers an
/// expired token with a 500 carrying the status in the body. On
/// `ExpiredToken` the caller should refresh and retry once.
pub async fn fetch_all(
    http: &EcobeeHttpClient,
    access_token: &str,
) -> Result<Vec<ThermostatSnapshot>> {
    tracing::info!("Retrieving thermostats and their readings");

    let selection = serde_json::to_string(&ThermostatRequest::registered_with_runtime())
        .map_err(|source| EcobeeError::Decode {
            context: "thermostat selection",
            source,
        })?;

    let request = http
        .client()
        .get(http.endpoints().thermostat_url())
        .bearer_auth(access_token)
        .header("Content-Type", "application/json;charset=UTF-8")
        .header("cache-control", "no-cache")
        .query(&[("json", selection.as_str())]);

    let (http_status, body) = http.send(request).await?;

    let response: ThermostatsResponse =
        serde_json::from_str(&body).map_err(|source| {
            tracing::error!(status = %http_status, "Error decoding thermostat response");
            EcobeeError::Decode {
                context: "thermostat response",
                source,
            }
        })?;

    match response.status.code {
        STATUS_TOKEN_EXPIRED => {
            tracing::warn!("Access token is expired, it must be refreshed");
            Err(EcobeeError::ExpiredToken)
        }
        0 => {
            tracing::debug!(
                count = response.thermostat_list.len(),
                "Thermostat readings received"
            );
            Ok(into_snapshots(response))
        }
        code => {
            tracing::warn!(
                code,
                message = %response.status.message,
                "ecobee returned a non-zero status"
            );
            Ok(into_snapshots(response))
        }
    }
}

fn into_snapshots(response: ThermostatsResponse) -> Vec<ThermostatSnapshot> {
    response
        .thermostat_list
        .into_iter()
        .map(ThermostatSnapshot::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::Endpoints;
    use mockito::{Matcher, ServerGuard};

    fn client_for(server: &ServerGuard) -> EcobeeHttpClient {
        let endpoints = Endpoints {
            api_base: server.url(),
            weather_base: server.url(),
        };
        EcobeeHttpClient::new(endpoints, 5, 10).unwrap()
    }

    const TWO_THERMOSTATS: &str = r#"{
        "page": {"page": 1, "totalPages": 1, "pageSize": 2, "total": 2},
        "thermostatList": [
            {"identifier": "1", "name": "Upstairs", "thermostatRev": "r1",
             "runtime": {"connected": true, "actualTemperature": 725, "actualHumidity": 40,
                         "desiredHeat": 680, "desiredCool": 780}},
            {"identifier": "2", "name": "Basement", "thermostatRev": "r2",
             "runtime": {"connected": false, "actualTemperature": 640, "actualHumidity": 55,
                         "desiredHeat": 620, "desiredCool": 800}}
        ],
        "status": {"code": 0, "message": ""}
    }"#;

    #[tokio::test]
    async fn test_fetch_all_sends_selection_and_bearer() {
        let mut server = mockito::Server::new_async().await;
        let selection = r#"{"selection":{"selectionType":"registered","selectionMatch":"","includeAlerts":false,"includeRuntime":true}}"#;
        let mock = server
            .mock("GET", "/1/thermostat")
            .match_header("authorization", "Bearer access-1")
            .match_query(Matcher::UrlEncoded("json".into(), selection.into()))
            .with_status(200)
            .with_body(TWO_THERMOSTATS)
            .expect(1)
            .create_async()
            .await;

        let snapshots = fetch_all(&client_for(&server), "access-1").await.unwrap();

        mock.assert_async().await;
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].name, "Upstairs");
        assert_eq!(snapshots[0].actual_temperature, 725);
        assert_eq!(snapshots[0].actual_temperature_degrees(), 72.5);
        assert!(!snapshots[1].connected);
        assert_eq!(snapshots[1].revision, "r2");
    }

    #[tokio::test]
    async fn test_fetch_all_status_14_is_expired() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/1/thermostat")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body(r#"{"status": {"code": 14, "message": "Authentication token has expired."}}"#)
            .create_async()
            .await;

        let err = fetch_all(&client_for(&server), "stale").await.unwrap_err();
        assert!(matches!(err, EcobeeError::ExpiredToken));
    }

    #[tokio::test]
    async fn test_fetch_all_status_14_with_devices_is_still_expired() {
        let mut server = mockito::Server::new_async().await;
        let body = TWO_THERMOSTATS.replace(r#""code": 0"#, r#""code": 14"#);
        let _mock = server
            .mock("GET", "/1/thermostat")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let err = fetch_all(&client_for(&server), "stale").await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_fetch_all_ignores_http_error_status_without_expiry() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/1/thermostat")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body(r#"{"status": {"code": 3, "message": "Processing error."}}"#)
            .create_async()
            .await;

        let snapshots = fetch_all(&client_for(&server), "token").await.unwrap();
        assert!(snapshots.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_all_malformed_body_is_decode_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/1/thermostat")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("upstream timeout")
            .create_async()
            .await;

        let err = fetch_all(&client_for(&server), "token").await.unwrap_err();
        assert!(matches!(err, EcobeeError::Decode { .. }));
    }
}
