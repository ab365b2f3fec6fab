// Token endpoint calls (PIN grant and refresh grant)

use super::types::{AuthErrorResponse, GrantOutcome, GrantType, OAuthResponse};
use crate::error::{EcobeeError, Result};
use crate::http_client::EcobeeHttpClient;

/// Call the token endpoint with the given grant
///
/// ecobee passes grant parameters in the query string and answers errors with
/// a 4xx and a JSON envelope, so the body is interpreted regardless of status.
pub async fn request_grant(
    http: &EcobeeHttpClient,
    grant: GrantType,
    code: &str,
    api_key: &str,
) -> Result<GrantOutcome> {
    tracing::debug!(grant_type = grant.as_str(), "Requesting tokens from ecobee");

    let request = http.client().post(http.endpoints().token_url()).query(&[
        ("grant_type", grant.as_str()),
        ("code", code),
        ("client_id", api_key),
    ]);

    let (status, body) = http.send(request).await?;
    let outcome = parse_grant_response(&body)?;

    if let GrantOutcome::Rejected(ref e) = outcome {
        tracing::warn!(
            status = %status,
            grant_type = grant.as_str(),
            error = %e.error,
            description = %e.error_description,
            "ecobee rejected token request"
        );
    }

    Ok(outcome)
}

/// Interpret a token endpoint body
fn parse_grant_response(body: &str) -> Result<GrantOutcome> {
    let response: OAuthResponse =
        serde_json::from_str(body).map_err(|source| EcobeeError::Decode {
            context: "token response",
            source,
        })?;

    if !response.access_token.is_empty() {
        return Ok(GrantOutcome::Issued(response));
    }

    let error: AuthErrorResponse =
        serde_json::from_str(body).map_err(|source| EcobeeError::Decode {
            context: "token error response",
            source,
        })?;

    Ok(GrantOutcome::Rejected(error))
}
