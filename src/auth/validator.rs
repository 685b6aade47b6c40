//! Access-token validation.

use reqwest::Client;
use tracing::debug;

/// Probe path. Any cheap authenticated GET works; the partner profile is the
/// smallest response the backend offers.
const PROBE_PATH: &str = "/partners/me";

/// Checks whether the backend still accepts an access token.
///
/// Fail-closed: a transport failure, a timeout, or any non-success status all
/// count as invalid. An ambiguous answer is never treated as "still valid".
pub struct TokenValidator {
    client: Client,
    api_base_url: String,
}

impl TokenValidator {
    pub fn new(client: Client, api_base_url: impl Into<String>) -> Self {
        Self {
            client,
            api_base_url: api_base_url.into(),
        }
    }

    pub async fn validate(&self, access_token: &str) -> bool {
        let url = format!("{}{}", self.api_base_url, PROBE_PATH);
        match self.client.get(&url).bearer_auth(access_token).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                debug!(status = %response.status(), "Token probe rejected");
                false
            }
            Err(e) => {
                debug!(error = %e, "Token probe did not reach the backend");
                false
            }
        }
    }
}
