//! Refresh-token exchange.

use std::sync::Arc;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{AuthError, CredentialBundle, CredentialStore};

/// Refresh endpoint path on the accounts service
const REFRESH_PATH: &str = "/auth/refresh-token";

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    #[serde(rename = "refreshToken")]
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    #[serde(rename = "authToken")]
    auth_token: String,
    #[serde(rename = "refreshToken")]
    refresh_token: String,
    #[serde(rename = "expiresIn")]
    expires_in: i64,
    #[serde(rename = "tokenType")]
    token_type: String,
}

/// Exchanges a refresh token for a fresh backend pair.
///
/// A successful exchange is persisted before it is returned: a caller can
/// never observe a new access token that is not already durably stored.
///
/// Only an explicit client-error response counts as a rejected token.
/// Transport failures, timeouts, server errors, and unreadable bodies say
/// nothing about the token itself and resolve as transient.
pub struct TokenRefresher {
    client: Client,
    auth_base_url: String,
    store: Arc<dyn CredentialStore>,
}

impl TokenRefresher {
    pub fn new(
        client: Client,
        auth_base_url: impl Into<String>,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            client,
            auth_base_url: auth_base_url.into(),
            store,
        }
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<CredentialBundle, AuthError> {
        if refresh_token.is_empty() {
            return Err(AuthError::NoCredentials);
        }

        let url = format!("{}{}", self.auth_base_url, REFRESH_PATH);
        let response = match self
            .client
            .post(&url)
            .json(&RefreshRequest { refresh_token })
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Refresh request did not reach the backend");
                return Err(AuthError::TransientNetworkFailure(e.to_string()));
            }
        };

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Refresh token rejected");
            return Err(AuthError::RejectedRefreshToken("session expired".to_string()));
        }
        if !status.is_success() {
            warn!(status = %status, "Refresh endpoint unavailable");
            return Err(AuthError::TransientNetworkFailure(format!(
                "refresh endpoint returned {}",
                status
            )));
        }

        let parsed: RefreshResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "Unreadable refresh response");
                return Err(AuthError::TransientNetworkFailure(e.to_string()));
            }
        };

        let bundle = CredentialBundle::new(
            parsed.auth_token,
            parsed.refresh_token,
            parsed.token_type,
            parsed.expires_in,
        );
        self.store.put(&bundle)?;
        info!("Access token refreshed");
        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{any, body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> Client {
        Client::builder()
            .timeout(std::time::Duration::from_secs(5))
            .build()
            .expect("client")
    }

    fn test_store() -> (tempfile::TempDir, Arc<dyn CredentialStore>) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store: Arc<dyn CredentialStore> = Arc::new(crate::auth::FileStore::new(
            dir.path().to_path_buf(),
            "test-device-secret",
        ));
        (dir, store)
    }

    #[tokio::test]
    async fn test_success_persists_before_returning() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh-token"))
            .and(body_json(serde_json::json!({ "refreshToken": "R1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "authToken": "A2",
                "refreshToken": "R2",
                "expiresIn": 3600,
                "tokenType": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (_dir, store) = test_store();
        let refresher = TokenRefresher::new(client(), server.uri(), Arc::clone(&store));
        let bundle = refresher.refresh("R1").await.expect("refresh should succeed");

        assert_eq!(bundle.access_token, "A2");
        assert_eq!(bundle.refresh_token, "R2");
        assert_eq!(bundle.expires_in, 3600);

        let stored = store.get().expect("get should succeed").expect("bundle stored");
        assert_eq!(stored, bundle);
    }

    #[tokio::test]
    async fn test_client_error_is_rejected_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh-token"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let (_dir, store) = test_store();
        let refresher = TokenRefresher::new(client(), server.uri(), Arc::clone(&store));
        let err = refresher.refresh("R1").await.expect_err("refresh should fail");

        assert!(matches!(err, AuthError::RejectedRefreshToken(_)));
        assert!(store.get().expect("get should succeed").is_none());
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh-token"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let (_dir, store) = test_store();
        let refresher = TokenRefresher::new(client(), server.uri(), store);
        let err = refresher.refresh("R1").await.expect_err("refresh should fail");

        assert!(matches!(err, AuthError::TransientNetworkFailure(_)));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transient() {
        let (_dir, store) = test_store();
        let refresher = TokenRefresher::new(client(), "http://127.0.0.1:1", Arc::clone(&store));
        let err = refresher.refresh("R1").await.expect_err("refresh should fail");

        assert!(matches!(err, AuthError::TransientNetworkFailure(_)));
        assert!(store.get().expect("get should succeed").is_none());
    }

    #[tokio::test]
    async fn test_malformed_response_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh-token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let (_dir, store) = test_store();
        let refresher = TokenRefresher::new(client(), server.uri(), store);
        let err = refresher.refresh("R1").await.expect_err("refresh should fail");

        assert!(matches!(err, AuthError::TransientNetworkFailure(_)));
    }

    #[tokio::test]
    async fn test_empty_refresh_token_makes_no_call() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let (_dir, store) = test_store();
        let refresher = TokenRefresher::new(client(), server.uri(), store);
        let err = refresher.refresh("").await.expect_err("refresh should fail");

        assert!(matches!(err, AuthError::NoCredentials));
    }
}
