//! Federated identity-provider bridge.
//!
//! At login the backend may hand out a one-time ticket, which this bridge
//! exchanges for a provider session token. The provider is optional
//! equipment: when no endpoint is configured, or when the provider
//! misbehaves, the backend session carries on without it.

use std::sync::Arc;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AuthError, CredentialStore};

/// Ticket-exchange path on the identity provider
const EXCHANGE_PATH: &str = "/v1/token/exchange";

/// Provider-side token refresh path
const IDENTITY_REFRESH_PATH: &str = "/v1/token/refresh";

#[derive(Debug, Serialize)]
struct ExchangeRequest<'a> {
    ticket: &'a str,
}

#[derive(Debug, Serialize)]
struct IdentityRefreshRequest<'a> {
    #[serde(rename = "identityToken")]
    identity_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct IdentityTokenResponse {
    #[serde(rename = "identityToken")]
    identity_token: String,
}

/// Bridge to the federated identity provider.
pub struct IdentityBridge {
    client: Client,
    base_url: Option<String>,
    store: Arc<dyn CredentialStore>,
}

impl IdentityBridge {
    pub fn new(client: Client, base_url: Option<String>, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            client,
            base_url,
            store,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.base_url.is_some()
    }

    /// Exchange a one-time login ticket for a provider session token.
    pub async fn exchange(&self, ticket: &str) -> Result<String, AuthError> {
        self.call(EXCHANGE_PATH, &ExchangeRequest { ticket }).await
    }

    /// Ask the provider for a fresh token based on the current one.
    pub async fn refresh_identity(&self, identity_token: &str) -> Result<String, AuthError> {
        self.call(IDENTITY_REFRESH_PATH, &IdentityRefreshRequest { identity_token })
            .await
    }

    /// Current provider token, if one has been derived and stored.
    pub fn current_identity_token(&self) -> Option<String> {
        self.store.get().ok().flatten().and_then(|b| b.identity_token)
    }

    async fn call<B: Serialize>(&self, path: &str, body: &B) -> Result<String, AuthError> {
        let base = self.base_url.as_deref().ok_or_else(|| {
            AuthError::IdentityProviderFailure("identity provider not configured".to_string())
        })?;
        let url = format!("{}{}", base, path);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| AuthError::IdentityProviderFailure(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::IdentityProviderFailure(format!(
                "provider returned {}",
                response.status()
            )));
        }

        let parsed: IdentityTokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::IdentityProviderFailure(e.to_string()))?;
        debug!("Identity token obtained");
        Ok(parsed.identity_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{CredentialBundle, FileStore};
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> Client {
        Client::builder()
            .timeout(std::time::Duration::from_secs(5))
            .build()
            .expect("client")
    }

    fn test_store() -> (tempfile::TempDir, Arc<dyn CredentialStore>) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store: Arc<dyn CredentialStore> = Arc::new(FileStore::new(
            dir.path().to_path_buf(),
            "test-device-secret",
        ));
        (dir, store)
    }

    #[tokio::test]
    async fn test_exchange_returns_identity_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/token/exchange"))
            .and(body_json(serde_json::json!({ "ticket": "T1" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "identityToken": "ID1" })),
            )
            .mount(&server)
            .await;

        let (_dir, store) = test_store();
        let bridge = IdentityBridge::new(client(), Some(server.uri()), store);
        let token = bridge.exchange("T1").await.expect("exchange should succeed");
        assert_eq!(token, "ID1");
    }

    #[tokio::test]
    async fn test_refresh_identity_returns_new_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/token/refresh"))
            .and(body_json(serde_json::json!({ "identityToken": "ID1" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "identityToken": "ID2" })),
            )
            .mount(&server)
            .await;

        let (_dir, store) = test_store();
        let bridge = IdentityBridge::new(client(), Some(server.uri()), store);
        let token = bridge
            .refresh_identity("ID1")
            .await
            .expect("refresh should succeed");
        assert_eq!(token, "ID2");
    }

    #[tokio::test]
    async fn test_provider_error_is_identity_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/token/exchange"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let (_dir, store) = test_store();
        let bridge = IdentityBridge::new(client(), Some(server.uri()), store);
        let err = bridge.exchange("T1").await.expect_err("exchange should fail");
        assert!(matches!(err, AuthError::IdentityProviderFailure(_)));
    }

    #[tokio::test]
    async fn test_unconfigured_bridge_is_disabled() {
        let (_dir, store) = test_store();
        let bridge = IdentityBridge::new(client(), None, store);
        assert!(!bridge.is_enabled());
        let err = bridge.exchange("T1").await.expect_err("exchange should fail");
        assert!(matches!(err, AuthError::IdentityProviderFailure(_)));
    }

    #[tokio::test]
    async fn test_current_identity_token_reads_store() {
        let (_dir, store) = test_store();
        let bridge = IdentityBridge::new(client(), None, Arc::clone(&store));
        assert!(bridge.current_identity_token().is_none());

        let bundle = CredentialBundle::new(
            "A1".to_string(),
            "R1".to_string(),
            "Bearer".to_string(),
            3600,
        )
        .with_identity_token(Some("ID1".to_string()));
        store.put(&bundle).expect("put should succeed");
        assert_eq!(bridge.current_identity_token().as_deref(), Some("ID1"));
    }
}
