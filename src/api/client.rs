//! API client for the Claimline partner backend.
//!
//! This module provides the `ApiClient` struct for making authenticated API
//! requests: listing and filtering repair-order leads, viewing order details,
//! raising new requests, and managing the partner profile.
//!
//! Every data call goes through the attach-auth pipeline: the bearer token
//! comes from the session coordinator, the first 401 triggers one shared
//! session recovery, and the original request is retried exactly once with
//! the new token. A second 401 surfaces as `LoginRequired` - it is never
//! retried again.

use std::sync::Arc;

use reqwest::{Client, Method, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::auth::{LoginTokens, SessionCoordinator, SessionOutcome};
use crate::config::{http_client, Config};
use crate::models::{NewRequest, Order, OrderFilter, OrderListResponse, PartnerProfile, RaisedRequest};

use super::ApiError;

/// Login path on the accounts service
const LOGIN_PATH: &str = "/auth/login";

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(rename = "authToken")]
    auth_token: String,
    #[serde(rename = "refreshToken")]
    refresh_token: String,
    #[serde(rename = "expiresIn")]
    expires_in: i64,
    #[serde(rename = "tokenType")]
    token_type: String,
    #[serde(rename = "identityTicket", default)]
    identity_ticket: Option<String>,
}

/// API client for the partner backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection
/// pooling, and the session coordinator is shared behind an Arc.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    api_base_url: String,
    auth_base_url: String,
    session: Arc<SessionCoordinator>,
}

impl ApiClient {
    pub fn new(config: &Config, session: Arc<SessionCoordinator>) -> anyhow::Result<Self> {
        Ok(Self {
            client: http_client()?,
            api_base_url: config.api_base_url.clone(),
            auth_base_url: config.auth_base_url.clone(),
            session,
        })
    }

    /// Authenticate with username/password and install the resulting session.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ApiError> {
        let url = format!("{}{}", self.auth_base_url, LOGIN_PATH);
        let response = self
            .client
            .post(&url)
            .json(&LoginRequest { username, password })
            .send()
            .await?;
        let response = Self::check_response(response).await?;
        let parsed: LoginResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("login response: {}", e)))?;

        self.session
            .install_session(LoginTokens {
                access_token: parsed.auth_token,
                refresh_token: parsed.refresh_token,
                token_type: parsed.token_type,
                expires_in: parsed.expires_in,
                identity_ticket: parsed.identity_ticket,
            })
            .await?;
        info!("Login successful");
        Ok(())
    }

    /// Forget the session. Returns only after the credential store is cleared.
    pub fn logout(&self) -> Result<(), ApiError> {
        self.session.logout()?;
        Ok(())
    }

    /// Send an authenticated GET and parse the JSON response.
    pub async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        self.send_authed(Method::GET, url, None).await
    }

    /// Send an authenticated POST with a JSON body and parse the response.
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = Self::encode_body(body)?;
        self.send_authed(Method::POST, url, Some(&body)).await
    }

    /// Send an authenticated PUT with a JSON body and parse the response.
    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = Self::encode_body(body)?;
        self.send_authed(Method::PUT, url, Some(&body)).await
    }

    // ===== Data Methods =====

    /// Fetch repair-order leads, narrowed by the given filter.
    pub async fn fetch_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, ApiError> {
        let url = Url::parse_with_params(
            &format!("{}/partners/orders", self.api_base_url),
            filter.query_pairs(),
        )
        .map_err(|e| ApiError::InvalidResponse(format!("bad request url: {}", e)))?;
        let response: OrderListResponse = self.get(url.as_str()).await?;
        debug!(count = response.orders.len(), "Fetched order leads");
        Ok(response.orders)
    }

    /// Fetch full details for a single repair-order lead.
    pub async fn fetch_order_detail(&self, order_id: &str) -> Result<Order, ApiError> {
        let url = format!("{}/partners/orders/{}", self.api_base_url, order_id);
        self.get(&url).await
    }

    /// Raise a new repair-order request.
    pub async fn raise_request(&self, request: &NewRequest) -> Result<RaisedRequest, ApiError> {
        let url = format!("{}/partners/requests", self.api_base_url);
        let raised: RaisedRequest = self.post(&url, request).await?;
        info!(request_id = %raised.request_id, "Request raised");
        Ok(raised)
    }

    /// Fetch the signed-in partner's profile.
    pub async fn fetch_profile(&self) -> Result<PartnerProfile, ApiError> {
        let url = format!("{}/partners/me", self.api_base_url);
        self.get(&url).await
    }

    /// Update the signed-in partner's profile.
    pub async fn update_profile(&self, profile: &PartnerProfile) -> Result<PartnerProfile, ApiError> {
        let url = format!("{}/partners/me", self.api_base_url);
        self.put(&url, profile).await
    }

    // ===== Pipeline internals =====

    async fn send_authed<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<T, ApiError> {
        let token = self.session.access_token().ok_or(ApiError::LoginRequired)?;

        let response = self.send_once(method.clone(), url, body, &token).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Self::parse_response(response).await;
        }

        debug!(url, "Request returned 401, attempting session recovery");
        let recovered = match self.session.recover_unauthorized(&token).await {
            SessionOutcome::Authenticated(token) | SessionOutcome::Refreshed(token) => token,
            SessionOutcome::TransientError(reason) => return Err(ApiError::Transient(reason)),
            SessionOutcome::Unauthenticated | SessionOutcome::RefreshFailed(_) => {
                return Err(ApiError::LoginRequired)
            }
        };

        let retry = self.send_once(method, url, body, &recovered).await?;
        if retry.status() == StatusCode::UNAUTHORIZED {
            warn!(url, "Request rejected again after refresh, giving up");
            return Err(ApiError::LoginRequired);
        }
        Self::parse_response(retry).await
    }

    async fn send_once(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        token: &str,
    ) -> Result<reqwest::Response, ApiError> {
        let mut request = self.client.request(method, url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    fn encode_body<B: Serialize>(body: &B) -> Result<Value, ApiError> {
        serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidResponse(format!("failed to encode request: {}", e)))
    }

    /// Check if a response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let response = Self::check_response(response).await?;
        let url = response.url().clone();
        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("{}: {}", url, e)))
    }
}
