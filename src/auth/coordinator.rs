//! Session lifecycle coordination.
//!
//! One authoritative answer to "is this session usable right now", produced
//! at startup and again whenever a request comes back 401. Each check walks
//! store -> validator -> refresher and resolves to exactly one terminal
//! [`SessionOutcome`]; the identity bridge is reconciled on the side and can
//! never turn a usable backend session into a failure.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::{http_client, Config};

use super::{
    AuthError, CredentialBundle, CredentialStore, IdentityBridge, TokenRefresher, TokenValidator,
};

/// Tokens parsed out of a successful login response.
#[derive(Debug, Clone)]
pub struct LoginTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    /// One-time identity-exchange ticket; absent when the backend does not
    /// participate in federated identity.
    pub identity_ticket: Option<String>,
}

/// Terminal result of a single session check.
///
/// Exactly one of these is produced per check, and each maps to exactly one
/// user-visible behavior: proceed to the app (`Authenticated`/`Refreshed`),
/// return to login (`Unauthenticated`/`RefreshFailed`), or show a
/// connectivity error and keep the stored session (`TransientError`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The stored access token is still accepted.
    Authenticated(String),
    /// The access token was replaced via the refresh token.
    Refreshed(String),
    /// Nothing usable is stored.
    Unauthenticated,
    /// The refresh token was rejected; local state has been cleared.
    RefreshFailed(String),
    /// The backend could not be reached. Stored credentials are intact and a
    /// later check may still succeed.
    TransientError(String),
}

impl SessionOutcome {
    /// Access token to attach to requests, when the session is usable.
    pub fn access_token(&self) -> Option<&str> {
        match self {
            SessionOutcome::Authenticated(token) | SessionOutcome::Refreshed(token) => Some(token),
            _ => None,
        }
    }
}

/// Orchestrates store, validator, refresher, and identity bridge into a
/// single session decision.
pub struct SessionCoordinator {
    store: Arc<dyn CredentialStore>,
    validator: TokenValidator,
    refresher: Arc<TokenRefresher>,
    identity: IdentityBridge,
    /// Serializes refreshes. The backend rotates refresh tokens on use, so
    /// two racing exchanges would invalidate one another.
    refresh_gate: Mutex<()>,
}

impl SessionCoordinator {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        validator: TokenValidator,
        refresher: TokenRefresher,
        identity: IdentityBridge,
    ) -> Self {
        Self {
            store,
            validator,
            refresher: Arc::new(refresher),
            identity,
            refresh_gate: Mutex::new(()),
        }
    }

    /// Wire a coordinator from configuration and a credential store, sharing
    /// one HTTP client across validator, refresher, and identity bridge.
    pub fn from_config(config: &Config, store: Arc<dyn CredentialStore>) -> Result<Self> {
        let client = http_client()?;
        Ok(Self::new(
            Arc::clone(&store),
            TokenValidator::new(client.clone(), &config.api_base_url),
            TokenRefresher::new(client.clone(), &config.auth_base_url, Arc::clone(&store)),
            IdentityBridge::new(client, config.identity_base_url.clone(), store),
        ))
    }

    /// Decide whether the stored session is usable, refreshing if needed.
    ///
    /// Used at startup to route to either the main screen or the login flow.
    /// Makes no network call when nothing is stored.
    pub async fn check_session_at_startup(&self) -> SessionOutcome {
        let bundle = match self.store.get() {
            Ok(Some(bundle)) => bundle,
            Ok(None) => return SessionOutcome::Unauthenticated,
            Err(e) => {
                warn!(error = %e, "Credential store unreadable");
                return SessionOutcome::Unauthenticated;
            }
        };

        if self.validator.validate(&bundle.access_token).await {
            debug!("Stored access token still valid");
            return SessionOutcome::Authenticated(bundle.access_token);
        }

        self.refresh_session(&bundle.access_token).await
    }

    /// Recover from a request that came back 401.
    ///
    /// Runs the same refresh path as the startup check; callers retry the
    /// original request exactly once on a usable outcome.
    pub async fn recover_unauthorized(&self, stale_token: &str) -> SessionOutcome {
        self.refresh_session(stale_token).await
    }

    /// Persist a fresh login and derive the optional identity token.
    pub async fn install_session(&self, tokens: LoginTokens) -> Result<CredentialBundle, AuthError> {
        let bundle = CredentialBundle::new(
            tokens.access_token,
            tokens.refresh_token,
            tokens.token_type,
            tokens.expires_in,
        );
        self.store.put(&bundle)?;
        info!("Session installed");

        let Some(ticket) = tokens.identity_ticket else {
            return Ok(bundle);
        };
        if !self.identity.is_enabled() {
            debug!("Identity ticket present but no provider configured, skipping exchange");
            return Ok(bundle);
        }
        match self.identity.exchange(&ticket).await {
            Ok(identity_token) => {
                let updated = bundle.with_identity_token(Some(identity_token));
                self.store.put(&updated)?;
                Ok(updated)
            }
            Err(e) => {
                warn!(error = %e, "Identity exchange failed, continuing on backend credentials");
                Ok(bundle)
            }
        }
    }

    /// Forget the session. Returns only after the store is cleared.
    pub fn logout(&self) -> Result<(), AuthError> {
        self.store.clear()?;
        info!("Logged out, credential store cleared");
        Ok(())
    }

    /// Current access token, straight from the store.
    pub fn access_token(&self) -> Option<String> {
        self.store.get().ok().flatten().map(|b| b.access_token)
    }

    /// Current identity-provider token, if one has been derived.
    pub fn identity_token(&self) -> Option<String> {
        self.identity.current_identity_token()
    }

    /// Coalesced refresh: at most one exchange in flight. Waiters re-read the
    /// store after acquiring the gate and adopt an already-rotated pair
    /// instead of spending their own (single-use) refresh token.
    async fn refresh_session(&self, stale_token: &str) -> SessionOutcome {
        let _gate = self.refresh_gate.lock().await;

        let current = match self.store.get() {
            Ok(Some(bundle)) => bundle,
            Ok(None) => return SessionOutcome::Unauthenticated,
            Err(e) => {
                warn!(error = %e, "Credential store unreadable");
                return SessionOutcome::Unauthenticated;
            }
        };
        if current.access_token != stale_token {
            debug!("Adopting token rotated by a concurrent check");
            return SessionOutcome::Refreshed(current.access_token);
        }

        // The exchange runs on its own task: dropping this check (app
        // teardown mid-refresh) must not sever it between the network call
        // and the store write.
        let refresher = Arc::clone(&self.refresher);
        let refresh_token = current.refresh_token.clone();
        let result =
            match tokio::spawn(async move { refresher.refresh(&refresh_token).await }).await {
                Ok(result) => result,
                Err(e) => {
                    warn!(error = %e, "Refresh task aborted");
                    return SessionOutcome::TransientError("refresh task aborted".to_string());
                }
            };

        match result {
            Ok(new_bundle) => {
                let outcome = SessionOutcome::Refreshed(new_bundle.access_token.clone());
                self.reconcile_identity(&current, new_bundle).await;
                outcome
            }
            Err(AuthError::RejectedRefreshToken(reason)) => {
                info!("Refresh token rejected, clearing local session");
                if let Err(e) = self.store.clear() {
                    warn!(error = %e, "Failed to clear credential store");
                }
                SessionOutcome::RefreshFailed(reason)
            }
            Err(AuthError::TransientNetworkFailure(reason)) => {
                debug!(reason = %reason, "Refresh inconclusive, keeping stored credentials");
                SessionOutcome::TransientError(reason)
            }
            Err(AuthError::NoCredentials) => SessionOutcome::Unauthenticated,
            Err(e) => {
                warn!(error = %e, "Refresh failed");
                SessionOutcome::TransientError(e.to_string())
            }
        }
    }

    /// A refresh replaces the backend pair wholesale, dropping the stored
    /// identity token. Re-derive it from the previous one so the two
    /// credential systems stay consistent; failure leaves it absent, which is
    /// a valid state.
    async fn reconcile_identity(&self, previous: &CredentialBundle, new_bundle: CredentialBundle) {
        if !self.identity.is_enabled() {
            return;
        }
        let Some(previous_identity) = previous.identity_token.as_deref() else {
            return;
        };
        match self.identity.refresh_identity(previous_identity).await {
            Ok(identity_token) => {
                let updated = new_bundle.with_identity_token(Some(identity_token));
                if let Err(e) = self.store.put(&updated) {
                    warn!(error = %e, "Failed to persist refreshed identity token");
                }
            }
            Err(e) => {
                warn!(error = %e, "Identity token refresh failed, continuing without it");
            }
        }
    }
}
