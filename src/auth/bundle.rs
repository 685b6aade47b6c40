//! The credential bundle issued by the backend.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Seconds before expiry at which a proactive refresh becomes worthwhile.
const REFRESH_BUFFER_SECS: i64 = 60;

/// The full credential set for a signed-in partner.
///
/// The backend pair (`access_token`/`refresh_token`) is replaced wholesale on
/// every refresh. The identity token is issued by the federated provider and
/// travels alongside the pair; it may be absent while the backend session is
/// perfectly usable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialBundle {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds, as reported by the backend.
    pub expires_in: i64,
    pub obtained_at: DateTime<Utc>,
    pub identity_token: Option<String>,
}

impl CredentialBundle {
    pub fn new(
        access_token: String,
        refresh_token: String,
        token_type: String,
        expires_in: i64,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type,
            expires_in,
            obtained_at: Utc::now(),
            identity_token: None,
        }
    }

    /// A bundle missing either half of the backend pair can neither be used
    /// nor refreshed; it counts as if nothing were stored.
    pub fn is_complete(&self) -> bool {
        !self.access_token.is_empty() && !self.refresh_token.is_empty()
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.obtained_at + Duration::seconds(self.expires_in)
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at()
    }

    /// Check if the access token is close enough to expiry that a caller
    /// should expect the next request to need a refresh.
    pub fn needs_refresh(&self) -> bool {
        Utc::now() > self.expires_at() - Duration::seconds(REFRESH_BUFFER_SECS)
    }

    pub fn with_identity_token(mut self, identity_token: Option<String>) -> Self {
        self.identity_token = identity_token;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle(expires_in: i64) -> CredentialBundle {
        CredentialBundle::new(
            "access".to_string(),
            "refresh".to_string(),
            "Bearer".to_string(),
            expires_in,
        )
    }

    #[test]
    fn test_fresh_bundle_is_usable() {
        let b = bundle(3600);
        assert!(b.is_complete());
        assert!(!b.is_expired());
        assert!(!b.needs_refresh());
    }

    #[test]
    fn test_short_lifetime_needs_refresh_before_expiry() {
        let b = bundle(30);
        assert!(!b.is_expired());
        assert!(b.needs_refresh());
    }

    #[test]
    fn test_backdated_bundle_is_expired() {
        let mut b = bundle(3600);
        b.obtained_at = Utc::now() - Duration::seconds(7200);
        assert!(b.is_expired());
        assert!(b.needs_refresh());
    }

    #[test]
    fn test_partial_bundle_is_incomplete() {
        let mut b = bundle(3600);
        b.refresh_token.clear();
        assert!(!b.is_complete());

        let mut b = bundle(3600);
        b.access_token.clear();
        assert!(!b.is_complete());
    }

    #[test]
    fn test_with_identity_token() {
        let b = bundle(3600).with_identity_token(Some("id-token".to_string()));
        assert_eq!(b.identity_token.as_deref(), Some("id-token"));
        let b = b.with_identity_token(None);
        assert!(b.identity_token.is_none());
    }
}
