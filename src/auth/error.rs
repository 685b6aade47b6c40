use thiserror::Error;

/// Failures of the session lifecycle, split by what the caller must do next.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Nothing usable in the credential store.
    #[error("No stored credentials")]
    NoCredentials,

    /// The backend no longer accepts the access token. Recoverable: a refresh
    /// resolves this without surfacing to the user.
    #[error("Access token rejected by the backend")]
    InvalidAccessToken,

    /// The backend rejected the refresh token itself. Terminal: local
    /// credentials must be discarded and the user sent back to login.
    #[error("Refresh token rejected: {0}")]
    RejectedRefreshToken(String),

    /// No usable answer from the network. The stored credentials may still be
    /// good; the caller may retry later.
    #[error("Network failure: {0}")]
    TransientNetworkFailure(String),

    /// The federated identity provider failed. Soft: backend credentials
    /// remain the primary authority and the session stays usable.
    #[error("Identity provider failure: {0}")]
    IdentityProviderFailure(String),

    /// The credential store itself failed.
    #[error("Credential storage failure: {0}")]
    Storage(#[from] anyhow::Error),
}
