//! Claimline core - shared library for the Claimline partner apps.
//!
//! This crate provides everything the mobile and desktop shells need short of
//! rendering: endpoint configuration, durable credential storage, the session
//! lifecycle state machine, and a typed client for the partner REST API.
//!
//! The usual wiring is: build a [`Config`], pick a [`auth::CredentialStore`]
//! backend, create a [`auth::SessionCoordinator`] from both, and hand it to an
//! [`api::ApiClient`]. The coordinator answers "is this session usable" at
//! startup; the client runs every authenticated call through the
//! attach-auth-and-retry-on-401 pipeline.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError};
pub use auth::{
    AuthError, CredentialBundle, CredentialStore, FileStore, IdentityBridge, KeyringStore,
    LoginTokens, SessionCoordinator, SessionOutcome, TokenRefresher, TokenValidator,
};
pub use config::Config;
