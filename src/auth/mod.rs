//! Session and credential lifecycle.
//!
//! This module decides, at app startup and on every authenticated call,
//! whether the user is signed in, whether the backend token pair must be
//! refreshed, and how the optional federated identity token is kept
//! consistent with it:
//!
//! - `CredentialBundle`: the durable token set
//! - `CredentialStore`: atomic persistence (`FileStore`, `KeyringStore`)
//! - `TokenValidator`: fail-closed probe of the access token
//! - `TokenRefresher`: refresh-token exchange, persisted before returning
//! - `IdentityBridge`: optional federated token exchange and refresh
//! - `SessionCoordinator`: one authoritative session decision per check

pub mod bundle;
pub mod coordinator;
pub mod error;
pub mod identity;
pub mod refresher;
pub mod store;
pub mod validator;

pub use bundle::CredentialBundle;
pub use coordinator::{LoginTokens, SessionCoordinator, SessionOutcome};
pub use error::AuthError;
pub use identity::IdentityBridge;
pub use refresher::TokenRefresher;
pub use store::{CredentialStore, FileStore, KeyringStore};
pub use validator::TokenValidator;
