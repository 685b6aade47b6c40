//! REST API client module for the Claimline partner backend.
//!
//! This module provides the `ApiClient` for communicating with the partner
//! API: repair-order leads, raised requests, and the partner profile.
//!
//! The API uses bearer token authentication; every authenticated call runs
//! through the session coordinator's attach-auth-and-retry-on-401 pipeline.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
