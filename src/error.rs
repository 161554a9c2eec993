//! Error taxonomy for the gateway
//!
//! `AuthError` and `UpstreamError` are the only errors that cross the gateway
//! boundary (wrapped in `GatewayError`). `ValidationError` belongs to the route
//! layer and `ConfigError` to start-up.

use std::time::Duration;

use thiserror::Error;

/// Failures of the credential lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The login or refresh endpoint answered with a non-success status
    #[error("login rejected by upstream (status {status}): {message}")]
    LoginRejected { status: u16, message: String },

    /// The login endpoint could not be reached
    #[error("login request failed: {0}")]
    Transport(String),

    /// The login response did not contain a usable grant
    #[error("malformed login response: {0}")]
    MalformedGrant(String),

    /// A freshly issued credential was rejected again by a data endpoint
    #[error("credential rejected by upstream after refresh (status {status}): {message}")]
    CredentialRejected { status: u16, message: String },
}

/// Non-auth failures of an upstream data call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    /// The bearer credential was refused (401)
    #[error("upstream refused the credential (status {status}): {message}")]
    Unauthorized { status: u16, message: String },

    /// Any other non-success HTTP status
    #[error("upstream returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// Network level failure
    #[error("upstream request failed: {0}")]
    Transport(String),

    /// The call exceeded the configured timeout
    #[error("upstream request timed out after {0:?}")]
    Timeout(Duration),

    /// The envelope reported `success: false`
    #[error("upstream reported failure: {0}")]
    Rejected(String),

    /// The body was not a valid envelope
    #[error("malformed upstream response: {0}")]
    Malformed(String),
}

impl UpstreamError {
    /// Whether this failure should trigger a credential refresh
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, UpstreamError::Unauthorized { .. })
    }
}

/// Malformed caller input, raised by the route layer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("at least one of country, city or district is required")]
    MissingPlace,

    #[error("invalid month {0}: expected 1-12")]
    InvalidMonth(u32),
}

/// Invalid gateway configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("upstream credentials are required (set AWQAT_EMAIL and AWQAT_PASSWORD)")]
    MissingCredentials,

    #[error("request timeout must be greater than zero")]
    ZeroTimeout,

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Errors returned to callers of the gateway
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}
