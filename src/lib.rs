//! Awqat gateway library
//!
//! A caching, authenticating gateway in front of the Awqat Salah prayer-time
//! API. Concurrent requests for the same resource are served from per-class
//! TTL caches, the bearer token is shared and refreshed once per expiry, and
//! upstream failures fall back to previously fetched data.

pub mod auth;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod resource;
pub mod upstream;

#[cfg(test)]
mod testing;

pub use config::{CacheTtls, Credentials, GatewayConfig};
pub use error::{AuthError, ConfigError, GatewayError, UpstreamError, ValidationError};
pub use gateway::{FetchOutcome, Fetched, Gateway};
pub use resource::{CacheKey, Place, ResourceClass, ResourceRequest};
