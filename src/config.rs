//! Gateway configuration
//!
//! Values are supplied externally (flags or environment, see `cli`); the
//! defaults mirror the cache durations the upstream data warrants.

use std::fmt;
use std::time::Duration;

use reqwest::Url;

use crate::error::ConfigError;
use crate::resource::ResourceClass;

/// Default upstream API
pub const DEFAULT_BASE_URL: &str = "https://awqatsalah.diyanet.gov.tr";

const HOUR: Duration = Duration::from_secs(60 * 60);
const DAY: Duration = Duration::from_secs(24 * 60 * 60);
const WEEK: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Login credentials for the upstream API
///
/// `Debug` never prints the password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Time-to-live for each resource class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    /// Daily and monthly prayer times
    pub prayer_times: Duration,
    /// Yearly prayer times
    pub yearly: Duration,
    /// Countries, cities and districts
    pub reference: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            prayer_times: DAY,
            yearly: WEEK,
            reference: WEEK,
        }
    }
}

impl CacheTtls {
    pub fn ttl_for(&self, class: ResourceClass) -> Duration {
        if class.is_reference_data() {
            return self.reference;
        }
        match class {
            ResourceClass::YearlyPrayerTimes => self.yearly,
            _ => self.prayer_times,
        }
    }
}

/// Everything the gateway core consumes
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the upstream API, without trailing slash
    pub base_url: String,
    /// Login credentials; required by the HTTP transport
    pub credentials: Option<Credentials>,
    /// Bound on every upstream call
    pub request_timeout: Duration,
    /// Per-class cache durations
    pub ttls: CacheTtls,
    /// Credentials are renewed this long before they expire
    pub token_skew: Duration,
    /// Lifetime assumed when the login response carries no expiry
    pub default_token_lifetime: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            credentials: None,
            request_timeout: Duration::from_secs(10),
            ttls: CacheTtls::default(),
            token_skew: Duration::from_secs(30),
            default_token_lifetime: HOUR / 2,
        }
    }
}

impl GatewayConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_ttls(mut self, ttls: CacheTtls) -> Self {
        self.ttls = ttls;
        self
    }

    /// Checks the settings the HTTP transport depends on
    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.base_url).map_err(|e| ConfigError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason: e.to_string(),
        })?;
        if self.credentials.is_none() {
            return Err(ConfigError::MissingCredentials);
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}
