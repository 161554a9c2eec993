use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::{Authenticator, Grant};
use crate::error::AuthError;

/// A currently-valid bearer value
///
/// Cheap to clone; `Debug` never prints the token.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(Arc<str>);

impl BearerToken {
    pub fn new(token: impl Into<Arc<str>>) -> Self {
        Self(token.into())
    }

    /// The raw value for the `Authorization` header
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(<redacted>)")
    }
}

/// The single live credential; never leaves the `TokenManager`
struct Credential {
    token: BearerToken,
    refresh_token: Option<String>,
    expires_at: DateTime<Utc>,
    /// Set when a data endpoint refused the token
    revoked: bool,
}

impl Credential {
    fn from_grant(grant: Grant, default_lifetime: Duration) -> Self {
        let expires_at = grant.expires_at.unwrap_or_else(|| {
            Utc::now()
                + chrono::Duration::from_std(default_lifetime)
                    .unwrap_or_else(|_| chrono::Duration::minutes(30))
        });
        Self {
            token: BearerToken::new(grant.token),
            refresh_token: grant.refresh_token,
            expires_at,
            revoked: false,
        }
    }

    fn is_usable_at(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        let skew = chrono::Duration::from_std(skew).unwrap_or_else(|_| chrono::Duration::zero());
        !self.revoked && now + skew < self.expires_at
    }
}

/// Owns the process-wide bearer credential
///
/// The credential slot is guarded by an async mutex that stays held for the
/// whole login exchange, so callers arriving during a refresh wait for it and
/// then reuse its result instead of logging in again.
pub struct TokenManager {
    authenticator: Arc<dyn Authenticator>,
    credential: Mutex<Option<Credential>>,
    skew: Duration,
    default_lifetime: Duration,
}

impl TokenManager {
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        skew: Duration,
        default_lifetime: Duration,
    ) -> Self {
        Self {
            authenticator,
            credential: Mutex::new(None),
            skew,
            default_lifetime,
        }
    }

    /// Returns a valid bearer token, logging in if the current one expired
    ///
    /// Login failures are returned as-is; retrying is up to the caller.
    pub async fn ensure_valid(&self) -> Result<BearerToken, AuthError> {
        let mut slot = self.credential.lock().await;

        if let Some(credential) = slot.as_ref() {
            if credential.is_usable_at(Utc::now(), self.skew) {
                return Ok(credential.token.clone());
            }
        }

        // The old credential stays in place until a renewal succeeds
        let refresh_token = slot.as_ref().and_then(|c| c.refresh_token.clone());
        let grant = self.exchange(refresh_token).await?;
        let credential = Credential::from_grant(grant, self.default_lifetime);
        tracing::info!(expires_at = %credential.expires_at, "obtained upstream credential");

        let token = credential.token.clone();
        *slot = Some(credential);
        Ok(token)
    }

    /// Forces the next `ensure_valid` to refresh
    ///
    /// Only revokes the live credential if it is still the `rejected` one; a
    /// token that was already replaced by a concurrent refresh is left alone.
    pub async fn invalidate(&self, rejected: &BearerToken) {
        let mut slot = self.credential.lock().await;
        if let Some(credential) = slot.as_mut() {
            if credential.token == *rejected {
                tracing::debug!("revoking rejected upstream credential");
                credential.revoked = true;
            }
        }
    }

    async fn exchange(&self, refresh_token: Option<String>) -> Result<Grant, AuthError> {
        if let Some(refresh_token) = refresh_token {
            match self.authenticator.refresh(&refresh_token).await {
                Ok(grant) => return Ok(grant),
                Err(e) => {
                    tracing::warn!(error = %e, "token refresh failed, falling back to login");
                }
            }
        }
        self.authenticator.login().await.map_err(|e| {
            tracing::error!(error = %e, "upstream login failed");
            e
        })
    }
}

impl fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenManager")
            .field("skew", &self.skew)
            .field("default_lifetime", &self.default_lifetime)
            .finish_non_exhaustive()
    }
}
