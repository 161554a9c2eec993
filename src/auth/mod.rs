//! Bearer-token lifecycle
//!
//! The `Authenticator` trait is the seam to the upstream login endpoints; the
//! `TokenManager` owns the single live credential built from its grants.

mod token;

pub use token::{BearerToken, TokenManager};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::AuthError;

/// A credential as issued by the upstream login endpoint
#[derive(Clone, PartialEq, Eq)]
pub struct Grant {
    pub token: String,
    pub refresh_token: Option<String>,
    /// `None` when the upstream omitted or garbled the expiry
    pub expires_at: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for Grant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Grant")
            .field("token", &"<redacted>")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Performs the upstream login exchange
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Exchanges the configured credentials for a new grant
    async fn login(&self) -> Result<Grant, AuthError>;

    /// Renews a grant using a refresh token
    ///
    /// Upstreams without a refresh endpoint fall back to a full login.
    async fn refresh(&self, _refresh_token: &str) -> Result<Grant, AuthError> {
        self.login().await
    }
}

/// Login response body, bare or inside the `data` field of an envelope
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GrantBody {
    #[serde(alias = "accessToken")]
    token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default, alias = "expireTime")]
    expires_at: Option<String>,
}

/// Parses a login or refresh response body into a `Grant`
pub fn parse_grant(body: Value) -> Result<Grant, AuthError> {
    let body = match body {
        Value::Object(mut fields) if fields.contains_key("success") => {
            let success = fields
                .get("success")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if !success {
                let message = fields
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("login failed")
                    .to_string();
                return Err(AuthError::LoginRejected {
                    status: 200,
                    message,
                });
            }
            fields.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    };

    let parsed: GrantBody =
        serde_json::from_value(body).map_err(|e| AuthError::MalformedGrant(e.to_string()))?;
    if parsed.token.is_empty() {
        return Err(AuthError::MalformedGrant("empty token".to_string()));
    }

    Ok(Grant {
        token: parsed.token,
        refresh_token: parsed.refresh_token.filter(|t| !t.is_empty()),
        expires_at: parsed.expires_at.as_deref().and_then(parse_expiry),
    })
}

/// Accepts RFC 3339 or a naive ISO 8601 timestamp interpreted as UTC
fn parse_expiry(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    match NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        Ok(naive) => Some(naive.and_utc()),
        Err(_) => {
            tracing::debug!(expiry = raw, "unrecognised token expiry format");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_parse_bare_grant() {
        let grant = parse_grant(json!({
            "token": "abc",
            "expiresAt": "2024-01-01T12:00:00Z"
        }))
        .unwrap();

        assert_eq!(grant.token, "abc");
        assert!(grant.refresh_token.is_none());
        assert_eq!(
            grant.expires_at,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_enveloped_grant_with_upstream_field_names() {
        let grant = parse_grant(json!({
            "success": true,
            "message": null,
            "data": {
                "accessToken": "access",
                "refreshToken": "refresh",
                "expireTime": "2024-06-01T08:30:00.123"
            }
        }))
        .unwrap();

        assert_eq!(grant.token, "access");
        assert_eq!(grant.refresh_token.as_deref(), Some("refresh"));
        let expires_at = grant.expires_at.expect("Naive timestamps are read as UTC");
        assert_eq!(
            expires_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            "2024-06-01 08:30:00"
        );
    }

    #[test]
    fn test_unsuccessful_envelope_is_rejected() {
        let err = parse_grant(json!({
            "success": false,
            "message": "Invalid credentials",
            "data": null
        }))
        .unwrap_err();

        assert_eq!(
            err,
            AuthError::LoginRejected {
                status: 200,
                message: "Invalid credentials".to_string()
            }
        );
    }

    #[test]
    fn test_missing_token_is_malformed() {
        let err = parse_grant(json!({ "expiresAt": "2024-01-01T00:00:00Z" })).unwrap_err();
        assert!(matches!(err, AuthError::MalformedGrant(_)));

        let err = parse_grant(json!({ "token": "" })).unwrap_err();
        assert!(matches!(err, AuthError::MalformedGrant(_)));
    }

    #[test]
    fn test_unparseable_expiry_is_dropped() {
        let grant = parse_grant(json!({ "token": "abc", "expiresAt": "tomorrow" })).unwrap();
        assert!(grant.expires_at.is_none());
    }

    #[test]
    fn test_grant_debug_redacts_token() {
        let grant = Grant {
            token: "super-secret".to_string(),
            refresh_token: Some("also-secret".to_string()),
            expires_at: None,
        };
        let debug = format!("{:?}", grant);
        assert!(!debug.contains("super-secret"));
        assert!(!debug.contains("also-secret"));
    }
}
