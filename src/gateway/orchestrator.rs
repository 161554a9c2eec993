use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::auth::{BearerToken, TokenManager};
use crate::cache::CacheStore;
use crate::error::{AuthError, GatewayError, UpstreamError};
use crate::resource::CacheKey;
use crate::upstream::{unwrap_envelope, UpstreamApi};

/// How a request was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Served from a fresh cache entry without an upstream call
    Hit,
    /// Fetched from upstream and written to the cache
    Fresh,
    /// Served from an expired entry after the upstream call failed
    Degraded,
}

impl FetchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchOutcome::Hit => "hit",
            FetchOutcome::Fresh => "fresh",
            FetchOutcome::Degraded => "degraded",
        }
    }
}

impl fmt::Display for FetchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A payload together with how it was obtained
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched {
    pub payload: Arc<Value>,
    pub outcome: FetchOutcome,
}

/// Runs the per-request cache / fetch / retry / fallback sequence
///
/// A request moves through:
/// cache check -> authenticated fetch -> (one retry after a 401) -> write,
/// and on any unrecoverable failure falls back to a stale cache entry.
pub struct FetchOrchestrator {
    tokens: Arc<TokenManager>,
    upstream: Arc<dyn UpstreamApi>,
    timeout: Duration,
}

impl FetchOrchestrator {
    pub fn new(tokens: Arc<TokenManager>, upstream: Arc<dyn UpstreamApi>, timeout: Duration) -> Self {
        Self {
            tokens,
            upstream,
            timeout,
        }
    }

    /// Returns the payload for `key`, going upstream to `path` on a miss
    pub async fn fetch(
        &self,
        cache: &CacheStore,
        key: &CacheKey,
        path: &str,
    ) -> Result<Fetched, GatewayError> {
        if let Some(entry) = cache.get_fresh(key) {
            tracing::debug!(%key, "cache hit");
            return Ok(Fetched {
                payload: entry.payload,
                outcome: FetchOutcome::Hit,
            });
        }

        tracing::info!(%key, path, "cache miss, fetching from upstream");
        match self.fetch_upstream(path).await {
            Ok(payload) => {
                let payload = Arc::new(payload);
                cache.put(key.clone(), payload.clone());
                Ok(Fetched {
                    payload,
                    outcome: FetchOutcome::Fresh,
                })
            }
            Err(err) => match cache.get_stale(key) {
                Some(entry) => {
                    tracing::warn!(
                        %key,
                        error = %err,
                        stored_at = %entry.stored_at,
                        "upstream failed, serving stale entry"
                    );
                    Ok(Fetched {
                        payload: entry.payload,
                        outcome: FetchOutcome::Degraded,
                    })
                }
                None => {
                    tracing::error!(%key, error = %err, "upstream failed with no cached fallback");
                    Err(err)
                }
            },
        }
    }

    /// Authenticated fetch with exactly one retry after an auth failure
    async fn fetch_upstream(&self, path: &str) -> Result<Value, GatewayError> {
        let bearer = self.tokens.ensure_valid().await?;
        match self.call(path, &bearer).await {
            Err(err) if err.is_auth_failure() => {
                tracing::info!(path, "credential rejected, refreshing and retrying once");
                self.tokens.invalidate(&bearer).await;
                let bearer = self.tokens.ensure_valid().await?;
                match self.call(path, &bearer).await {
                    Err(UpstreamError::Unauthorized { status, message }) => {
                        Err(AuthError::CredentialRejected { status, message }.into())
                    }
                    other => other.map_err(GatewayError::from),
                }
            }
            other => other.map_err(GatewayError::from),
        }
    }

    /// One bounded upstream call followed by envelope validation
    async fn call(&self, path: &str, bearer: &BearerToken) -> Result<Value, UpstreamError> {
        let body = tokio::time::timeout(self.timeout, self.upstream.get(path, bearer))
            .await
            .map_err(|_| UpstreamError::Timeout(self.timeout))??;
        unwrap_envelope(body)
    }
}

impl fmt::Debug for FetchOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchOrchestrator")
            .field("tokens", &self.tokens)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
