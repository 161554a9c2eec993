//! Scripted test doubles for the login and data seams

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::auth::{Authenticator, BearerToken, Grant};
use crate::error::{AuthError, UpstreamError};
use crate::upstream::UpstreamApi;

/// Wraps `data` in a successful upstream envelope
pub fn envelope(data: Value) -> Value {
    json!({ "success": true, "data": data, "message": null })
}

pub fn unauthorized() -> UpstreamError {
    UpstreamError::Unauthorized {
        status: 401,
        message: "token expired".to_string(),
    }
}

/// Issues `token-N` on the N-th login and counts exchanges
pub struct MockAuthenticator {
    logins: AtomicUsize,
    refreshes: AtomicUsize,
    lifetime: Mutex<chrono::Duration>,
    delay: Duration,
    failing: AtomicBool,
    failing_refresh: AtomicBool,
    refresh_tokens: bool,
    expiring: bool,
}

impl MockAuthenticator {
    pub fn new() -> Self {
        Self {
            logins: AtomicUsize::new(0),
            refreshes: AtomicUsize::new(0),
            lifetime: Mutex::new(chrono::Duration::hours(1)),
            delay: Duration::ZERO,
            failing: AtomicBool::new(false),
            failing_refresh: AtomicBool::new(false),
            refresh_tokens: false,
            expiring: true,
        }
    }

    pub fn with_lifetime(self, lifetime: chrono::Duration) -> Self {
        self.set_lifetime(lifetime);
        self
    }

    pub fn set_lifetime(&self, lifetime: chrono::Duration) {
        *self.lifetime.lock() = lifetime;
    }

    /// Makes every exchange take `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Makes every login fail with a 503
    pub fn failing(self) -> Self {
        self.set_failing(true);
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Makes every refresh-token exchange fail with a 401
    pub fn failing_refresh(self) -> Self {
        self.set_failing_refresh(true);
        self
    }

    pub fn set_failing_refresh(&self, failing: bool) {
        self.failing_refresh.store(failing, Ordering::SeqCst);
    }

    /// Issues grants that carry no expiry
    pub fn without_expiry(mut self) -> Self {
        self.expiring = false;
        self
    }

    /// Issues refresh tokens alongside access tokens
    pub fn with_refresh_tokens(mut self) -> Self {
        self.refresh_tokens = true;
        self
    }

    pub fn logins(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    fn grant(&self, token: String) -> Grant {
        Grant {
            refresh_token: self.refresh_tokens.then(|| format!("refresh-for-{}", token)),
            token,
            expires_at: self
                .expiring
                .then(|| Utc::now() + *self.lifetime.lock()),
        }
    }
}

#[async_trait]
impl Authenticator for MockAuthenticator {
    async fn login(&self) -> Result<Grant, AuthError> {
        let n = self.logins.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(AuthError::LoginRejected {
                status: 503,
                message: "service unavailable".to_string(),
            });
        }
        Ok(self.grant(format!("token-{}", n)))
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<Grant, AuthError> {
        let n = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing_refresh.load(Ordering::SeqCst) {
            return Err(AuthError::LoginRejected {
                status: 401,
                message: "refresh token expired".to_string(),
            });
        }
        Ok(self.grant(format!("refreshed-{}", n)))
    }
}

enum Scripted {
    Now(Result<Value, UpstreamError>),
    After(Duration, Value),
}

/// Replays queued responses in order and records every call
pub struct MockUpstream {
    script: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<(String, BearerToken)>>,
}

impl MockUpstream {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn push_ok(&self, body: Value) {
        self.script.lock().push_back(Scripted::Now(Ok(body)));
    }

    pub fn push_err(&self, err: UpstreamError) {
        self.script.lock().push_back(Scripted::Now(Err(err)));
    }

    /// Queues a response that only arrives after `delay`
    pub fn push_delayed(&self, delay: Duration, body: Value) {
        self.script.lock().push_back(Scripted::After(delay, body));
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn paths(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(path, _)| path.clone()).collect()
    }

    pub fn bearers(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .map(|(_, bearer)| bearer.as_str().to_string())
            .collect()
    }
}

#[async_trait]
impl UpstreamApi for MockUpstream {
    async fn get(&self, path: &str, bearer: &BearerToken) -> Result<Value, UpstreamError> {
        self.calls.lock().push((path.to_string(), bearer.clone()));
        let next = self.script.lock().pop_front();
        match next {
            Some(Scripted::Now(result)) => result,
            Some(Scripted::After(delay, body)) => {
                tokio::time::sleep(delay).await;
                Ok(body)
            }
            None => Err(UpstreamError::Transport("no scripted response".to_string())),
        }
    }
}
