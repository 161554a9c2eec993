//! reqwest transport for the Awqat Salah API
//!
//! Implements both the login exchange (`Authenticator`) and authenticated data
//! calls (`UpstreamApi`) over one shared HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;

use super::UpstreamApi;
use crate::auth::{parse_grant, Authenticator, BearerToken, Grant};
use crate::config::{Credentials, GatewayConfig};
use crate::error::{AuthError, ConfigError, UpstreamError};

const LOGIN_PATH: &str = "/Auth/Login";
const REFRESH_PATH: &str = "/Auth/RefreshToken";

/// Longest upstream error body kept in an error message
const MAX_ERROR_BODY: usize = 200;

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// HTTP client for the upstream API
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: Client,
    base_url: String,
    credentials: Credentials,
    timeout: Duration,
}

impl HttpUpstream {
    /// Builds the transport from a validated configuration
    pub fn new(config: &GatewayConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let credentials = config
            .credentials
            .clone()
            .ok_or(ConfigError::MissingCredentials)?;
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("awqat-gateway/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials,
            timeout: config.request_timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn transport_error(&self, e: reqwest::Error) -> UpstreamError {
        if e.is_timeout() {
            UpstreamError::Timeout(self.timeout)
        } else {
            UpstreamError::Transport(e.to_string())
        }
    }

    async fn read_grant(response: Response) -> Result<Grant, AuthError> {
        let status = response.status();
        if !status.is_success() {
            let message = error_body(response).await;
            return Err(AuthError::LoginRejected {
                status: status.as_u16(),
                message,
            });
        }
        let body: Value = response
            .json()
            .await
            .map_err(|e| AuthError::MalformedGrant(e.to_string()))?;
        parse_grant(body)
    }
}

#[async_trait]
impl Authenticator for HttpUpstream {
    async fn login(&self) -> Result<Grant, AuthError> {
        tracing::debug!(email = %self.credentials.email, "logging in to upstream");
        let response = self
            .client
            .post(self.url(LOGIN_PATH))
            .json(&LoginRequest {
                email: &self.credentials.email,
                password: &self.credentials.password,
            })
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.without_url().to_string()))?;

        Self::read_grant(response).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Grant, AuthError> {
        // The refresh token is a path segment; keep it out of error messages
        let response = self
            .client
            .get(format!("{}/{}", self.url(REFRESH_PATH), refresh_token))
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.without_url().to_string()))?;

        Self::read_grant(response).await
    }
}

#[async_trait]
impl UpstreamApi for HttpUpstream {
    async fn get(&self, path: &str, bearer: &BearerToken) -> Result<Value, UpstreamError> {
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(bearer.as_str())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(UpstreamError::Unauthorized {
                status: status.as_u16(),
                message: error_body(response).await,
            });
        }
        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                message: error_body(response).await,
            });
        }

        response.json::<Value>().await.map_err(|e| {
            if e.is_timeout() {
                self.transport_error(e)
            } else {
                UpstreamError::Malformed(e.to_string())
            }
        })
    }
}

/// Reads a truncated error body for diagnostics
async fn error_body(response: Response) -> String {
    let text = response.text().await.unwrap_or_default();
    if text.chars().count() > MAX_ERROR_BODY {
        let truncated: String = text.chars().take(MAX_ERROR_BODY).collect();
        format!("{}...", truncated)
    } else if text.is_empty() {
        "<empty body>".to_string()
    } else {
        text
    }
}
