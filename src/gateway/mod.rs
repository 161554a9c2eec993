//! The resilient cached gateway
//!
//! `Gateway` is the single entry point for the route layer: it maps a
//! `ResourceRequest` to its cache store, cache key and upstream path and hands
//! them to the `FetchOrchestrator`.

mod orchestrator;

pub use orchestrator::{FetchOrchestrator, FetchOutcome, Fetched};

use std::sync::Arc;

use serde_json::Value;
use tracing::Instrument;

use crate::auth::{Authenticator, TokenManager};
use crate::cache::CacheStore;
use crate::config::{CacheTtls, GatewayConfig};
use crate::error::{ConfigError, GatewayError};
use crate::resource::{ResourceClass, ResourceRequest};
use crate::upstream::{HttpUpstream, UpstreamApi};

/// One cache store per resource class, each with its own TTL
#[derive(Debug)]
pub struct CacheStores {
    countries: CacheStore,
    cities: CacheStore,
    districts: CacheStore,
    daily: CacheStore,
    monthly: CacheStore,
    yearly: CacheStore,
}

impl CacheStores {
    pub fn new(ttls: &CacheTtls) -> Self {
        let store = |class| CacheStore::new(ttls.ttl_for(class));
        Self {
            countries: store(ResourceClass::Countries),
            cities: store(ResourceClass::Cities),
            districts: store(ResourceClass::Districts),
            daily: store(ResourceClass::DailyPrayerTimes),
            monthly: store(ResourceClass::MonthlyPrayerTimes),
            yearly: store(ResourceClass::YearlyPrayerTimes),
        }
    }

    pub fn get(&self, class: ResourceClass) -> &CacheStore {
        match class {
            ResourceClass::Countries => &self.countries,
            ResourceClass::Cities => &self.cities,
            ResourceClass::Districts => &self.districts,
            ResourceClass::DailyPrayerTimes => &self.daily,
            ResourceClass::MonthlyPrayerTimes => &self.monthly,
            ResourceClass::YearlyPrayerTimes => &self.yearly,
        }
    }
}

/// Caching, authenticating front for the upstream API
#[derive(Debug)]
pub struct Gateway {
    orchestrator: FetchOrchestrator,
    caches: CacheStores,
}

impl Gateway {
    /// Builds a gateway talking to the configured upstream over HTTP
    pub fn new(config: &GatewayConfig) -> Result<Self, ConfigError> {
        let http = Arc::new(HttpUpstream::new(config)?);
        Ok(Self::with_upstream(config, http.clone(), http))
    }

    /// Builds a gateway over injected login and data seams
    pub fn with_upstream(
        config: &GatewayConfig,
        authenticator: Arc<dyn Authenticator>,
        upstream: Arc<dyn UpstreamApi>,
    ) -> Self {
        let tokens = Arc::new(TokenManager::new(
            authenticator,
            config.token_skew,
            config.default_token_lifetime,
        ));
        Self {
            orchestrator: FetchOrchestrator::new(tokens, upstream, config.request_timeout),
            caches: CacheStores::new(&config.ttls),
        }
    }

    /// Returns the payload for `request`
    ///
    /// A degraded (stale) answer has the same shape as a fresh one.
    pub async fn fetch(&self, request: &ResourceRequest) -> Result<Arc<Value>, GatewayError> {
        self.fetch_with_outcome(request)
            .await
            .map(|fetched| fetched.payload)
    }

    /// Like `fetch`, but also reports whether the answer was a hit, fresh or stale
    pub async fn fetch_with_outcome(
        &self,
        request: &ResourceRequest,
    ) -> Result<Fetched, GatewayError> {
        let class = request.class();
        let key = request.cache_key();
        let path = request.upstream_path();

        let fetched = self
            .orchestrator
            .fetch(self.caches.get(class), &key, &path)
            .instrument(tracing::info_span!("fetch", %class))
            .await?;
        tracing::debug!(%class, %key, outcome = %fetched.outcome, "request served");
        Ok(fetched)
    }

    pub fn caches(&self) -> &CacheStores {
        &self.caches
    }
}
