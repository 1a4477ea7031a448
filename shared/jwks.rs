//! Remote key set client.
//!
//! Fetches the identity provider's published JWK set and keeps it as an
//! immutable snapshot behind an `Arc`. Readers clone the snapshot under a
//! short read lock; a refresh fetches with no lock held and swaps the whole
//! set in one write. Two requests racing on an empty cache may both fetch,
//! which only costs a duplicate request.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::DecodingKey;
use serde::Deserialize;

use crate::error::AuthError;

/// Lifetime of a fetched key set when the provider sends no `max-age`.
pub const DEFAULT_KEY_TTL: Duration = Duration::from_secs(60 * 60);

/// Minimum age of a cached set before an unknown `kid` may force a refetch.
pub const DEFAULT_REFETCH_COOLDOWN: Duration = Duration::from_secs(30);

/// A single published key.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    pub kid: Option<String>,
    pub kty: String,
    pub n: Option<String>,
    pub e: Option<String>,
    pub alg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JwksResponse {
    keys: Vec<Jwk>,
}

/// Result of one key set fetch.
#[derive(Debug, Clone)]
pub struct FetchedKeys {
    pub keys: Vec<Jwk>,
    /// Freshness lifetime advertised by the provider, if any.
    pub max_age: Option<Duration>,
}

/// Where key sets come from.
#[async_trait]
pub trait KeySource: Send + Sync {
    async fn fetch(&self) -> Result<FetchedKeys, AuthError>;
}

/// Fetches a JWK set over HTTPS.
pub struct HttpKeySource {
    client: reqwest::Client,
    url: String,
}

impl HttpKeySource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl KeySource for HttpKeySource {
    async fn fetch(&self) -> Result<FetchedKeys, AuthError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| AuthError::KeyFetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::KeyFetch(format!(
                "key set endpoint returned {}",
                response.status()
            )));
        }

        let max_age = response
            .headers()
            .get(reqwest::header::CACHE_CONTROL)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_max_age);

        let body: JwksResponse = response
            .json()
            .await
            .map_err(|e| AuthError::KeyFetch(e.to_string()))?;

        Ok(FetchedKeys {
            keys: body.keys,
            max_age,
        })
    }
}

/// Extract `max-age` seconds from a `Cache-Control` header value.
pub fn parse_max_age(cache_control: &str) -> Option<Duration> {
    cache_control
        .split(',')
        .map(str::trim)
        .find_map(|directive| {
            let (name, value) = directive.split_once('=')?;
            if name.trim().eq_ignore_ascii_case("max-age") {
                value.trim().trim_matches('"').parse::<u64>().ok()
            } else {
                None
            }
        })
        .map(Duration::from_secs)
}

/// Immutable snapshot of usable verification keys.
pub struct KeySet {
    keys: HashMap<String, DecodingKey>,
    fetched_at: Instant,
    expires_at: Instant,
}

impl KeySet {
    fn from_fetched(fetched: FetchedKeys, default_ttl: Duration) -> Self {
        let mut keys = HashMap::new();
        for jwk in fetched.keys {
            let (Some(kid), Some(n), Some(e)) = (jwk.kid, jwk.n, jwk.e) else {
                continue;
            };
            if jwk.kty != "RSA" {
                tracing::debug!(%kid, kty = %jwk.kty, "skipping non-RSA key");
                continue;
            }
            match DecodingKey::from_rsa_components(&n, &e) {
                Ok(key) => {
                    keys.insert(kid, key);
                }
                Err(err) => tracing::warn!(%kid, error = %err, "skipping malformed key"),
            }
        }

        let fetched_at = Instant::now();
        Self {
            keys,
            fetched_at,
            expires_at: fetched_at + fetched.max_age.unwrap_or(default_ttl),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, kid: &str) -> bool {
        self.keys.contains_key(kid)
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Process-wide cache in front of a [`KeySource`].
pub struct KeyCache {
    source: Arc<dyn KeySource>,
    current: RwLock<Option<Arc<KeySet>>>,
    default_ttl: Duration,
    refetch_cooldown: Duration,
}

impl KeyCache {
    pub fn new(source: Arc<dyn KeySource>) -> Self {
        Self {
            source,
            current: RwLock::new(None),
            default_ttl: DEFAULT_KEY_TTL,
            refetch_cooldown: DEFAULT_REFETCH_COOLDOWN,
        }
    }

    pub fn with_timing(mut self, default_ttl: Duration, refetch_cooldown: Duration) -> Self {
        self.default_ttl = default_ttl;
        self.refetch_cooldown = refetch_cooldown;
        self
    }

    /// Resolve the verification key for `kid`, refreshing on expiry or miss.
    pub async fn key_for(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        if let Some(set) = self.snapshot() {
            if !set.is_expired() {
                if let Some(key) = set.keys.get(kid) {
                    return Ok(key.clone());
                }
                if set.fetched_at.elapsed() < self.refetch_cooldown {
                    return Err(AuthError::InvalidToken(format!("unknown key id: {kid}")));
                }
            }
        }

        let set = self.refresh().await?;
        set.keys
            .get(kid)
            .cloned()
            .ok_or_else(|| AuthError::InvalidToken(format!("unknown key id: {kid}")))
    }

    /// Fetch a fresh key set and replace the cached one.
    pub async fn refresh(&self) -> Result<Arc<KeySet>, AuthError> {
        let fetched = self.source.fetch().await?;
        let set = Arc::new(KeySet::from_fetched(fetched, self.default_ttl));
        tracing::debug!(keys = set.len(), "refreshed remote key set");

        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        *current = Some(Arc::clone(&set));
        Ok(set)
    }

    /// Current cached set, if any.
    pub fn snapshot(&self) -> Option<Arc<KeySet>> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
