// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Cloudflare Access key discovery.
//!
//! ## Security
//!
//! - Keys are fetched from `<issuer>/cdn-cgi/access/certs` over HTTPS only
//! - The request is bounded by a timeout (5 seconds by default) and never retried
//! - Redirects are not followed
//! - Documents larger than 256 KiB are rejected without being buffered
//! - Only RSA keys are kept; malformed entries are skipped
//! - Caching is off unless a TTL is configured, and stale sets are never served

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::cache::{KeySetCache, DEFAULT_CACHE_CAPACITY};
use super::error::AuthError;

/// Path appended to the issuer to locate its key set.
pub const CERTS_PATH: &str = "/cdn-cgi/access/certs";

/// Default key discovery timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on a key-set document body.
pub const MAX_KEY_SET_BYTES: usize = 256 * 1024;

/// RSA public key material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaPublicKey {
    /// Big-endian modulus bytes
    pub modulus: Vec<u8>,
    /// Public exponent, never zero
    pub exponent: u64,
}

impl RsaPublicKey {
    /// Build the jsonwebtoken key used for signature checks.
    pub fn decoding_key(&self) -> DecodingKey {
        let exponent = self.exponent.to_be_bytes();
        let first = exponent.iter().position(|b| *b != 0).unwrap_or(exponent.len() - 1);
        DecodingKey::from_rsa_raw_components(&self.modulus, &exponent[first..])
    }
}

/// Public keys indexed by key id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySet {
    keys: HashMap<String, RsaPublicKey>,
}

impl KeySet {
    pub fn get(&self, kid: &str) -> Option<&RsaPublicKey> {
        self.keys.get(kid)
    }

    /// Insert a key unless the id is already taken. Returns whether it was added.
    pub fn insert(&mut self, kid: String, key: RsaPublicKey) -> bool {
        if self.keys.contains_key(&kid) {
            return false;
        }
        self.keys.insert(kid, key);
        true
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn key_ids(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }
}

/// One entry of the key-set document. Every field is optional so a single bad
/// entry cannot fail the whole document.
#[derive(Debug, Deserialize)]
struct RawJwk {
    #[serde(default)]
    kty: Option<String>,
    #[serde(default)]
    kid: Option<String>,
    #[serde(default)]
    n: Option<String>,
    #[serde(default)]
    e: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawJwkSet {
    keys: Vec<Value>,
}

/// Fetches issuer key sets, optionally through a [`KeySetCache`].
#[derive(Clone)]
pub struct KeySetFetcher {
    /// HTTP client, timeout applied to every request
    client: reqwest::Client,
    /// Request timeout
    timeout: Duration,
    /// Permit `http://` issuers (local testing only)
    allow_http: bool,
    /// Key-set cache, absent when caching is disabled
    cache: Option<Arc<KeySetCache>>,
}

impl KeySetFetcher {
    /// Create a fetcher with the given request timeout and no cache.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            timeout,
            allow_http: false,
            cache: None,
        })
    }

    /// Cache fetched key sets for `ttl`. A zero TTL disables caching.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache = (!ttl.is_zero()).then(|| Arc::new(KeySetCache::new(DEFAULT_CACHE_CAPACITY, ttl)));
        self
    }

    /// Accept plain `http://` issuers. Only for talking to local test servers.
    pub fn allow_http(mut self) -> Self {
        self.allow_http = true;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Cache TTL, if caching is enabled.
    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache.as_ref().map(|c| c.ttl())
    }

    /// Build the key discovery URL for an issuer.
    pub fn discovery_url(&self, issuer: &str) -> Result<Url, AuthError> {
        let raw = format!("{}{CERTS_PATH}", issuer.trim_end_matches('/'));
        let url = Url::parse(&raw)
            .map_err(|e| AuthError::KeyDiscoveryFailed(format!("invalid issuer URL '{issuer}': {e}")))?;

        match url.scheme() {
            "https" => Ok(url),
            "http" if self.allow_http => Ok(url),
            scheme => Err(AuthError::KeyDiscoveryFailed(format!(
                "issuer URL must use https, got '{scheme}'"
            ))),
        }
    }

    /// Get the key set for an issuer, from the cache when a fresh entry exists.
    pub async fn key_set(&self, issuer: &str) -> Result<Arc<KeySet>, AuthError> {
        if let Some(cache) = &self.cache {
            if let Some(keys) = cache.get(issuer) {
                tracing::debug!(issuer, "Using cached key set");
                return Ok(keys);
            }
        }

        let keys = Arc::new(self.fetch(issuer).await?);

        if let Some(cache) = &self.cache {
            cache.insert(issuer, Arc::clone(&keys));
        }
        Ok(keys)
    }

    /// Fetch and parse the issuer's key set, bypassing the cache.
    pub async fn fetch(&self, issuer: &str) -> Result<KeySet, AuthError> {
        let url = self.discovery_url(issuer)?;
        tracing::debug!(url = %url, "Fetching Access signing keys");

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(AuthError::KeyDiscoveryFailed(format!(
                "HTTP {} from key endpoint",
                response.status()
            )));
        }

        if response
            .content_length()
            .is_some_and(|len| len > MAX_KEY_SET_BYTES as u64)
        {
            return Err(too_large());
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| self.transport_error(e))? {
            if body.len() + chunk.len() > MAX_KEY_SET_BYTES {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }

        let document: Value = serde_json::from_slice(&body)
            .map_err(|e| AuthError::KeyDiscoveryFailed(format!("invalid key set document: {e}")))?;

        let keys = parse_key_set(document)?;
        tracing::debug!(issuer, keys = keys.len(), "Loaded Access signing keys");
        Ok(keys)
    }

    fn transport_error(&self, e: reqwest::Error) -> AuthError {
        if e.is_timeout() {
            AuthError::KeyDiscoveryFailed(format!("key endpoint timed out after {:?}", self.timeout))
        } else {
            AuthError::KeyDiscoveryFailed(e.to_string())
        }
    }
}

fn too_large() -> AuthError {
    AuthError::KeyDiscoveryFailed("key set document too large".to_string())
}

/// Parse a key-set document, keeping usable RSA keys.
pub fn parse_key_set(document: Value) -> Result<KeySet, AuthError> {
    let raw: RawJwkSet = serde_json::from_value(document)
        .map_err(|e| AuthError::KeyDiscoveryFailed(format!("invalid key set document: {e}")))?;

    let mut keys = KeySet::default();
    for entry in raw.keys {
        let jwk = match serde_json::from_value::<RawJwk>(entry) {
            Ok(jwk) => jwk,
            Err(e) => {
                tracing::debug!(error = %e, "Skipping unparseable key entry");
                continue;
            }
        };

        match rsa_key(&jwk) {
            Ok((kid, key)) => {
                if !keys.insert(kid.clone(), key) {
                    tracing::debug!(kid = %kid, "Skipping duplicate key id");
                }
            }
            Err(reason) => {
                tracing::debug!(kid = ?jwk.kid, kty = ?jwk.kty, reason, "Skipping key entry");
            }
        }
    }

    if keys.is_empty() {
        return Err(AuthError::KeyDiscoveryFailed("no usable keys".to_string()));
    }
    Ok(keys)
}

/// Convert one entry to an RSA key, or say why it is unusable.
fn rsa_key(jwk: &RawJwk) -> Result<(String, RsaPublicKey), &'static str> {
    if !jwk.kty.as_deref().is_some_and(|kty| kty.eq_ignore_ascii_case("RSA")) {
        return Err("not an RSA key");
    }
    let kid = non_empty(&jwk.kid).ok_or("missing kid")?;
    let modulus = non_empty(&jwk.n)
        .and_then(decode_component)
        .ok_or("missing or undecodable modulus")?;
    let exponent_bytes = non_empty(&jwk.e)
        .and_then(decode_component)
        .ok_or("missing or undecodable exponent")?;
    let exponent = exponent_from_be_bytes(&exponent_bytes).ok_or("invalid exponent")?;

    Ok((kid.to_string(), RsaPublicKey { modulus, exponent }))
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

fn decode_component(value: &str) -> Option<Vec<u8>> {
    let bytes = URL_SAFE_NO_PAD.decode(value.trim_end_matches('=')).ok()?;
    (!bytes.is_empty()).then_some(bytes)
}

/// Big-endian accumulation. Zero or wider than 64 bits is rejected.
fn exponent_from_be_bytes(bytes: &[u8]) -> Option<u64> {
    let first = bytes.iter().position(|b| *b != 0)?;
    let significant = &bytes[first..];
    if significant.len() > 8 {
        return None;
    }
    Some(significant.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
}
