// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Issuer-keyed LRU cache for fetched key sets.
//!
//! Entries older than the TTL are never returned; an expired entry is evicted
//! on lookup so the caller falls through to a fresh fetch.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use lru::LruCache;

use super::jwks::KeySet;

/// Default number of issuers kept.
pub const DEFAULT_CACHE_CAPACITY: usize = 16;

/// Cached entry: key set + fetch timestamp.
struct CacheEntry {
    keys: Arc<KeySet>,
    fetched_at: Instant,
}

/// In-process cache of key sets, keyed by issuer.
pub struct KeySetCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
    /// Set once a poisoned lock has been logged
    poison_reported: AtomicBool,
}

impl KeySetCache {
    /// Create a new cache with the given capacity and TTL.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            ttl,
            poison_reported: AtomicBool::new(false),
        }
    }

    /// A poisoned lock leaves the cache bypassed: lookups miss, inserts drop.
    fn lock(&self) -> Option<MutexGuard<'_, LruCache<String, CacheEntry>>> {
        match self.entries.lock() {
            Ok(entries) => Some(entries),
            Err(_) => {
                if !self.poison_reported.swap(true, Ordering::Relaxed) {
                    tracing::warn!("Key set cache lock poisoned; every verification now fetches keys");
                }
                None
            }
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get the key set for an issuer if it was fetched less than a TTL ago.
    pub fn get(&self, issuer: &str) -> Option<Arc<KeySet>> {
        let mut entries = self.lock()?;
        if let Some(entry) = entries.get(issuer) {
            if entry.fetched_at.elapsed() < self.ttl {
                return Some(Arc::clone(&entry.keys));
            }
            entries.pop(issuer);
        }
        None
    }

    /// Store a freshly fetched key set.
    pub fn insert(&self, issuer: &str, keys: Arc<KeySet>) {
        if let Some(mut entries) = self.lock() {
            entries.put(
                issuer.to_string(),
                CacheEntry {
                    keys,
                    fetched_at: Instant::now(),
                },
            );
        }
    }

    /// Number of entries currently held, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
