// ── Conversion cache ──
//
// Reference-counted, TTL-bounded cache of bridge endpoints keyed by source
// URL. The entry map sits behind a std mutex that is never held across an
// await; provisioning is serialized per URL by an async gate so concurrent
// first uses of one URL issue a single bridge request.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use dashmap::DashMap;
use futures_util::future::join_all;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::bridge::{Provisioned, StreamBridge};
use crate::error::CoreError;

/// One cached conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionCacheEntry {
    pub source_url: String,
    pub endpoint: String,
    pub token: String,
    pub created: Instant,
    pub expires: Instant,
    pub refs: usize,
}

impl ConversionCacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires <= now
    }

    fn is_evictable(&self, now: Instant) -> bool {
        self.refs == 0 && self.is_expired(now)
    }
}

/// TTL cache of bridge endpoints.
pub struct ConversionCache {
    bridge: Arc<dyn StreamBridge>,
    ttl: Duration,
    entries: Mutex<HashMap<String, ConversionCacheEntry>>,
    gates: DashMap<String, Arc<tokio::sync::Mutex<()>>>,
}

impl ConversionCache {
    pub fn new(bridge: Arc<dyn StreamBridge>, ttl: Duration) -> Self {
        Self {
            bridge,
            ttl,
            entries: Mutex::new(HashMap::new()),
            gates: DashMap::new(),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, ConversionCacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take a reference on the endpoint for `source_url`, provisioning one
    /// on a miss. Pair every successful call with [`release`](Self::release).
    pub async fn acquire(&self, source_url: &str) -> Result<String, CoreError> {
        if let Some(endpoint) = self.reuse(source_url) {
            return Ok(endpoint);
        }

        let gate = Arc::clone(self.gates.entry(source_url.to_owned()).or_default().value());
        let _permit = gate.lock().await;

        // Someone else may have provisioned while we waited.
        if let Some(endpoint) = self.reuse(source_url) {
            return Ok(endpoint);
        }

        if let Some(stale) = self.take_stale(source_url) {
            self.release_at_bridge(&stale).await;
        }

        let Provisioned { endpoint, token } = self
            .bridge
            .provision(source_url)
            .await
            .map_err(|e| CoreError::ConversionUnavailable {
                url: source_url.to_owned(),
                reason: e.to_string(),
            })?;

        let now = Instant::now();
        debug!(source_url, endpoint = %endpoint, "conversion cached");
        self.entries().insert(
            source_url.to_owned(),
            ConversionCacheEntry {
                source_url: source_url.to_owned(),
                endpoint: endpoint.clone(),
                token,
                created: now,
                expires: now + self.ttl,
                refs: 1,
            },
        );
        Ok(endpoint)
    }

    /// Hit path: a live entry, or an expired one still in use, gets another
    /// reference and a fresh expiry.
    fn reuse(&self, source_url: &str) -> Option<String> {
        let now = Instant::now();
        let mut entries = self.entries();
        let entry = entries.get_mut(source_url)?;
        if entry.is_evictable(now) {
            return None;
        }
        entry.refs += 1;
        entry.expires = now + self.ttl;
        debug!(source_url, refs = entry.refs, "conversion cache hit");
        Some(entry.endpoint.clone())
    }

    /// Remove an expired, unreferenced entry so it can be replaced.
    fn take_stale(&self, source_url: &str) -> Option<ConversionCacheEntry> {
        let now = Instant::now();
        let mut entries = self.entries();
        if entries
            .get(source_url)
            .is_some_and(|entry| entry.is_evictable(now))
        {
            return entries.remove(source_url);
        }
        None
    }

    /// Drop one reference. The entry stays cached until swept.
    pub fn release(&self, source_url: &str) {
        let mut entries = self.entries();
        if let Some(entry) = entries.get_mut(source_url) {
            entry.refs = entry.refs.saturating_sub(1);
            debug!(source_url, refs = entry.refs, "conversion reference released");
        }
    }

    /// Evict expired, unreferenced entries and release them at the bridge.
    /// Returns how many were evicted.
    pub async fn sweep(&self) -> usize {
        let now = Instant::now();
        let candidates: Vec<String> = self
            .entries()
            .values()
            .filter(|entry| entry.is_evictable(now))
            .map(|entry| entry.source_url.clone())
            .collect();

        let evicted = join_all(
            candidates
                .iter()
                .map(|url| self.evict(url, |entry| entry.is_evictable(Instant::now()))),
        )
        .await
        .into_iter()
        .filter(|&evicted| evicted)
        .count();

        if evicted > 0 {
            debug!(count = evicted, "conversion cache swept");
        }
        evicted
    }

    /// Release everything at the bridge, referenced or not.
    pub async fn release_all(&self) {
        let urls: Vec<String> = self.entries().keys().cloned().collect();
        join_all(urls.iter().map(|url| self.evict(url, |_| true))).await;
    }

    /// Remove the entry for `source_url` if `evictable` still holds once the
    /// URL's gate is held, and release it at the bridge before letting go of
    /// the gate. A concurrent acquire of the same URL waits on the gate, so
    /// it never provisions a stream the pending release would delete.
    async fn evict(
        &self,
        source_url: &str,
        evictable: impl Fn(&ConversionCacheEntry) -> bool,
    ) -> bool {
        let gate = Arc::clone(self.gates.entry(source_url.to_owned()).or_default().value());
        let removed = {
            let _permit = gate.lock().await;
            let removed = {
                let mut entries = self.entries();
                if entries.get(source_url).is_some_and(&evictable) {
                    entries.remove(source_url)
                } else {
                    None
                }
            };
            if let Some(ref entry) = removed {
                self.release_at_bridge(entry).await;
            }
            removed.is_some()
        };
        drop(gate);
        // Only the map holds the gate now unless an acquire is queued on it.
        self.gates.remove_if(source_url, |_, gate| Arc::strong_count(gate) == 1);
        removed
    }

    async fn release_at_bridge(&self, entry: &ConversionCacheEntry) {
        if let Err(e) = self.bridge.release(&entry.token).await {
            warn!(source_url = %entry.source_url, error = %e, "bridge release failed");
        }
    }

    pub fn entry(&self, source_url: &str) -> Option<ConversionCacheEntry> {
        self.entries().get(source_url).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}
