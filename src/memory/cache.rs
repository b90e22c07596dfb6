//! Response Cache
//!
//! Bounded, TTL-expiring memo of remote responses keyed by request
//! signature. At most one fetch per signature runs at a time; callers that
//! arrive while it runs wait and then read the stored value.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::debug;

use crate::stats::Mode;

/// Time source for expiry decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
pub struct ManualClock {
    origin: Instant,
    offset: StdMutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: StdMutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        *offset += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = *self.offset.lock().unwrap_or_else(|e| e.into_inner());
        self.origin + offset
    }
}

/// Structural identity of a request: mode, endpoint and a digest of the
/// canonical JSON body. serde_json objects keep keys sorted, so field
/// insertion order does not change the digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    mode: Mode,
    endpoint: String,
    digest: [u8; 32],
}

impl Signature {
    pub fn new(mode: &Mode, endpoint: &str, body: &Value) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(body.to_string().as_bytes());
        Self {
            mode: mode.clone(),
            endpoint: endpoint.to_string(),
            digest: hasher.finalize().into(),
        }
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    /// Short printable form for logs.
    pub fn short(&self) -> String {
        format!("{}:{}:{}", self.mode, self.endpoint, hex::encode(&self.digest[..6]))
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub capacity: usize,
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 512,
            ttl: Duration::from_secs(600),
        }
    }
}

struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
    /// Recency stamp, bumped on every hit.
    last_used: u64,
}

struct Entries<V> {
    map: HashMap<Signature, CacheEntry<V>>,
    tick: u64,
}

pub struct ResponseCache<V> {
    entries: Mutex<Entries<V>>,
    inflight: Mutex<HashMap<Signature, Arc<Mutex<()>>>>,
    capacity: usize,
    clock: Arc<dyn Clock>,
}

impl<V: Clone + Send> ResponseCache<V> {
    pub fn new(capacity: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(Entries {
                map: HashMap::new(),
                tick: 0,
            }),
            inflight: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
            clock,
        }
    }

    /// Stored value when fresh, otherwise run `fetch_fn` and store its
    /// result. Errors are passed through and never stored.
    pub async fn get_or_fetch<F, Fut, E>(
        &self,
        signature: Signature,
        fetch_fn: F,
        ttl: Duration,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.lookup(&signature, ttl).await {
            debug!("cache hit {}", signature.short());
            return Ok(value);
        }

        let gate = self.gate(&signature).await;
        let guard = gate.lock().await;

        // Another caller may have filled the entry while we waited.
        if let Some(value) = self.lookup(&signature, ttl).await {
            debug!("cache hit after wait {}", signature.short());
            drop(guard);
            self.release(&signature, &gate).await;
            return Ok(value);
        }

        debug!("cache miss {}", signature.short());
        let result = fetch_fn().await;
        if let Ok(value) = &result {
            self.store(signature.clone(), value.clone()).await;
        }

        drop(guard);
        self.release(&signature, &gate).await;
        result
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.map.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop every entry belonging to `mode`.
    pub async fn invalidate_mode(&self, mode: &Mode) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.map.len();
        entries.map.retain(|sig, _| sig.mode() != mode);
        before - entries.map.len()
    }

    async fn lookup(&self, signature: &Signature, ttl: Duration) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;
        entries.tick += 1;
        let tick = entries.tick;

        let expired = match entries.map.get_mut(signature) {
            Some(entry) if now.saturating_duration_since(entry.inserted_at) < ttl => {
                entry.last_used = tick;
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            debug!("cache entry expired {}", signature.short());
            entries.map.remove(signature);
        }
        None
    }

    async fn store(&self, signature: Signature, value: V) {
        let inserted_at = self.clock.now();
        let mut entries = self.entries.lock().await;
        entries.tick += 1;
        let last_used = entries.tick;
        entries.map.insert(
            signature,
            CacheEntry {
                value,
                inserted_at,
                last_used,
            },
        );

        while entries.map.len() > self.capacity {
            let oldest = entries
                .map
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(sig, _)| sig.clone());
            match oldest {
                Some(sig) => {
                    debug!("cache evict {}", sig.short());
                    entries.map.remove(&sig);
                }
                None => break,
            }
        }
    }

    async fn gate(&self, signature: &Signature) -> Arc<Mutex<()>> {
        let mut inflight = self.inflight.lock().await;
        inflight
            .entry(signature.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn release(&self, signature: &Signature, gate: &Arc<Mutex<()>>) {
        let mut inflight = self.inflight.lock().await;
        // Our handle plus the map's: nobody else is queued on this signature.
        if Arc::strong_count(gate) <= 2 {
            inflight.remove(signature);
        }
    }
}
