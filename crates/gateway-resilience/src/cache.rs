//! Response caching with pluggable backends.
//!
//! Provides a cache backend abstraction that supports:
//! - In-memory caching (default, single-instance)
//! - Redis caching (shared across gateway instances)
//!
//! Keys are model-specific: the same conversation sent to two different
//! models produces two different keys. Backend failures never fail a
//! request; they degrade to a miss or a skipped write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gateway_core::{GatewayRequest, GatewayResponse};
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Error types for cache backend operations
#[derive(Debug, Error)]
pub enum CacheError {
    /// Connection error
    #[error("Cache connection error: {0}")]
    Connection(String),

    /// Serialization error
    #[error("Cache serialization error: {0}")]
    Serialization(String),

    /// Operation timeout
    #[error("Cache operation timeout after {0:?}")]
    Timeout(Duration),

    /// Backend command failed
    #[error("Cache backend error: {0}")]
    Backend(String),
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache backend trait for polymorphic cache implementations
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Get a value from the cache
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Set a value in the cache with TTL
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()>;

    /// Delete a key from the cache
    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// Backend name for logs and stats
    fn name(&self) -> &'static str;
}

/// Local cache entry with instant-based expiry
#[derive(Debug)]
struct LocalCacheEntry {
    data: Vec<u8>,
    expires_at: Instant,
    hits: u64,
}

impl LocalCacheEntry {
    fn new(data: Vec<u8>, ttl: Duration) -> Self {
        Self {
            data,
            expires_at: Instant::now() + ttl,
            hits: 0,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// In-memory cache backend for single-instance deployments
#[derive(Debug)]
pub struct MemoryCacheBackend {
    entries: RwLock<HashMap<String, LocalCacheEntry>>,
    max_entries: usize,
}

impl MemoryCacheBackend {
    /// Create a new memory cache backend
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries: max_entries.max(1),
        }
    }

    /// Number of stored entries, expired ones included
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the backend holds no entries
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drop expired entries, then the least-hit ones until there is room
    fn evict_if_needed(&self, entries: &mut HashMap<String, LocalCacheEntry>) {
        entries.retain(|_, entry| !entry.is_expired());

        if entries.len() >= self.max_entries {
            let to_remove = entries.len() - self.max_entries + 1;
            let mut hit_counts: Vec<(String, u64)> = entries
                .iter()
                .map(|(k, v)| (k.clone(), v.hits))
                .collect();
            hit_counts.sort_by_key(|(_, hits)| *hits);

            for (key, _) in hit_counts.into_iter().take(to_remove) {
                entries.remove(&key);
            }
        }
    }
}

#[async_trait]
impl CacheBackend for MemoryCacheBackend {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut entries = self.entries.write().await;

        if let Some(entry) = entries.get_mut(key) {
            if entry.is_expired() {
                entries.remove(key);
                return Ok(None);
            }
            entry.hits += 1;
            return Ok(Some(entry.data.clone()));
        }

        Ok(None)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()> {
        let mut entries = self.entries.write().await;
        if !entries.contains_key(key) {
            self.evict_if_needed(&mut entries);
        }
        entries.insert(key.to_string(), LocalCacheEntry::new(value, ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Redis cache backend
pub struct RedisCacheBackend {
    connection: ConnectionManager,
    key_prefix: String,
    operation_timeout: Duration,
}

impl std::fmt::Debug for RedisCacheBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCacheBackend")
            .field("key_prefix", &self.key_prefix)
            .field("operation_timeout", &self.operation_timeout)
            .finish_non_exhaustive()
    }
}

impl RedisCacheBackend {
    /// Connect to Redis
    ///
    /// # Arguments
    /// * `url` - Redis connection URL
    /// * `key_prefix` - Prefix for all keys (namespace isolation)
    /// * `operation_timeout` - Timeout for connecting and for each command
    ///
    /// # Errors
    /// Returns error if the URL is invalid or the connection fails
    pub async fn connect(
        url: &str,
        key_prefix: impl Into<String>,
        operation_timeout: Duration,
    ) -> CacheResult<Self> {
        let key_prefix = key_prefix.into();
        let client =
            redis::Client::open(url).map_err(|e| CacheError::Connection(e.to_string()))?;

        let connection = tokio::time::timeout(operation_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| CacheError::Timeout(operation_timeout))?
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        info!(prefix = %key_prefix, "Redis cache backend connected");

        Ok(Self {
            connection,
            key_prefix,
            operation_timeout,
        })
    }

    fn prefixed_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    async fn execute<T>(&self, cmd: redis::Cmd) -> CacheResult<T>
    where
        T: redis::FromRedisValue,
    {
        let mut connection = self.connection.clone();
        tokio::time::timeout(self.operation_timeout, cmd.query_async::<_, T>(&mut connection))
            .await
            .map_err(|_| CacheError::Timeout(self.operation_timeout))?
            .map_err(|e| CacheError::Backend(e.to_string()))
    }
}

#[async_trait]
impl CacheBackend for RedisCacheBackend {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut cmd = redis::cmd("GET");
        cmd.arg(self.prefixed_key(key));
        self.execute(cmd).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(self.prefixed_key(key))
            .arg(value)
            .arg("EX")
            .arg(ttl.as_secs().max(1));
        self.execute(cmd).await
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut cmd = redis::cmd("DEL");
        cmd.arg(self.prefixed_key(key));
        self.execute(cmd).await
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

/// Stored cache value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedEntry {
    /// The cached response
    pub response: GatewayResponse,
    /// When the entry was stored
    pub stored_at: DateTime<Utc>,
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Whether caching is enabled
    pub enabled: bool,
    /// Backend name
    pub backend: String,
    /// Entry time-to-live in seconds
    pub ttl_seconds: u64,
    /// Key lookups that found an entry
    pub hits: u64,
    /// Key lookups that found nothing
    pub misses: u64,
    /// Entries written
    pub writes: u64,
    /// Backend or serialization failures
    pub errors: u64,
}

impl CacheStats {
    /// Hit rate in percent
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    errors: AtomicU64,
}

/// Response cache keyed by conversation and model
#[derive(Clone)]
pub struct ResponseCache {
    backend: Option<Arc<dyn CacheBackend>>,
    ttl: Duration,
    counters: Arc<Counters>,
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("backend", &self.backend.as_ref().map(|b| b.name()))
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl ResponseCache {
    /// Create a cache over `backend`
    #[must_use]
    pub fn new(backend: Arc<dyn CacheBackend>, ttl: Duration) -> Self {
        Self {
            backend: Some(backend),
            ttl,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Create an in-memory cache
    #[must_use]
    pub fn in_memory(max_entries: usize, ttl: Duration) -> Self {
        Self::new(Arc::new(MemoryCacheBackend::new(max_entries)), ttl)
    }

    /// Create a disabled cache
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            backend: None,
            ttl: Duration::ZERO,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Check if caching is enabled
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Derive the key for `request` answered by `model`
    ///
    /// Covers message roles and contents in order, the model, and the
    /// response format hint.
    #[must_use]
    pub fn key_for(request: &GatewayRequest, model: &str) -> String {
        let mut hasher = Sha256::new();
        for message in &request.messages {
            hasher.update(message.role.as_str().as_bytes());
            hasher.update([0x1f]);
            hasher.update(message.content.as_bytes());
            hasher.update([0x1e]);
        }
        hasher.update(b"model:");
        hasher.update(model.as_bytes());
        if let Some(format) = request.response_format {
            hasher.update(b"|format:");
            hasher.update(format.as_str().as_bytes());
        }
        format!("response:{}", hex::encode(hasher.finalize()))
    }

    /// Get a cached response; failures read as a miss
    pub async fn get(&self, key: &str) -> Option<GatewayResponse> {
        self.get_first(&[key]).await
    }

    /// First cached response among `keys`, in order
    ///
    /// The whole lookup counts as a single hit or a single miss.
    pub async fn get_first<K: AsRef<str>>(&self, keys: &[K]) -> Option<GatewayResponse> {
        let backend = self.backend.as_ref()?;

        for key in keys {
            if let Some(response) = self.lookup(&**backend, key.as_ref()).await {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                return Some(response);
            }
        }
        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    async fn lookup(&self, backend: &dyn CacheBackend, key: &str) -> Option<GatewayResponse> {
        let data = match backend.get(key).await {
            Ok(Some(data)) => data,
            Ok(None) => return None,
            Err(e) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                warn!(backend = backend.name(), error = %e, "Cache get failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_slice::<CachedEntry>(&data) {
            Ok(entry) => {
                debug!(key = %key, provider = %entry.response.provider, "Cache hit");
                let mut response = entry.response;
                response.cached = true;
                Some(response)
            }
            Err(e) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                warn!(key = %key, error = %e, "Discarding unreadable cache entry");
                if let Err(e) = backend.delete(key).await {
                    warn!(key = %key, error = %e, "Failed to delete unreadable cache entry");
                }
                None
            }
        }
    }

    /// Store a response; failures are logged and skipped
    pub async fn put(&self, key: &str, response: &GatewayResponse) {
        let Some(backend) = self.backend.as_ref() else {
            return;
        };

        let mut response = response.clone();
        response.cached = false;
        let entry = CachedEntry {
            response,
            stored_at: Utc::now(),
        };

        let data = match serde_json::to_vec(&entry) {
            Ok(data) => data,
            Err(e) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                warn!(error = %CacheError::Serialization(e.to_string()), "Failed to serialize cache entry");
                return;
            }
        };

        match backend.set(key, data, self.ttl).await {
            Ok(()) => {
                self.counters.writes.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, ttl_secs = self.ttl.as_secs(), "Response cached");
            }
            Err(e) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                warn!(backend = backend.name(), error = %e, "Cache put failed, skipping");
            }
        }
    }

    /// Get cache statistics
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            enabled: self.is_enabled(),
            backend: self
                .backend
                .as_ref()
                .map_or("disabled", |b| b.name())
                .to_string(),
            ttl_seconds: self.ttl.as_secs(),
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            writes: self.counters.writes.load(Ordering::Relaxed),
            errors: self.counters.errors.load(Ordering::Relaxed),
        }
    }
}
