use crate::sync::fetcher::StateFetcher;
use crate::sync::metrics::CacheStats;
use futures::FutureExt;
use futures::future::BoxFuture;
use futures::future::Shared;
use outreach_backend_client::FetchError;
use outreach_protocol::ExecutionState;
use outreach_protocol::RunStatus;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::time::Instant;
use tokio::time::timeout;
use tracing::debug;
use tracing::warn;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(2);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum age at which an entry is served without a network call.
    pub ttl: Duration,
    /// Upper bound for a single fetch; expiry surfaces as a network error.
    pub request_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_CACHE_TTL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

type FetchResult = Result<Arc<ExecutionState>, FetchError>;
type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

struct CacheEntry {
    data: Arc<ExecutionState>,
    timestamp: Instant,
    /// Campaign the backend said the data belongs to.
    campaign_id: String,
}

impl CacheEntry {
    fn is_valid_for(&self, campaign_id: &str, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.timestamp) < ttl && self.campaign_id == campaign_id
    }
}

struct InFlight {
    seq: u64,
    fetch: SharedFetch,
}

/// Result of a cache read plus the id of the network fetch that produced it,
/// if any. Callers that joined the same fetch see the same id.
pub(crate) struct CacheRead {
    pub(crate) result: FetchResult,
    pub(crate) fetch_seq: Option<u64>,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    network_fetches: AtomicU64,
    joined_in_flight: AtomicU64,
}

struct CacheInner {
    fetcher: Arc<dyn StateFetcher>,
    config: CacheConfig,
    entries: Mutex<HashMap<String, CacheEntry>>,
    in_flight: Mutex<HashMap<String, InFlight>>,
    next_seq: AtomicU64,
    counters: Counters,
}

/// Process-wide execution-state cache with single-flight fetching.
///
/// Construct one per process (or per test) and clone it into every
/// controller; clones share the same entries.
#[derive(Clone)]
pub struct ExecutionCache {
    inner: Arc<CacheInner>,
}

impl ExecutionCache {
    pub fn new(fetcher: Arc<dyn StateFetcher>, config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                fetcher,
                config,
                entries: Mutex::new(HashMap::new()),
                in_flight: Mutex::new(HashMap::new()),
                next_seq: AtomicU64::new(0),
                counters: Counters::default(),
            }),
        }
    }

    pub fn config(&self) -> CacheConfig {
        self.inner.config
    }

    /// Serve a valid entry unless `bypass_cache` is set; otherwise fetch,
    /// store and return. Concurrent reads of one campaign share one request.
    /// Must be called within a tokio runtime.
    pub async fn get(
        &self,
        campaign_id: &str,
        bypass_cache: bool,
    ) -> Result<Arc<ExecutionState>, FetchError> {
        self.read(campaign_id, bypass_cache).await.result
    }

    pub(crate) async fn read(&self, campaign_id: &str, bypass_cache: bool) -> CacheRead {
        if !bypass_cache {
            if let Some(data) = self.peek(campaign_id) {
                self.inner.counters.hits.fetch_add(1, Ordering::Relaxed);
                debug!("execution state cache hit for {campaign_id}");
                return CacheRead {
                    result: Ok(data),
                    fetch_seq: None,
                };
            }
        }
        self.inner.counters.misses.fetch_add(1, Ordering::Relaxed);

        let (seq, fetch) = self.join_or_start(campaign_id);
        CacheRead {
            result: fetch.await,
            fetch_seq: Some(seq),
        }
    }

    /// Valid entry for the campaign, without touching counters or the network.
    pub fn peek(&self, campaign_id: &str) -> Option<Arc<ExecutionState>> {
        let entries = lock(&self.inner.entries);
        entries
            .get(campaign_id)
            .filter(|entry| entry.is_valid_for(campaign_id, self.inner.config.ttl, Instant::now()))
            .map(|entry| Arc::clone(&entry.data))
    }

    pub fn evict(&self, campaign_id: &str) {
        if lock(&self.inner.entries).remove(campaign_id).is_some() {
            debug!("evicted cached execution state for {campaign_id}");
        }
    }

    pub fn clear(&self) {
        lock(&self.inner.entries).clear();
    }

    pub fn stats(&self) -> CacheStats {
        let counters = &self.inner.counters;
        CacheStats {
            hits: counters.hits.load(Ordering::Relaxed),
            misses: counters.misses.load(Ordering::Relaxed),
            network_fetches: counters.network_fetches.load(Ordering::Relaxed),
            joined_in_flight: counters.joined_in_flight.load(Ordering::Relaxed),
            entries: lock(&self.inner.entries).len(),
        }
    }

    fn join_or_start(&self, campaign_id: &str) -> (u64, SharedFetch) {
        let mut in_flight = lock(&self.inner.in_flight);
        if let Some(existing) = in_flight.get(campaign_id) {
            self.inner
                .counters
                .joined_in_flight
                .fetch_add(1, Ordering::Relaxed);
            debug!("joining in-flight execution state fetch for {campaign_id}");
            return (existing.seq, existing.fetch.clone());
        }

        let seq = self.inner.next_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let inner = Arc::clone(&self.inner);
        let id = campaign_id.to_string();
        // The request runs on its own task so it completes, stores and
        // releases its slot even if every waiter goes away.
        let task = tokio::spawn(inner.fetch_and_store(id, seq));
        let fetch = async move {
            task.await.unwrap_or_else(|err| {
                Err(FetchError::Transport {
                    message: format!("fetch task ended unexpectedly: {err}"),
                })
            })
        }
        .boxed()
        .shared();
        in_flight.insert(
            campaign_id.to_string(),
            InFlight {
                seq,
                fetch: fetch.clone(),
            },
        );
        (seq, fetch)
    }
}

impl CacheInner {
    async fn fetch_and_store(self: Arc<Self>, campaign_id: String, seq: u64) -> FetchResult {
        self.counters.network_fetches.fetch_add(1, Ordering::Relaxed);
        let request_timeout = self.config.request_timeout;
        let started = Instant::now();
        let outcome = match timeout(request_timeout, self.fetcher.fetch(&campaign_id)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                timeout_ms: saturating_millis(request_timeout),
            }),
        };

        let outcome = match outcome {
            Ok(state) => {
                let data = Arc::new(state);
                self.store(&campaign_id, Arc::clone(&data), started);
                Ok(data)
            }
            Err(err) => {
                warn!("execution state fetch for {campaign_id} failed ({}): {err}", err.kind());
                Err(err)
            }
        };

        let mut in_flight = lock(&self.in_flight);
        if in_flight
            .get(&campaign_id)
            .is_some_and(|current| current.seq == seq)
        {
            in_flight.remove(&campaign_id);
        }
        outcome
    }

    /// Entries are stamped with the time their request started, and a write
    /// never replaces an entry from a later request. Completed and failed runs are dropped
    /// right after being written so the next read always goes to network.
    fn store(&self, key: &str, data: Arc<ExecutionState>, timestamp: Instant) {
        let mut entries = lock(&self.entries);
        if entries
            .get(key)
            .is_some_and(|existing| existing.timestamp > timestamp)
        {
            debug!("discarding older execution state for {key}");
            return;
        }
        let evict = data.run_status().is_some_and(RunStatus::evicts_on_write);
        let campaign_id = data.campaign_id.clone();
        entries.insert(
            key.to_string(),
            CacheEntry {
                data,
                timestamp,
                campaign_id,
            },
        );
        if evict {
            entries.remove(key);
            debug!("run for {key} finished; cache entry evicted");
        }
    }
}

impl fmt::Debug for ExecutionCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats();
        f.debug_struct("ExecutionCache")
            .field("config", &self.inner.config)
            .field("entries", &stats.entries)
            .field("hits", &stats.hits)
            .field("misses", &stats.misses)
            .finish()
    }
}

fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
