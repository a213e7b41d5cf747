use async_trait::async_trait;
use crossbeam_channel::{unbounded, Receiver, Sender};
use once_cell::sync::Lazy;

use super::cache::TileCache;
use super::types::FetchTicket;
use crate::core::config::LoadingConfig;
use crate::prelude::{Arc, HashMap, VecDeque};
use crate::runtime::{AsyncHandle, AsyncSpawner};
use crate::{GridError, Result};

/// Shared async HTTP client for tile fetching
pub(crate) static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .user_agent(concat!("mapgrid/", env!("CARGO_PKG_VERSION")))
        .tcp_keepalive(std::time::Duration::from_secs(30))
        .pool_idle_timeout(std::time::Duration::from_secs(90))
        .pool_max_idle_per_host(16)
        .build()
        .unwrap_or_else(|e| {
            log::warn!("falling back to default HTTP client: {}", e);
            reqwest::Client::new()
        })
});

/// Resolves a resource locator to the bytes behind it
#[async_trait]
pub trait TileFetcher: Send + Sync {
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>>;
}

/// Fetches over HTTP(S) with the shared client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    timeout: std::time::Duration,
}

impl HttpFetcher {
    pub fn new(timeout: std::time::Duration) -> Self {
        Self { timeout }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(std::time::Duration::from_secs(10))
    }
}

#[async_trait]
impl TileFetcher for HttpFetcher {
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>> {
        let response = HTTP_CLIENT
            .get(locator)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(GridError::Network)?;

        if !response.status().is_success() {
            return Err(
                GridError::Fetch(format!("HTTP {} for {}", response.status(), locator)).into(),
            );
        }

        let data = response.bytes().await.map_err(GridError::Network)?.to_vec();
        Ok(data)
    }
}

/// Result of a tile loading operation
#[derive(Debug)]
pub struct FetchResult {
    pub ticket: FetchTicket,
    pub locator: String,
    pub data: Result<Arc<Vec<u8>>>,
}

#[derive(Debug)]
struct QueuedFetch {
    ticket: FetchTicket,
    locator: String,
}

/// Issues tile fetches with bounded concurrency.
///
/// Requests start in the order they were made; anything beyond
/// `max_concurrent` waits in a FIFO queue. Completions are delivered over a
/// channel and picked up with [`TileLoader::try_recv_results`] on the
/// caller's thread. Cache hits go through the same channel, so a
/// completion is never observed inside the call that issued it.
pub struct TileLoader {
    fetcher: Arc<dyn TileFetcher>,
    spawner: Arc<dyn AsyncSpawner>,
    cache: TileCache,
    result_tx: Sender<FetchResult>,
    result_rx: Receiver<FetchResult>,
    queue: VecDeque<QueuedFetch>,
    in_flight: HashMap<FetchTicket, Box<dyn AsyncHandle>>,
    max_concurrent: usize,
}

impl TileLoader {
    pub fn new(
        fetcher: Arc<dyn TileFetcher>,
        spawner: Arc<dyn AsyncSpawner>,
        config: &LoadingConfig,
    ) -> Self {
        let (result_tx, result_rx) = unbounded();
        Self {
            fetcher,
            spawner,
            cache: TileCache::new(config.cache_size),
            result_tx,
            result_rx,
            queue: VecDeque::new(),
            in_flight: HashMap::default(),
            max_concurrent: config.max_concurrent.max(1),
        }
    }

    /// Shares an existing cache, e.g. between layers hitting the same server
    pub fn with_cache(mut self, cache: TileCache) -> Self {
        self.set_cache(cache);
        self
    }

    pub fn set_cache(&mut self, cache: TileCache) {
        self.cache = cache;
    }

    /// Queues a fetch of `locator` stamped with `ticket`
    pub fn request(&mut self, ticket: FetchTicket, locator: String) {
        if let Some(data) = self.cache.get(&locator) {
            log::trace!("cache hit for {} ({})", locator, ticket.tile);
            let _ = self.result_tx.send(FetchResult {
                ticket,
                locator,
                data: Ok(data),
            });
            return;
        }

        self.queue.push_back(QueuedFetch { ticket, locator });
        self.pump();
    }

    /// Cancels a queued or in-flight fetch. Returns whether it was known.
    pub fn cancel(&mut self, ticket: &FetchTicket) -> bool {
        if let Some(handle) = self.in_flight.remove(ticket) {
            handle.cancel();
            self.pump();
            return true;
        }

        if let Some(pos) = self.queue.iter().position(|job| job.ticket == *ticket) {
            self.queue.remove(pos);
            return true;
        }

        false
    }

    fn pump(&mut self) {
        while self.in_flight.len() < self.max_concurrent {
            let Some(job) = self.queue.pop_front() else {
                break;
            };
            self.start(job);
        }
    }

    fn start(&mut self, job: QueuedFetch) {
        let QueuedFetch { ticket, locator } = job;
        let fetcher = Arc::clone(&self.fetcher);
        let result_tx = self.result_tx.clone();
        let task_locator = locator.clone();

        let future = async move {
            let data = fetcher.fetch(&task_locator).await.map(Arc::new);
            let _ = result_tx.send(FetchResult {
                ticket,
                locator: task_locator,
                data,
            });
        };

        match self.spawner.spawn_boxed(Box::pin(future)) {
            Ok(handle) => {
                self.in_flight.insert(ticket, handle);
            }
            Err(e) => {
                log::warn!("could not spawn fetch for {}: {}", locator, e);
                let _ = self.result_tx.send(FetchResult {
                    ticket,
                    locator,
                    data: Err(e),
                });
            }
        }
    }

    /// Try to receive completed fetches (non-blocking)
    pub fn try_recv_results(&mut self) -> Vec<FetchResult> {
        let mut results = Vec::new();
        while let Ok(result) = self.result_rx.try_recv() {
            self.in_flight.remove(&result.ticket);
            if let Ok(data) = &result.data {
                self.cache.put(result.locator.clone(), Arc::clone(data));
            }
            results.push(result);
        }
        self.pump();
        results
    }

    /// Check if there are any completed fetches waiting to be taken
    pub fn has_pending_results(&self) -> bool {
        !self.result_rx.is_empty()
    }

    /// Fetches queued or running
    pub fn pending_count(&self) -> usize {
        self.queue.len() + self.in_flight.len()
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn cache(&self) -> &TileCache {
        &self.cache
    }

    /// Applies a new loading configuration; the cache is rebuilt when its
    /// capacity changes
    pub fn set_config(&mut self, config: &LoadingConfig) {
        self.max_concurrent = config.max_concurrent.max(1);
        if self.cache.capacity() != config.cache_size {
            self.cache = TileCache::new(config.cache_size);
        }
        self.pump();
    }
}
