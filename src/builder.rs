use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::cache::{CacheStore, MemoryCache, SledCache};
use crate::circuit::CircuitBreaker;
use crate::client::Client;
use crate::config::{CacheBackend, ClientConfig};
use crate::error::FlagsError;
use crate::fetcher::{Auth, FlagSource, RemoteFetcher};

pub struct ClientBuilder {
    base_url: String,
    max_retries: u32,
    auth: Auth,
    backend: CacheBackend,
    cache_path: String,
    cooldown: Duration,
    retry_backoff: Duration,
    request_timeout: Duration,
    cache: Option<Arc<dyn CacheStore>>,
    source: Option<Arc<dyn FlagSource>>,
}

pub fn create_builder() -> ClientBuilder {
    ClientBuilder::from_config(ClientConfig::default())
}

impl ClientBuilder {
    pub fn from_config(config: ClientConfig) -> Self {
        Self {
            cooldown: config.cooldown(),
            retry_backoff: config.retry_backoff(),
            request_timeout: config.request_timeout(),
            base_url: config.base_url,
            max_retries: config.max_retries,
            auth: config.auth,
            backend: config.cache.backend,
            cache_path: config.cache.path,
            cache: None,
            source: None,
        }
    }

    /// Replace every setting with the values from `config`.
    pub fn config(self, config: ClientConfig) -> Self {
        Self {
            cache: self.cache,
            source: self.source,
            ..Self::from_config(config)
        }
    }

    pub fn base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn auth(mut self, auth: Auth) -> Self {
        self.auth = auth;
        self
    }

    /// Keep flags in process memory only.
    pub fn memory(mut self) -> Self {
        self.backend = CacheBackend::Memory;
        self
    }

    /// Persist flags in a sled database at `path`.
    pub fn sled(mut self, path: &str) -> Self {
        self.backend = CacheBackend::Sled;
        self.cache_path = path.to_string();
        self
    }

    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Unit of the retry delay; the n-th retry waits `n` units.
    pub fn retry_backoff(mut self, unit: Duration) -> Self {
        self.retry_backoff = unit;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Use a custom cache store instead of the configured backend.
    pub fn cache_store(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Fetch flags from somewhere other than the flags API.
    pub fn source(mut self, source: Arc<dyn FlagSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Open and initialise the cache, then assemble the client. No request
    /// is made until the first flag lookup.
    pub fn build(self) -> Result<Client, FlagsError> {
        let cache: Arc<dyn CacheStore> = match self.cache {
            Some(cache) => cache,
            None => match self.backend {
                CacheBackend::Memory => Arc::new(MemoryCache::new()),
                CacheBackend::Sled => Arc::new(SledCache::open(&self.cache_path)?),
            },
        };
        cache.init()?;

        let source: Arc<dyn FlagSource> = match self.source {
            Some(source) => source,
            None => Arc::new(RemoteFetcher::new(
                &self.base_url,
                self.auth,
                self.request_timeout,
            )?),
        };

        debug!(
            base_url = %self.base_url,
            backend = ?self.backend,
            max_retries = self.max_retries,
            "flags client ready"
        );

        Ok(Client::from_parts(
            cache,
            source,
            CircuitBreaker::new(self.cooldown),
            self.max_retries,
            self.retry_backoff,
            self.base_url,
        ))
    }
}
