use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::cache::CacheStore;
use crate::circuit::CircuitBreaker;
use crate::error::FlagsError;
use crate::fetcher::FlagSource;
use crate::flag::FeatureFlag;
use crate::overrides;

/// What a call to [`Client::refresh_cycle`] ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Flags were fetched and the cache replaced.
    Refreshed,
    /// The breaker is open and cooling down; nothing was fetched.
    Suppressed,
    /// Every attempt failed and the breaker is now open.
    BreakerOpened,
}

/// Resolves flags against environment overrides and a lazily refreshed cache.
///
/// Safe to share between threads (wrap it in an `Arc`). Every instance owns
/// its own cache handle and circuit breaker.
pub struct Client {
    cache: Arc<dyn CacheStore>,
    source: Arc<dyn FlagSource>,
    breaker: CircuitBreaker,
    max_retries: u32,
    retry_backoff: Duration,
    base_url: String,
}

/// A flag name bound to the client that resolves it.
pub struct Flag<'a> {
    name: String,
    client: &'a Client,
}

impl<'a> Flag<'a> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn enabled(&self) -> bool {
        self.client.is_enabled(&self.name)
    }
}

impl Client {
    pub(crate) fn from_parts(
        cache: Arc<dyn CacheStore>,
        source: Arc<dyn FlagSource>,
        breaker: CircuitBreaker,
        max_retries: u32,
        retry_backoff: Duration,
        base_url: String,
    ) -> Self {
        Self {
            cache,
            source,
            breaker,
            max_retries,
            retry_backoff,
            base_url,
        }
    }

    pub fn is(&self, name: &str) -> Flag<'_> {
        Flag {
            name: name.to_string(),
            client: self,
        }
    }

    /// Resolve a flag. Never fails: unknown flags, and any trouble reaching
    /// the flags API, come out as `false` or as the last cached value.
    pub fn is_enabled(&self, name: &str) -> bool {
        if self.cache.should_refresh() {
            if let Err(e) = self.refresh_cycle() {
                error!(error = %e, "failed to refetch flags");
            }
        }

        if let Some(enabled) = overrides::lookup(&overrides::from_env(), name) {
            debug!(flag = name, enabled, "using environment override");
            return enabled;
        }

        let (enabled, found) = self.cache.get(name);
        found && enabled
    }

    /// All cached flags, without overrides applied.
    pub fn list(&self) -> Result<Vec<FeatureFlag>, FlagsError> {
        self.cache.get_all()
    }

    /// Fetch the flag set and replace the cache, retrying with a growing
    /// delay. Runs regardless of the cache deadline, but respects the breaker.
    pub fn refresh_cycle(&self) -> Result<RefreshOutcome, FlagsError> {
        if !self.breaker.allow_request() {
            debug!("circuit open, serving cached flags");
            return Ok(RefreshOutcome::Suppressed);
        }

        let attempts = self.max_retries.max(1);
        let mut last_error = None;
        for attempt in 0..attempts {
            match self.source.fetch() {
                Ok(response) => {
                    self.breaker.record_success();
                    self.cache
                        .refresh(&response.flags, response.interval_allowed)?;
                    debug!(
                        flags = response.flags.len(),
                        interval = response.interval_allowed,
                        "flag cache refreshed"
                    );
                    return Ok(RefreshOutcome::Refreshed);
                }
                Err(e) if e.is_auth() => return Err(e),
                Err(e) => {
                    warn!(attempt = attempt + 1, error = %e, "flag fetch failed");
                    if self.breaker.record_failure(attempts) {
                        error!(
                            cooldown = ?self.breaker.cooldown(),
                            "too many failed fetches, opening circuit"
                        );
                        return Ok(RefreshOutcome::BreakerOpened);
                    }
                    last_error = Some(e);
                    std::thread::sleep(self.retry_backoff * (attempt + 1));
                }
            }
        }

        // Only reachable when a concurrent success reset the failure count.
        match last_error {
            Some(e) => Err(e),
            None => Ok(RefreshOutcome::Suppressed),
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn circuit_open(&self) -> bool {
        self.breaker.is_open()
    }
}
