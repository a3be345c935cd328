pub mod memory;
pub mod sled_store;

use crate::error::FlagsError;
use crate::flag::FeatureFlag;

pub use memory::MemoryCache;
pub use sled_store::SledCache;

/// Refresh interval assumed until the flags API tells us otherwise.
pub const DEFAULT_CACHE_TTL: i64 = 60;

/// How far in the past a fresh cache places its deadline.
pub(crate) const INITIAL_DEADLINE_OFFSET: i64 = 90;

/// Key/value cache of flag states with a refresh deadline.
/// Implementations must be thread-safe.
pub trait CacheStore: Send + Sync {
    /// Set up initial state with the deadline in the past, so the first
    /// `should_refresh` returns `true`.
    fn init(&self) -> Result<(), FlagsError>;

    /// Look up one flag. Returns `(enabled, found)`.
    fn get(&self, name: &str) -> (bool, bool);

    /// All flags of the current snapshot, in no particular order.
    fn get_all(&self) -> Result<Vec<FeatureFlag>, FlagsError>;

    /// Replace the whole snapshot and move the deadline to
    /// `now + interval_allowed`. On error the previous snapshot is kept.
    fn refresh(&self, flags: &[FeatureFlag], interval_allowed: i64) -> Result<(), FlagsError>;

    /// `true` once the deadline has passed, or when it can't be determined.
    fn should_refresh(&self) -> bool;

    /// Drop every flag and put the deadline back in the past.
    fn clear(&self) -> Result<(), FlagsError>;
}

pub(crate) fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Flag names are the cache key, so an empty one can't be stored.
pub(crate) fn validate_name(flag: &FeatureFlag) -> Result<(), FlagsError> {
    if flag.name().is_empty() {
        return Err(FlagsError::Storage("flag name must not be empty".into()));
    }
    Ok(())
}
