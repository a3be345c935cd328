use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;

use super::{now, validate_name, CacheStore, DEFAULT_CACHE_TTL, INITIAL_DEADLINE_OFFSET};
use crate::error::FlagsError;
use crate::flag::FeatureFlag;

/// Flags plus the deadline that governs them. Never mutated once published.
#[derive(Debug)]
struct Snapshot {
    flags: HashMap<String, FeatureFlag>,
    cache_ttl: i64,
    next_refresh: i64,
}

impl Snapshot {
    fn empty() -> Self {
        Self {
            flags: HashMap::new(),
            cache_ttl: DEFAULT_CACHE_TTL,
            next_refresh: now() - INITIAL_DEADLINE_OFFSET,
        }
    }
}

/// Process-lifetime flag cache. Every refresh publishes a whole new
/// snapshot with a single pointer swap, so readers never block and never
/// see flags from one refresh next to the deadline of another.
pub struct MemoryCache {
    snapshot: ArcSwap<Snapshot>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(Snapshot::empty()),
        }
    }

    /// Interval of the current snapshot, in seconds.
    pub fn cache_ttl(&self) -> i64 {
        self.snapshot.load().cache_ttl
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStore for MemoryCache {
    fn init(&self) -> Result<(), FlagsError> {
        self.snapshot.store(Arc::new(Snapshot::empty()));
        Ok(())
    }

    fn get(&self, name: &str) -> (bool, bool) {
        match self.snapshot.load().flags.get(name) {
            Some(flag) => (flag.enabled, true),
            None => (false, false),
        }
    }

    fn get_all(&self) -> Result<Vec<FeatureFlag>, FlagsError> {
        Ok(self.snapshot.load().flags.values().cloned().collect())
    }

    fn refresh(&self, flags: &[FeatureFlag], interval_allowed: i64) -> Result<(), FlagsError> {
        let mut map = HashMap::with_capacity(flags.len());
        for flag in flags {
            validate_name(flag)?;
            map.insert(flag.details.name.clone(), flag.clone());
        }
        self.snapshot.store(Arc::new(Snapshot {
            flags: map,
            cache_ttl: interval_allowed,
            next_refresh: now().saturating_add(interval_allowed),
        }));
        Ok(())
    }

    fn should_refresh(&self) -> bool {
        now() > self.snapshot.load().next_refresh
    }

    fn clear(&self) -> Result<(), FlagsError> {
        self.init()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_cache_wants_refresh() {
        let cache = MemoryCache::new();
        assert!(cache.should_refresh());
        assert_eq!(cache.get("anything"), (false, false));
        assert!(cache.get_all().unwrap().is_empty());
    }

    #[test]
    fn test_refresh_moves_deadline() {
        let cache = MemoryCache::new();
        cache
            .refresh(&[FeatureFlag::new("a", true)], 60)
            .unwrap();
        assert!(!cache.should_refresh());
        assert_eq!(cache.cache_ttl(), 60);
        assert_eq!(cache.get("a"), (true, true));
    }

    #[test]
    fn test_negative_interval_is_already_stale() {
        let cache = MemoryCache::new();
        cache.refresh(&[], -1).unwrap();
        assert!(cache.should_refresh());
    }

    #[test]
    fn test_huge_interval_saturates() {
        let cache = MemoryCache::new();
        cache
            .refresh(&[FeatureFlag::new("a", true)], i64::MAX)
            .unwrap();
        assert!(!cache.should_refresh());
        assert_eq!(cache.get("a"), (true, true));
    }

    #[test]
    fn test_refresh_replaces_instead_of_merging() {
        let cache = MemoryCache::new();
        cache
            .refresh(&[FeatureFlag::new("old", true), FeatureFlag::new("kept", true)], 60)
            .unwrap();
        cache
            .refresh(&[FeatureFlag::new("kept", false)], 60)
            .unwrap();
        assert_eq!(cache.get("old"), (false, false));
        assert_eq!(cache.get("kept"), (false, true));
        assert_eq!(cache.get_all().unwrap().len(), 1);
    }

    #[test]
    fn test_rejected_refresh_keeps_previous_snapshot() {
        let cache = MemoryCache::new();
        cache
            .refresh(&[FeatureFlag::new("a", true)], 60)
            .unwrap();
        let result = cache.refresh(
            &[FeatureFlag::new("b", true), FeatureFlag::new("", true)],
            120,
        );
        assert!(matches!(result, Err(FlagsError::Storage(_))));
        assert_eq!(cache.get("a"), (true, true));
        assert_eq!(cache.get("b"), (false, false));
        assert_eq!(cache.cache_ttl(), 60);
    }

    #[test]
    fn test_duplicate_names_last_wins() {
        let cache = MemoryCache::new();
        cache
            .refresh(&[FeatureFlag::new("dup", true), FeatureFlag::new("dup", false)], 60)
            .unwrap();
        assert_eq!(cache.get("dup"), (false, true));
    }

    #[test]
    fn test_clear() {
        let cache = MemoryCache::new();
        cache
            .refresh(&[FeatureFlag::new("a", true)], 60)
            .unwrap();
        cache.clear().unwrap();
        assert!(cache.should_refresh());
        assert_eq!(cache.get("a"), (false, false));
    }
}
