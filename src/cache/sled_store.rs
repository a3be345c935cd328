use std::path::Path;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sled::transaction::ConflictableTransactionError;
use sled::{IVec, Transactional};

use super::{now, validate_name, CacheStore, DEFAULT_CACHE_TTL, INITIAL_DEADLINE_OFFSET};
use crate::error::FlagsError;
use crate::flag::FeatureFlag;

/// Where the persistent cache lives unless told otherwise.
pub const DEFAULT_PATH: &str = "/tmp/flags.db";

const FLAGS_TREE: &str = "flags";
const METADATA_TREE: &str = "cache_metadata";

const NEXT_REFRESH_TIME: &str = "next_refresh_time";
const CACHE_TTL: &str = "cache_ttl";
const REFRESHED_AT: &str = "refreshed_at";

/// Row stored in the `flags` tree, keyed by flag name.
#[derive(Serialize, Deserialize)]
struct StoredFlag {
    enabled: bool,
    updated_at: i64,
}

/// Persistent flag cache backed by sled.
///
/// Flags and scalar metadata live in two trees that are always written
/// together in one transaction. All timestamps are epoch seconds.
pub struct SledCache {
    db: sled::Db,
    flags: sled::Tree,
    metadata: sled::Tree,
    // Writers take it exclusively so a scan never straddles a commit.
    lock: RwLock<()>,
}

impl SledCache {
    pub fn new(db: sled::Db) -> Result<Self, FlagsError> {
        let flags = db.open_tree(FLAGS_TREE)?;
        let metadata = db.open_tree(METADATA_TREE)?;
        Ok(Self {
            db,
            flags,
            metadata,
            lock: RwLock::new(()),
        })
    }

    /// Open (or create) a sled database at the given directory path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FlagsError> {
        let path = path.as_ref();
        let db = sled::open(path).map_err(|e| {
            FlagsError::Storage(format!("failed to open {}: {}", path.display(), e))
        })?;
        Self::new(db)
    }

    fn metadata_value(&self, key: &str) -> Option<i64> {
        let raw = self.metadata.get(key).ok()??;
        std::str::from_utf8(&raw).ok()?.parse().ok()
    }

    /// Interval recorded by the last refresh, in seconds.
    pub fn cache_ttl(&self) -> Option<i64> {
        let _guard = self.lock.read();
        self.metadata_value(CACHE_TTL)
    }

    /// Rows written before the current snapshot started are leftovers and
    /// never served. Without metadata nothing is trusted.
    fn snapshot_start(&self) -> Option<i64> {
        self.metadata_value(CACHE_TTL)?;
        self.metadata_value(REFRESHED_AT)
    }

    fn decode(raw: &[u8]) -> Result<StoredFlag, FlagsError> {
        serde_json::from_slice(raw)
            .map_err(|e| FlagsError::Storage(format!("corrupt flag row: {}", e)))
    }

    fn flush(&self) -> Result<(), FlagsError> {
        self.db
            .flush()
            .map_err(|e| FlagsError::Storage(format!("failed to flush: {}", e)))?;
        Ok(())
    }
}

impl CacheStore for SledCache {
    fn init(&self) -> Result<(), FlagsError> {
        let _guard = self.lock.write();
        let deadline = (now() - INITIAL_DEADLINE_OFFSET).to_string();
        let has_ttl = self.metadata.contains_key(CACHE_TTL)?;
        let default_ttl = DEFAULT_CACHE_TTL.to_string();

        self.metadata.transaction(|tm| {
            tm.insert(NEXT_REFRESH_TIME, deadline.as_bytes())?;
            if !has_ttl {
                tm.insert(CACHE_TTL, default_ttl.as_bytes())?;
            }
            Ok::<_, ConflictableTransactionError<FlagsError>>(())
        })?;
        self.flush()
    }

    fn get(&self, name: &str) -> (bool, bool) {
        let _guard = self.lock.read();
        let Some(start) = self.snapshot_start() else {
            return (false, false);
        };
        let row = match self.flags.get(name) {
            Ok(Some(raw)) => raw,
            _ => return (false, false),
        };
        match Self::decode(&row) {
            Ok(stored) if stored.updated_at >= start => (stored.enabled, true),
            _ => (false, false),
        }
    }

    fn get_all(&self) -> Result<Vec<FeatureFlag>, FlagsError> {
        let _guard = self.lock.read();
        let Some(start) = self.snapshot_start() else {
            return Ok(Vec::new());
        };

        let mut all = Vec::new();
        for item in self.flags.iter() {
            let (key, value) = item?;
            let stored = Self::decode(&value)?;
            if stored.updated_at < start {
                continue;
            }
            let name = std::str::from_utf8(&key)
                .map_err(|e| FlagsError::Storage(format!("invalid key encoding: {}", e)))?;
            all.push(FeatureFlag::new(name, stored.enabled));
        }
        Ok(all)
    }

    fn refresh(&self, flags: &[FeatureFlag], interval_allowed: i64) -> Result<(), FlagsError> {
        let _guard = self.lock.write();
        let ts = now();

        let mut rows = Vec::with_capacity(flags.len());
        for flag in flags {
            let row = serde_json::to_vec(&StoredFlag {
                enabled: flag.enabled,
                updated_at: ts,
            })
            .map_err(|e| FlagsError::Storage(format!("failed to encode flag row: {}", e)))?;
            rows.push((flag, row));
        }
        let old_keys = self
            .flags
            .iter()
            .keys()
            .collect::<Result<Vec<IVec>, _>>()?;

        let next_refresh = ts.saturating_add(interval_allowed).to_string();
        let ttl = interval_allowed.to_string();
        let refreshed_at = ts.to_string();

        (&self.flags, &self.metadata).transaction(|(tf, tm)| {
            for key in &old_keys {
                tf.remove(key.clone())?;
            }
            for (flag, row) in &rows {
                validate_name(flag).map_err(ConflictableTransactionError::Abort)?;
                tf.insert(flag.name().as_bytes(), row.as_slice())?;
            }
            tm.insert(NEXT_REFRESH_TIME, next_refresh.as_bytes())?;
            tm.insert(CACHE_TTL, ttl.as_bytes())?;
            tm.insert(REFRESHED_AT, refreshed_at.as_bytes())?;
            Ok(())
        })?;
        self.flush()
    }

    fn should_refresh(&self) -> bool {
        let _guard = self.lock.read();
        match self.metadata_value(NEXT_REFRESH_TIME) {
            Some(deadline) => now() > deadline,
            None => true,
        }
    }

    fn clear(&self) -> Result<(), FlagsError> {
        let _guard = self.lock.write();
        let old_keys = self
            .flags
            .iter()
            .keys()
            .collect::<Result<Vec<IVec>, _>>()?;
        let deadline = (now() - INITIAL_DEADLINE_OFFSET).to_string();
        let default_ttl = DEFAULT_CACHE_TTL.to_string();

        (&self.flags, &self.metadata).transaction(|(tf, tm)| {
            for key in &old_keys {
                tf.remove(key.clone())?;
            }
            tm.remove(REFRESHED_AT)?;
            tm.insert(NEXT_REFRESH_TIME, deadline.as_bytes())?;
            tm.insert(CACHE_TTL, default_ttl.as_bytes())?;
            Ok::<_, ConflictableTransactionError<FlagsError>>(())
        })?;
        self.flush()
    }
}
