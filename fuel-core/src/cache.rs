//! Time-limited cache of raw feed bodies.
//!
//! Entries are keyed by the SHA-256 of the feed URL and stay valid for one
//! hour from the moment they were written. Expired entries are left in place
//! and simply read as misses until the next `put` overwrites them. Any storage
//! failure reads as a miss as well; callers never see a cache error from `get`.

use std::{
    collections::HashMap,
    fmt::{self, Debug},
    fs,
    path::PathBuf,
    sync::{Arc, Mutex, PoisonError},
};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::{
    clock::{Clock, SystemClock},
    error::CacheError,
};

/// How long a cached feed body is served before refetching.
pub const CACHE_TTL_SECS: i64 = 60 * 60;

/// Fixed-length key derived from a feed's source URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn for_source(source: &str) -> Self {
        let digest = Sha256::digest(source.as_bytes());
        Self(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One cached feed response, stored exactly as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(with = "body_base64")]
    pub body: Vec<u8>,
}

impl CacheEntry {
    /// Valid while `0 <= now - timestamp < 1h`. An entry stamped in the future
    /// (clock moved backwards) is treated as expired.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.timestamp);
        age >= Duration::zero() && age < Duration::seconds(CACHE_TTL_SECS)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.timestamp + Duration::seconds(CACHE_TTL_SECS)
    }
}

mod body_base64 {
    use base64::{Engine, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(body))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(D::Error::custom)
    }
}

/// Storage for raw feed bodies with get/put/miss semantics.
pub trait FeedCache: Send + Sync + Debug {
    /// A still-valid entry, or `None` on miss, expiry or storage failure.
    fn get(&self, key: &CacheKey) -> Option<CacheEntry>;

    /// Store `body` stamped with the current time, replacing any prior entry.
    fn put(&self, key: &CacheKey, body: &[u8]) -> Result<(), CacheError>;
}

/// On-disk cache: one JSON file per feed under a directory.
/// Survives process restarts; not shared across machines.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
    clock: Arc<dyn Clock>,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), clock: Arc::new(SystemClock) }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn read(&self, key: &CacheKey) -> Result<CacheEntry, CacheError> {
        let bytes = fs::read(self.entry_path(key))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl FeedCache for FileCache {
    fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let entry = match self.read(key) {
            Ok(entry) => entry,
            Err(err) => {
                debug!(%key, error = %err, "feed cache miss");
                return None;
            }
        };

        if entry.is_valid_at(self.clock.now()) {
            Some(entry)
        } else {
            debug!(%key, expired_at = %entry.expires_at(), "feed cache entry expired");
            None
        }
    }

    fn put(&self, key: &CacheKey, body: &[u8]) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir)?;

        let entry = CacheEntry { timestamp: self.clock.now(), body: body.to_vec() };
        let json = serde_json::to_vec(&entry)?;

        // Write then rename so a concurrent reader never sees a half-written file.
        let tmp = self.dir.join(format!("{key}.{}.tmp", std::process::id()));
        let written = fs::write(&tmp, json).and_then(|()| fs::rename(&tmp, self.entry_path(key)));
        if let Err(err) = written {
            let _ = fs::remove_file(&tmp);
            return Err(err.into());
        }

        Ok(())
    }
}

/// In-process cache, mainly for tests and one-shot runs.
#[derive(Debug)]
pub struct MemoryCache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { entries: Mutex::new(HashMap::new()), clock }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl FeedCache for MemoryCache {
    fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).filter(|e| e.is_valid_at(self.clock.now())).cloned()
    }

    fn put(&self, key: &CacheKey, body: &[u8]) -> Result<(), CacheError> {
        let entry = CacheEntry { timestamp: self.clock.now(), body: body.to_vec() };
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), entry);
        Ok(())
    }
}
