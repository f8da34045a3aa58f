//! In-process TTL cache for resolved user banners.
//!
//! Each populated key holds two companion entries: the banner body and its
//! active flag. A lookup is a hit only when both are present, unexpired and
//! of the expected shape; anything else counts as a miss.

pub mod user_banner;

use dashmap::DashMap;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::debug;

use crate::db::models::Content;

pub use user_banner::{BannerSource, UserBanner, UserBannerCache, UserBannerLookup};

/// Canonical request signature: feature id plus the sorted, deduplicated tag ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    feature_id: i32,
    tag_ids: Vec<i32>,
}

impl CacheKey {
    pub fn new(feature_id: i32, tag_ids: impl IntoIterator<Item = i32>) -> Self {
        let tag_ids: BTreeSet<i32> = tag_ids.into_iter().collect();
        CacheKey {
            feature_id,
            tag_ids: tag_ids.into_iter().collect(),
        }
    }

    pub fn feature_id(&self) -> i32 {
        self.feature_id
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tags: Vec<String> = self.tag_ids.iter().map(|id| id.to_string()).collect();
        write!(f, "feature_id={}&tag_ids={}", self.feature_id, tags.join(","))
    }
}

#[derive(Debug, Clone)]
enum CachedValue {
    Body(Content),
    ActiveFlag(bool),
}

#[derive(Debug)]
struct Entry {
    value: CachedValue,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

/// The companion entries of one key. They share a map slot, so a write
/// replaces both under a single shard lock and a read sees one generation.
#[derive(Debug, Default)]
struct Companions {
    body: Option<Entry>,
    active_flag: Option<Entry>,
}

impl Companions {
    fn expired_count(&self, now: Instant) -> usize {
        [&self.body, &self.active_flag]
            .into_iter()
            .flatten()
            .filter(|entry| entry.is_expired(now))
            .count()
    }

    fn live(entry: &Option<Entry>, now: Instant) -> Option<&CachedValue> {
        entry
            .as_ref()
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| &entry.value)
    }
}

/// A banner body together with its active flag, as read from the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedBanner {
    pub content: Content,
    pub is_active: bool,
}

pub struct BannerCache {
    entries: DashMap<CacheKey, Companions>,
    ttl: Option<Duration>,
}

impl BannerCache {
    /// `ttl: None` keeps entries until they are overwritten or evicted.
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<CachedBanner> {
        self.get_at(key, Instant::now())
    }

    fn get_at(&self, key: &CacheKey, now: Instant) -> Option<CachedBanner> {
        let companions = self.entries.get(key)?;
        if companions.expired_count(now) > 0 {
            // The read guard must be released before touching the shard again.
            drop(companions);
            self.entries
                .remove_if(key, |_, companions| companions.expired_count(now) > 0);
            return None;
        }

        let content = match Companions::live(&companions.body, now)? {
            CachedValue::Body(content) => content.clone(),
            other => {
                debug!(key = %key, value = ?other, "Unexpected value in banner body slot.");
                return None;
            }
        };
        let is_active = match Companions::live(&companions.active_flag, now) {
            Some(CachedValue::ActiveFlag(is_active)) => *is_active,
            Some(other) => {
                debug!(key = %key, value = ?other, "Unexpected value in active flag slot.");
                return None;
            }
            None => {
                debug!(key = %key, "Active flag missing for cached banner body.");
                return None;
            }
        };
        Some(CachedBanner { content, is_active })
    }

    /// Writes both companion entries with the same deadline in one map write.
    pub fn insert(&self, key: CacheKey, content: Content, is_active: bool) {
        self.insert_at(key, content, is_active, Instant::now());
    }

    fn insert_at(&self, key: CacheKey, content: Content, is_active: bool, now: Instant) {
        let expires_at = self.ttl.map(|ttl| now + ttl);
        self.entries.insert(
            key,
            Companions {
                body: Some(Entry {
                    value: CachedValue::Body(content),
                    expires_at,
                }),
                active_flag: Some(Entry {
                    value: CachedValue::ActiveFlag(is_active),
                    expires_at,
                }),
            },
        );
    }

    pub fn remove(&self, key: &CacheKey) {
        self.entries.remove(key);
    }

    /// Drops every entry of `feature_id`. Returns the number of keys dropped.
    pub fn evict_feature(&self, feature_id: i32) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| key.feature_id != feature_id);
        before.saturating_sub(self.entries.len())
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Removes keys with an expired entry. Returns the number of keys removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    fn purge_expired_at(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, companions| companions.expired_count(now) == 0);
        before.saturating_sub(self.entries.len())
    }

    /// Number of populated keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Periodically drops expired entries so unused keys do not pile up.
pub fn spawn_sweeper(cache: Arc<BannerCache>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let purged = cache.purge_expired();
            if purged > 0 {
                debug!(purged, "Expired banner cache entries removed.");
            }
        }
    })
}
