use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{BannerCache, CacheKey};
use crate::db::error::BannerError;
use crate::db::models::{Banner, Content};
use crate::services::banner_service::BannerEvent;

/// Where the cache reads through to on a miss or a forced refresh.
#[async_trait]
pub trait BannerSource: Send + Sync {
    async fn resolve(&self, feature_id: i32, tag_ids: &BTreeSet<i32>) -> Result<Banner, BannerError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserBannerLookup {
    pub feature_id: i32,
    pub tag_ids: BTreeSet<i32>,
    /// Skip the cached entry, read from the source and overwrite the entry.
    pub use_last_revision: bool,
}

/// Result of a user-facing lookup after the visibility check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserBanner {
    Visible(Content),
    /// The banner exists but is inactive and the caller is not an administrator.
    Hidden,
}

impl UserBanner {
    fn gate(content: Content, is_active: bool, is_admin: bool) -> Self {
        if is_active || is_admin {
            UserBanner::Visible(content)
        } else {
            UserBanner::Hidden
        }
    }
}

/// Read-through cache in front of banner resolution.
pub struct UserBannerCache {
    cache: Arc<BannerCache>,
    source: Arc<dyn BannerSource>,
}

impl UserBannerCache {
    pub fn new(cache: Arc<BannerCache>, source: Arc<dyn BannerSource>) -> Self {
        Self { cache, source }
    }

    pub fn cache(&self) -> &Arc<BannerCache> {
        &self.cache
    }

    pub async fn get(
        &self,
        lookup: &UserBannerLookup,
        is_admin: bool,
    ) -> Result<UserBanner, BannerError> {
        let key = CacheKey::new(lookup.feature_id, lookup.tag_ids.iter().copied());

        if !lookup.use_last_revision {
            if let Some(hit) = self.cache.get(&key) {
                debug!(key = %key, "User banner served from cache.");
                return Ok(UserBanner::gate(hit.content, hit.is_active, is_admin));
            }
        }

        let banner = self
            .source
            .resolve(lookup.feature_id, &lookup.tag_ids)
            .await?;
        debug!(
            key = %key,
            banner_id = banner.id,
            refreshed = lookup.use_last_revision,
            "User banner read through to storage."
        );
        self.cache
            .insert(key, banner.content.clone(), banner.is_active);

        Ok(UserBanner::gate(banner.content, banner.is_active, is_admin))
    }
}

/// Evicts the entries of every feature touched by an administrative write.
pub fn spawn_invalidation_listener(
    cache: Arc<BannerCache>,
    mut events: broadcast::Receiver<BannerEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Banner cache invalidation listener started.");
        loop {
            match events.recv().await {
                Ok(BannerEvent::Changed { feature_id }) => {
                    let evicted = cache.evict_feature(feature_id);
                    debug!(feature_id, evicted, "Banner cache entries invalidated.");
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Invalidation events were dropped; clearing the banner cache.");
                    cache.clear();
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
