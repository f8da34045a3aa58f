use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::cache::BannerSource;
use crate::db::error::BannerError;
use crate::db::models::{Banner, BannerFilter, BannerPatch, NewBanner, Page};
use crate::db::services::{BannerStore, FeatureCatalog, TagCatalog};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Published after every successful administrative write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerEvent {
    Changed { feature_id: i32 },
}

/// Validation gate and orchestration in front of the banner store.
pub struct BannerService {
    store: Arc<dyn BannerStore>,
    features: Arc<dyn FeatureCatalog>,
    tags: Arc<dyn TagCatalog>,
    events: broadcast::Sender<BannerEvent>,
}

impl BannerService {
    pub fn new(
        store: Arc<dyn BannerStore>,
        features: Arc<dyn FeatureCatalog>,
        tags: Arc<dyn TagCatalog>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            features,
            tags,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BannerEvent> {
        self.events.subscribe()
    }

    fn publish(&self, feature_id: i32) {
        // Nobody listening is the default configuration.
        let _ = self.events.send(BannerEvent::Changed { feature_id });
    }

    /// Checks that the feature and every tag exist. `None` skips a check.
    async fn validate(
        &self,
        feature_id: Option<i32>,
        tag_ids: Option<&BTreeSet<i32>>,
    ) -> Result<(), BannerError> {
        if let Some(feature_id) = feature_id {
            if self.features.get_feature_by_id(feature_id).await?.is_none() {
                return Err(BannerError::NoSuchFeature(feature_id));
            }
        }

        if let Some(tag_ids) = tag_ids {
            if tag_ids.is_empty() {
                return Err(BannerError::EmptyTagSet);
            }

            let wanted: Vec<i32> = tag_ids.iter().copied().collect();
            let mut found: Vec<i32> = self
                .tags
                .get_tags_by_ids(&wanted)
                .await?
                .into_iter()
                .map(|tag| tag.id)
                .collect();
            found.sort_unstable();

            if found != wanted {
                let missing: Vec<i32> = wanted
                    .into_iter()
                    .filter(|id| found.binary_search(id).is_err())
                    .collect();
                return Err(BannerError::NoSuchTag(missing));
            }
        }

        Ok(())
    }

    pub async fn create(&self, banner: NewBanner) -> Result<Banner, BannerError> {
        self.validate(Some(banner.feature_id), Some(&banner.tag_ids))
            .await?;

        let created = self.store.create(banner).await?;
        self.publish(created.feature_id);
        Ok(created)
    }

    pub async fn get_all(&self, filter: BannerFilter, page: Page) -> Result<Vec<Banner>, BannerError> {
        self.store.get_all(filter, page).await
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Banner, BannerError> {
        self.store.get_by_id(id).await
    }

    /// Resolves the banner of `feature_id` whose tag set equals `tag_ids`,
    /// in any order and with duplicates ignored.
    pub async fn get_by_feature_and_tags(
        &self,
        feature_id: i32,
        tag_ids: &[i32],
    ) -> Result<Banner, BannerError> {
        let canonical: BTreeSet<i32> = tag_ids.iter().copied().collect();
        self.store
            .get_by_feature_and_tags(feature_id, &canonical)
            .await
    }

    /// Validates the fields the patch sets, then fills the rest from the
    /// stored banner and writes the merged record.
    pub async fn update(&self, id: i32, patch: BannerPatch) -> Result<(), BannerError> {
        // An empty tag set in a patch keeps the stored tags.
        let mut patch = patch;
        if patch.tag_ids.as_ref().is_some_and(|ids| ids.is_empty()) {
            patch.tag_ids = None;
        }
        self.validate(patch.feature_id, patch.tag_ids.as_ref())
            .await?;

        // The merge reads outside the store's write transaction: two
        // concurrent partial updates of one banner are last-writer-wins.
        let current = self.store.get_by_id(id).await?;
        let mut merged = patch.fill_from(&current);
        if merged.tag_ids.as_ref() == Some(&current.tag_ids) {
            // Unchanged tag set: leave the link rows alone.
            merged.tag_ids = None;
        }
        let new_feature_id = merged.feature_id.unwrap_or(current.feature_id);

        self.store.update(id, merged).await?;

        debug!(banner_id = id, "Banner patch applied.");
        self.publish(current.feature_id);
        if new_feature_id != current.feature_id {
            self.publish(new_feature_id);
        }
        Ok(())
    }

    pub async fn delete(&self, id: i32) -> Result<Banner, BannerError> {
        let deleted = self.store.delete(id).await?;
        self.publish(deleted.feature_id);
        Ok(deleted)
    }
}

#[async_trait]
impl BannerSource for BannerService {
    async fn resolve(&self, feature_id: i32, tag_ids: &BTreeSet<i32>) -> Result<Banner, BannerError> {
        let result = self.store.get_by_feature_and_tags(feature_id, tag_ids).await;
        if let Err(e) = &result {
            if e.is_inconsistency() {
                warn!(feature_id, tag_ids = ?tag_ids, error = %e, "User banner lookup hit inconsistent data.");
            }
        }
        result
    }
}
