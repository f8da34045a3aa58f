use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder};

use crate::db::entities::{feature, tag};

/// Existence lookups against the feature catalog.
#[async_trait]
pub trait FeatureCatalog: Send + Sync {
    async fn get_feature_by_id(&self, id: i32) -> Result<Option<feature::Model>, DbErr>;
}

/// Existence lookups against the tag catalog.
#[async_trait]
pub trait TagCatalog: Send + Sync {
    /// Returns the subset of `ids` that exist, ordered by id.
    async fn get_tags_by_ids(&self, ids: &[i32]) -> Result<Vec<tag::Model>, DbErr>;
}

#[derive(Clone)]
pub struct SqlCatalog {
    db: DatabaseConnection,
}

impl SqlCatalog {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl FeatureCatalog for SqlCatalog {
    async fn get_feature_by_id(&self, id: i32) -> Result<Option<feature::Model>, DbErr> {
        feature::Entity::find_by_id(id).one(&self.db).await
    }
}

#[async_trait]
impl TagCatalog for SqlCatalog {
    async fn get_tags_by_ids(&self, ids: &[i32]) -> Result<Vec<tag::Model>, DbErr> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        tag::Entity::find()
            .filter(tag::Column::Id.is_in(ids.iter().copied()))
            .order_by_asc(tag::Column::Id)
            .all(&self.db)
            .await
    }
}
