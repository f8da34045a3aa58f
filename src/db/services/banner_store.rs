use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    prelude::Expr, sea_query::Query, ActiveModelTrait, ColumnTrait, ConnectionTrait,
    DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, error, info};

use crate::db::entities::prelude::*;
use crate::db::entities::{banner, banner_tag, content};
use crate::db::error::BannerError;
use crate::db::models::{Banner as StoredBanner, BannerFilter, BannerPatch, NewBanner, Page};

/// Durable CRUD for banners, their content and their tag sets.
///
/// Multi-statement writes run in a single transaction. Dropping a returned
/// future mid-transaction drops the transaction, which rolls it back.
#[async_trait]
pub trait BannerStore: Send + Sync {
    async fn create(&self, banner: NewBanner) -> Result<StoredBanner, BannerError>;

    async fn get_by_id(&self, id: i32) -> Result<StoredBanner, BannerError>;

    /// Banners ordered by feature id, then banner id.
    async fn get_all(&self, filter: BannerFilter, page: Page)
    -> Result<Vec<StoredBanner>, BannerError>;

    /// Compares tag sets as sets. More than one match is reported as
    /// `AmbiguousBanner`, never resolved by picking one.
    async fn get_by_feature_and_tags(
        &self,
        feature_id: i32,
        tag_ids: &BTreeSet<i32>,
    ) -> Result<StoredBanner, BannerError>;

    /// Present fields overwrite, absent fields keep their stored value.
    /// `is_active` is always written. A non-empty `tag_ids` replaces the set.
    async fn update(&self, id: i32, patch: BannerPatch) -> Result<(), BannerError>;

    /// Deletes the banner with its tag links and content, returning the
    /// snapshot taken just before deletion.
    async fn delete(&self, id: i32) -> Result<StoredBanner, BannerError>;
}

#[derive(Clone)]
pub struct SqlBannerStore {
    db: DatabaseConnection,
}

impl SqlBannerStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// Fetches the tag rows of all given banners in one query and groups them.
async fn tag_sets_for<C: ConnectionTrait>(
    conn: &C,
    banner_ids: Vec<i32>,
) -> Result<HashMap<i32, BTreeSet<i32>>, DbErr> {
    if banner_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = BannerTag::find()
        .filter(BannerTagColumn::BannerId.is_in(banner_ids))
        .all(conn)
        .await?;

    let mut sets: HashMap<i32, BTreeSet<i32>> = HashMap::new();
    for row in rows {
        sets.entry(row.banner_id).or_default().insert(row.tag_id);
    }
    Ok(sets)
}

fn attach_tags(
    rows: Vec<(banner::Model, Option<content::Model>)>,
    mut sets: HashMap<i32, BTreeSet<i32>>,
) -> Result<Vec<StoredBanner>, BannerError> {
    rows.into_iter()
        .map(|(row, content)| {
            let content = content.ok_or(BannerError::MissingContent(row.id))?;
            let tag_ids = sets.remove(&row.id).unwrap_or_default();
            Ok(StoredBanner::assemble(row, content, tag_ids))
        })
        .collect()
}

async fn load_banner<C: ConnectionTrait>(conn: &C, id: i32) -> Result<StoredBanner, BannerError> {
    let (row, content) = Banner::find_by_id(id)
        .find_also_related(Content)
        .one(conn)
        .await?
        .ok_or(BannerError::NoSuchBanner(id))?;

    let mut sets = tag_sets_for(conn, vec![id]).await?;
    let content = content.ok_or(BannerError::MissingContent(id))?;
    Ok(StoredBanner::assemble(
        row,
        content,
        sets.remove(&id).unwrap_or_default(),
    ))
}

async fn insert_tags(
    txn: &DatabaseTransaction,
    banner_id: i32,
    tag_ids: &BTreeSet<i32>,
) -> Result<(), DbErr> {
    if tag_ids.is_empty() {
        return Ok(());
    }

    let links: Vec<banner_tag::ActiveModel> = tag_ids
        .iter()
        .map(|&tag_id| banner_tag::ActiveModel {
            banner_id: Set(banner_id),
            tag_id: Set(tag_id),
        })
        .collect();
    BannerTag::insert_many(links)
        .exec_without_returning(txn)
        .await?;
    Ok(())
}

#[async_trait]
impl BannerStore for SqlBannerStore {
    async fn create(&self, banner: NewBanner) -> Result<StoredBanner, BannerError> {
        let created = self
            .db
            .transaction::<_, StoredBanner, BannerError>(|txn| {
                Box::pin(async move {
                    let now = Utc::now();

                    let content = content::ActiveModel {
                        title: Set(banner.content.title),
                        text: Set(banner.content.text),
                        url: Set(banner.content.url),
                        ..Default::default() // content_id is generated
                    }
                    .insert(txn)
                    .await?;

                    let row = banner::ActiveModel {
                        feature_id: Set(banner.feature_id),
                        content_id: Set(content.content_id),
                        is_active: Set(banner.is_active),
                        created_at: Set(now),
                        updated_at: Set(now),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await?;

                    insert_tags(txn, row.id, &banner.tag_ids).await?;

                    Ok(StoredBanner::assemble(row, content, banner.tag_ids))
                })
            })
            .await?;

        info!(
            banner_id = created.id,
            feature_id = created.feature_id,
            tag_ids = ?created.tag_ids,
            "Banner created."
        );
        Ok(created)
    }

    async fn get_by_id(&self, id: i32) -> Result<StoredBanner, BannerError> {
        load_banner(&self.db, id).await
    }

    async fn get_all(
        &self,
        filter: BannerFilter,
        page: Page,
    ) -> Result<Vec<StoredBanner>, BannerError> {
        let Some((offset, limit)) = page.sql_bounds() else {
            debug!(offset = page.offset, "Page offset is past every row.");
            return Ok(Vec::new());
        };

        let mut query = Banner::find();
        if let Some(feature_id) = filter.feature_id {
            query = query.filter(BannerColumn::FeatureId.eq(feature_id));
        }
        if let Some(tag_id) = filter.tag_id {
            query = query.filter(
                BannerColumn::Id.in_subquery(
                    Query::select()
                        .column(BannerTagColumn::BannerId)
                        .from(BannerTag)
                        .and_where(BannerTagColumn::TagId.eq(tag_id))
                        .to_owned(),
                ),
            );
        }

        let rows = query
            .order_by_asc(BannerColumn::FeatureId)
            .order_by_asc(BannerColumn::Id)
            .offset(offset)
            .limit(limit)
            .find_also_related(Content)
            .all(&self.db)
            .await?;

        let ids = rows.iter().map(|(row, _)| row.id).collect();
        let sets = tag_sets_for(&self.db, ids).await?;
        attach_tags(rows, sets)
    }

    async fn get_by_feature_and_tags(
        &self,
        feature_id: i32,
        tag_ids: &BTreeSet<i32>,
    ) -> Result<StoredBanner, BannerError> {
        let rows = Banner::find()
            .filter(BannerColumn::FeatureId.eq(feature_id))
            .order_by_asc(BannerColumn::Id)
            .find_also_related(Content)
            .all(&self.db)
            .await?;

        let ids = rows.iter().map(|(row, _)| row.id).collect();
        let mut sets = tag_sets_for(&self.db, ids).await?;

        let mut matches: Vec<(banner::Model, Option<content::Model>)> = rows
            .into_iter()
            .filter(|(row, _)| sets.get(&row.id).is_some_and(|set| set == tag_ids))
            .collect();

        match matches.len() {
            0 => Err(BannerError::BannerNotFound {
                feature_id,
                tag_ids: tag_ids.clone(),
            }),
            1 => {
                let (row, content) = matches.remove(0);
                let content = content.ok_or(BannerError::MissingContent(row.id))?;
                let tags = sets.remove(&row.id).unwrap_or_default();
                Ok(StoredBanner::assemble(row, content, tags))
            }
            count => {
                let banner_ids: Vec<i32> = matches.iter().map(|(row, _)| row.id).collect();
                error!(
                    feature_id,
                    tag_ids = ?tag_ids,
                    banner_ids = ?banner_ids,
                    "Several banners share one feature and tag set."
                );
                Err(BannerError::AmbiguousBanner {
                    feature_id,
                    tag_ids: tag_ids.clone(),
                    matches: count,
                })
            }
        }
    }

    async fn update(&self, id: i32, patch: BannerPatch) -> Result<(), BannerError> {
        self.db
            .transaction::<_, (), BannerError>(|txn| {
                Box::pin(async move {
                    let row = Banner::find_by_id(id)
                        .one(txn)
                        .await?
                        .ok_or(BannerError::NoSuchBanner(id))?;

                    // 1. Content: absent fields keep the stored value.
                    if !patch.content.is_empty() {
                        let mut content_update =
                            Content::update_many().filter(ContentColumn::ContentId.eq(row.content_id));
                        if let Some(title) = patch.content.title {
                            content_update = content_update.col_expr(ContentColumn::Title, Expr::value(title));
                        }
                        if let Some(text) = patch.content.text {
                            content_update = content_update.col_expr(ContentColumn::Text, Expr::value(text));
                        }
                        if let Some(url) = patch.content.url {
                            content_update = content_update.col_expr(ContentColumn::Url, Expr::value(url));
                        }
                        content_update.exec(txn).await?;
                    }

                    // 2. Banner row
                    let mut active_model = row.into_active_model();
                    active_model.is_active = Set(patch.is_active);
                    if let Some(feature_id) = patch.feature_id {
                        active_model.feature_id = Set(feature_id);
                    }
                    active_model.updated_at = Set(Utc::now());
                    active_model.update(txn).await?;

                    // 3. Tag set: full replace, not a diff.
                    if let Some(tag_ids) = patch.tag_ids.filter(|ids| !ids.is_empty()) {
                        BannerTag::delete_many()
                            .filter(BannerTagColumn::BannerId.eq(id))
                            .exec(txn)
                            .await?;
                        insert_tags(txn, id, &tag_ids).await?;
                    }

                    Ok(())
                })
            })
            .await?;

        debug!(banner_id = id, "Banner updated.");
        Ok(())
    }

    async fn delete(&self, id: i32) -> Result<StoredBanner, BannerError> {
        let snapshot = self
            .db
            .transaction::<_, StoredBanner, BannerError>(|txn| {
                Box::pin(async move {
                    let snapshot = load_banner(txn, id).await?;

                    BannerTag::delete_many()
                        .filter(BannerTagColumn::BannerId.eq(id))
                        .exec(txn)
                        .await?;
                    Banner::delete_by_id(id).exec(txn).await?;
                    if let Some(content_id) = snapshot.content.id {
                        Content::delete_by_id(content_id).exec(txn).await?;
                    }

                    Ok(snapshot)
                })
            })
            .await?;

        info!(
            banner_id = id,
            feature_id = snapshot.feature_id,
            "Banner deleted."
        );
        Ok(snapshot)
    }
}
