use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::db::entities::{banner, content};

/// Payload shown to the user.
/// Corresponds to the `content` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<i32>,
    pub title: String,
    pub text: String,
    pub url: String,
}

impl From<content::Model> for Content {
    fn from(model: content::Model) -> Self {
        Content {
            id: Some(model.content_id),
            title: model.title,
            text: model.text,
            url: model.url,
        }
    }
}

/// A banner with its content and tag set attached.
/// Assembled from the `banner`, `content` and `banner_tag` tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Banner {
    pub id: i32,
    pub feature_id: i32,
    pub tag_ids: BTreeSet<i32>,
    pub content: Content,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Banner {
    pub(crate) fn assemble(row: banner::Model, content: content::Model, tag_ids: BTreeSet<i32>) -> Self {
        Banner {
            id: row.id,
            feature_id: row.feature_id,
            tag_ids,
            content: content.into(),
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewContent {
    pub title: String,
    pub text: String,
    pub url: String,
}

/// Input of an administrative create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBanner {
    pub feature_id: i32,
    pub tag_ids: BTreeSet<i32>,
    pub content: NewContent,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl ContentPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.text.is_none() && self.url.is_none()
    }
}

/// Input of an administrative update.
///
/// `None` means "keep the stored value". `is_active` has no absent form and
/// is always written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BannerPatch {
    #[serde(default)]
    pub feature_id: Option<i32>,
    #[serde(default)]
    pub tag_ids: Option<BTreeSet<i32>>,
    #[serde(default)]
    pub content: ContentPatch,
    pub is_active: bool,
}

impl BannerPatch {
    /// Fills every absent field from `current`. The result has every field present.
    pub fn fill_from(mut self, current: &Banner) -> Self {
        self.feature_id.get_or_insert(current.feature_id);
        self.tag_ids.get_or_insert_with(|| current.tag_ids.clone());
        self.content
            .title
            .get_or_insert_with(|| current.content.title.clone());
        self.content
            .text
            .get_or_insert_with(|| current.content.text.clone());
        self.content
            .url
            .get_or_insert_with(|| current.content.url.clone());
        self
    }
}

/// Pagination bounds. `limit: None` is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub limit: Option<u64>,
}

/// Largest value the database drivers bind for OFFSET and LIMIT (signed 64-bit).
const MAX_SQL_BOUND: u64 = i64::MAX as u64;

impl Page {
    pub fn unbounded() -> Self {
        Page::default()
    }

    /// Offset and limit as they can be bound in SQL, or `None` when the
    /// offset lies past any row a database can hold.
    ///
    /// An offset without a limit gets the largest limit, since SQLite does
    /// not accept OFFSET on its own.
    pub(crate) fn sql_bounds(&self) -> Option<(Option<u64>, Option<u64>)> {
        if self.offset > MAX_SQL_BOUND {
            return None;
        }
        let limit = match self.limit {
            Some(limit) => Some(limit.min(MAX_SQL_BOUND)),
            None if self.offset > 0 => Some(MAX_SQL_BOUND),
            None => None,
        };
        Some(((self.offset > 0).then_some(self.offset), limit))
    }
}

/// Administrative listing filter; both bounds are optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BannerFilter {
    #[serde(default)]
    pub feature_id: Option<i32>,
    #[serde(default)]
    pub tag_id: Option<i32>,
}
