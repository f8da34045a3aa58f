use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::cache::UserBannerLookup;
use crate::db::models::{BannerFilter, Content, Page};
use crate::web::error::AppError;

#[derive(Debug, Deserialize)]
pub struct UserBannerQuery {
    pub feature_id: i32,
    /// Comma-separated tag ids, e.g. `1,2`.
    pub tag_ids: String,
    #[serde(default)]
    pub use_last_revision: bool,
}

impl UserBannerQuery {
    pub fn into_lookup(self) -> Result<UserBannerLookup, AppError> {
        let tag_ids = parse_tag_ids(&self.tag_ids)?;
        Ok(UserBannerLookup {
            feature_id: self.feature_id,
            tag_ids,
            use_last_revision: self.use_last_revision,
        })
    }
}

fn parse_tag_ids(raw: &str) -> Result<BTreeSet<i32>, AppError> {
    let tag_ids = raw
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i32>()
                .map_err(|_| AppError::InvalidInput(format!("Invalid tag id: '{part}'")))
        })
        .collect::<Result<BTreeSet<i32>, AppError>>()?;

    if tag_ids.is_empty() {
        return Err(AppError::InvalidInput(
            "At least one tag id is required".to_string(),
        ));
    }
    Ok(tag_ids)
}

#[derive(Debug, Default, Deserialize)]
pub struct ListBannersQuery {
    pub feature_id: Option<i32>,
    pub tag_id: Option<i32>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

/// Paging values are bound as signed 64-bit integers by the database driver.
const MAX_PAGE_VALUE: u64 = i64::MAX as u64;

fn check_page_value(name: &str, value: Option<u64>) -> Result<Option<u64>, AppError> {
    match value {
        Some(v) if v > MAX_PAGE_VALUE => Err(AppError::InvalidInput(format!(
            "{name} must not exceed {MAX_PAGE_VALUE}"
        ))),
        other => Ok(other),
    }
}

impl ListBannersQuery {
    pub fn split(self) -> Result<(BannerFilter, Page), AppError> {
        let offset = check_page_value("offset", self.offset)?;
        let limit = check_page_value("limit", self.limit)?;
        Ok((
            BannerFilter {
                feature_id: self.feature_id,
                tag_id: self.tag_id,
            },
            Page {
                offset: offset.unwrap_or(0),
                limit,
            },
        ))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateBannerResponse {
    pub banner_id: i32,
}

/// What a user sees of a banner: the content without its storage id.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserBannerResponse {
    pub title: String,
    pub text: String,
    pub url: String,
}

impl From<Content> for UserBannerResponse {
    fn from(content: Content) -> Self {
        Self {
            title: content.title,
            text: content.text,
            url: content.url,
        }
    }
}
