use sea_orm::{DbErr, TransactionError};
use std::collections::BTreeSet;
use thiserror::Error;

/// Errors raised by the banner store and the resolution service.
#[derive(Error, Debug)]
pub enum BannerError {
    #[error("Feature {0} does not exist")]
    NoSuchFeature(i32),
    #[error("Tags do not exist: {0:?}")]
    NoSuchTag(Vec<i32>),
    #[error("A banner must have at least one tag")]
    EmptyTagSet,
    #[error("Banner {0} not found")]
    NoSuchBanner(i32),
    #[error("No banner for feature {feature_id} and tags {tag_ids:?}")]
    BannerNotFound {
        feature_id: i32,
        tag_ids: BTreeSet<i32>,
    },
    #[error("{matches} banners share feature {feature_id} and tags {tag_ids:?}")]
    AmbiguousBanner {
        feature_id: i32,
        tag_ids: BTreeSet<i32>,
        matches: usize,
    },
    #[error("Banner {0} has no content row")]
    MissingContent(i32),
    #[error("Database error: {0}")]
    Storage(#[from] DbErr),
}

impl BannerError {
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            BannerError::NoSuchFeature(_) | BannerError::NoSuchTag(_) | BannerError::EmptyTagSet
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            BannerError::NoSuchBanner(_) | BannerError::BannerNotFound { .. }
        )
    }

    /// The stored data breaks an invariant the write path is supposed to keep.
    pub fn is_inconsistency(&self) -> bool {
        matches!(
            self,
            BannerError::AmbiguousBanner { .. } | BannerError::MissingContent(_)
        )
    }
}

impl From<TransactionError<BannerError>> for BannerError {
    fn from(err: TransactionError<BannerError>) -> Self {
        match err {
            TransactionError::Connection(db_err) => BannerError::Storage(db_err),
            TransactionError::Transaction(inner) => inner,
        }
    }
}
