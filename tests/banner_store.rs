mod common;

use banner_service::db::entities::prelude::*;
use banner_service::db::error::BannerError;
use banner_service::db::models::{BannerFilter, BannerPatch, ContentPatch, Page};
use banner_service::db::services::{BannerStore, SqlBannerStore};
use sea_orm::{EntityTrait, PaginatorTrait};
use std::collections::BTreeSet;

use common::{new_banner, setup_db};

#[tokio::test]
async fn test_create_then_resolve_by_tag_set() {
    let db = setup_db().await;
    let store = SqlBannerStore::new(db);

    let created = store
        .create(new_banner(1, &[2, 1], "title", true))
        .await
        .unwrap();
    assert_eq!(created.tag_ids, BTreeSet::from([1, 2]));

    let resolved = store
        .get_by_feature_and_tags(1, &BTreeSet::from([1, 2]))
        .await
        .unwrap();

    assert_eq!(resolved.id, created.id);
    assert_eq!(resolved.content.title, "title");
    assert_eq!(resolved.content.text, "text");
    assert_eq!(resolved.content.url, "http://url.com");
    assert!(resolved.is_active);
}

#[tokio::test]
async fn test_resolution_needs_exact_tag_set() {
    let db = setup_db().await;
    let store = SqlBannerStore::new(db);
    store
        .create(new_banner(1, &[1, 2], "title", true))
        .await
        .unwrap();

    // Subset, superset and other feature all miss.
    for (feature_id, tags) in [(1, vec![1]), (1, vec![1, 2, 3]), (2, vec![1, 2])] {
        let tags: BTreeSet<i32> = tags.into_iter().collect();
        let err = store
            .get_by_feature_and_tags(feature_id, &tags)
            .await
            .unwrap_err();
        assert!(
            matches!(err, BannerError::BannerNotFound { .. }),
            "unexpected error for {feature_id} {tags:?}: {err}"
        );
    }
}

#[tokio::test]
async fn test_duplicate_tag_sets_are_ambiguous() {
    let db = setup_db().await;
    let store = SqlBannerStore::new(db);
    store.create(new_banner(1, &[3, 4], "a", true)).await.unwrap();
    store.create(new_banner(1, &[4, 3], "b", true)).await.unwrap();

    let err = store
        .get_by_feature_and_tags(1, &BTreeSet::from([3, 4]))
        .await
        .unwrap_err();

    assert!(matches!(err, BannerError::AmbiguousBanner { matches: 2, .. }));
    assert!(err.is_inconsistency());
}

#[tokio::test]
async fn test_failed_tag_insert_rolls_back_create() {
    let db = setup_db().await;
    let store = SqlBannerStore::new(db.clone());

    // Tag 99 is not in the catalog; the link insert violates its foreign key.
    let err = store
        .create(new_banner(1, &[1, 99], "title", true))
        .await
        .unwrap_err();
    assert!(matches!(err, BannerError::Storage(_)));

    assert_eq!(Banner::find().count(&db).await.unwrap(), 0);
    assert_eq!(Content::find().count(&db).await.unwrap(), 0);
    assert_eq!(BannerTag::find().count(&db).await.unwrap(), 0);
}

#[tokio::test]
async fn test_update_active_flag_keeps_content() {
    let db = setup_db().await;
    let store = SqlBannerStore::new(db);
    let created = store
        .create(new_banner(1, &[1], "keep me", true))
        .await
        .unwrap();

    store
        .update(
            created.id,
            BannerPatch {
                is_active: false,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let updated = store.get_by_id(created.id).await.unwrap();
    assert!(!updated.is_active);
    assert_eq!(updated.content.title, "keep me");
    assert_eq!(updated.tag_ids, BTreeSet::from([1]));
    assert_eq!(updated.feature_id, 1);
}

#[tokio::test]
async fn test_update_replaces_tags_and_content_fields() {
    let db = setup_db().await;
    let store = SqlBannerStore::new(db.clone());
    let created = store
        .create(new_banner(1, &[1, 2], "old", true))
        .await
        .unwrap();

    store
        .update(
            created.id,
            BannerPatch {
                feature_id: Some(2),
                tag_ids: Some(BTreeSet::from([3])),
                content: ContentPatch {
                    url: Some("http://new.example".to_string()),
                    ..Default::default()
                },
                is_active: true,
            },
        )
        .await
        .unwrap();

    let updated = store.get_by_id(created.id).await.unwrap();
    assert_eq!(updated.feature_id, 2);
    assert_eq!(updated.tag_ids, BTreeSet::from([3]));
    assert_eq!(updated.content.url, "http://new.example");
    assert_eq!(updated.content.title, "old");
    assert_eq!(BannerTag::find().count(&db).await.unwrap(), 1);

    let moved = store
        .get_by_feature_and_tags(2, &BTreeSet::from([3]))
        .await
        .unwrap();
    assert_eq!(moved.id, created.id);
}

#[tokio::test]
async fn test_update_with_empty_tag_set_keeps_tags() {
    let db = setup_db().await;
    let store = SqlBannerStore::new(db);
    let created = store
        .create(new_banner(1, &[1, 2], "title", true))
        .await
        .unwrap();

    store
        .update(
            created.id,
            BannerPatch {
                tag_ids: Some(BTreeSet::new()),
                is_active: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let updated = store.get_by_id(created.id).await.unwrap();
    assert_eq!(updated.tag_ids, BTreeSet::from([1, 2]));
}

#[tokio::test]
async fn test_update_unknown_banner() {
    let db = setup_db().await;
    let store = SqlBannerStore::new(db);

    let err = store
        .update(
            42,
            BannerPatch {
                is_active: true,
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, BannerError::NoSuchBanner(42)));
}

#[tokio::test]
async fn test_delete_removes_content_and_links() {
    let db = setup_db().await;
    let store = SqlBannerStore::new(db.clone());
    let kept = store.create(new_banner(2, &[5], "kept", true)).await.unwrap();
    let created = store
        .create(new_banner(1, &[1, 2], "gone", true))
        .await
        .unwrap();

    let snapshot = store.delete(created.id).await.unwrap();

    assert_eq!(snapshot.id, created.id);
    assert_eq!(snapshot.content.title, "gone");
    assert_eq!(snapshot.tag_ids, BTreeSet::from([1, 2]));
    assert!(matches!(
        store.get_by_id(created.id).await.unwrap_err(),
        BannerError::NoSuchBanner(_)
    ));
    assert_eq!(Content::find().count(&db).await.unwrap(), 1);
    assert_eq!(BannerTag::find().count(&db).await.unwrap(), 1);
    assert_eq!(store.get_by_id(kept.id).await.unwrap().content.title, "kept");

    let again = store.delete(created.id).await.unwrap_err();
    assert!(again.is_not_found());
}

#[tokio::test]
async fn test_get_all_orders_filters_and_pages() {
    let db = setup_db().await;
    let store = SqlBannerStore::new(db);
    let b1 = store.create(new_banner(2, &[1], "f2-a", true)).await.unwrap();
    let b2 = store.create(new_banner(1, &[2], "f1-a", true)).await.unwrap();
    let b3 = store.create(new_banner(1, &[1, 3], "f1-b", false)).await.unwrap();

    let all = store
        .get_all(BannerFilter::default(), Page::unbounded())
        .await
        .unwrap();
    let ids: Vec<i32> = all.iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![b2.id, b3.id, b1.id]);
    assert_eq!(all[1].tag_ids, BTreeSet::from([1, 3]));

    let by_feature = store
        .get_all(
            BannerFilter {
                feature_id: Some(1),
                tag_id: None,
            },
            Page::unbounded(),
        )
        .await
        .unwrap();
    assert_eq!(by_feature.len(), 2);

    let by_tag = store
        .get_all(
            BannerFilter {
                feature_id: None,
                tag_id: Some(1),
            },
            Page::unbounded(),
        )
        .await
        .unwrap();
    let tag_ids: Vec<i32> = by_tag.iter().map(|b| b.id).collect();
    assert_eq!(tag_ids, vec![b3.id, b1.id]);

    let page = store
        .get_all(
            BannerFilter::default(),
            Page {
                offset: 1,
                limit: Some(1),
            },
        )
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id, b3.id);
}

#[tokio::test]
async fn test_get_all_offset_without_limit() {
    let db = setup_db().await;
    let store = SqlBannerStore::new(db);
    let first = store.create(new_banner(1, &[1], "a", true)).await.unwrap();
    let second = store.create(new_banner(1, &[2], "b", true)).await.unwrap();
    let third = store.create(new_banner(2, &[1], "c", true)).await.unwrap();

    let rest = store
        .get_all(
            BannerFilter::default(),
            Page {
                offset: 1,
                limit: None,
            },
        )
        .await
        .unwrap();

    let ids: Vec<i32> = rest.iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![second.id, third.id]);
    assert_ne!(ids[0], first.id);
}

#[tokio::test]
async fn test_get_all_with_oversized_bounds() {
    let db = setup_db().await;
    let store = SqlBannerStore::new(db);
    store.create(new_banner(1, &[1], "a", true)).await.unwrap();
    store.create(new_banner(2, &[1], "b", true)).await.unwrap();

    let huge_limit = store
        .get_all(
            BannerFilter::default(),
            Page {
                offset: 0,
                limit: Some(u64::MAX),
            },
        )
        .await
        .unwrap();
    assert_eq!(huge_limit.len(), 2);

    let huge_offset = store
        .get_all(
            BannerFilter::default(),
            Page {
                offset: u64::MAX,
                limit: Some(10),
            },
        )
        .await
        .unwrap();
    assert!(huge_offset.is_empty());

    let max_offset = store
        .get_all(
            BannerFilter::default(),
            Page {
                offset: i64::MAX as u64,
                limit: None,
            },
        )
        .await
        .unwrap();
    assert!(max_offset.is_empty());
}
