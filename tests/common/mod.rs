#![allow(dead_code)]

use banner_service::cache::{BannerCache, UserBannerCache};
use banner_service::db::entities::{feature, tag};
use banner_service::db::models::{NewBanner, NewContent};
use banner_service::db::schema;
use banner_service::db::services::{SqlBannerStore, SqlCatalog};
use banner_service::server::config::AppConfig;
use banner_service::services::BannerService;
use banner_service::web::{AppState, create_axum_router};
use axum::Router;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

pub const JWT_SECRET: &str = "test-secret";

/// Fresh in-memory database with the schema, features 1..=3 and tags 1..=5.
pub async fn setup_db() -> DatabaseConnection {
    // One connection: every sqlite in-memory connection is its own database.
    let mut opt = ConnectOptions::new("sqlite::memory:".to_owned());
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await.expect("connect sqlite");

    schema::ensure_schema(&db).await.expect("create schema");

    for id in 1..=3 {
        feature::ActiveModel { id: Set(id) }
            .insert(&db)
            .await
            .expect("insert feature");
    }
    for id in 1..=5 {
        tag::ActiveModel { id: Set(id) }
            .insert(&db)
            .await
            .expect("insert tag");
    }
    db
}

pub fn new_banner(feature_id: i32, tag_ids: &[i32], title: &str, is_active: bool) -> NewBanner {
    NewBanner {
        feature_id,
        tag_ids: tag_ids.iter().copied().collect::<BTreeSet<i32>>(),
        content: NewContent {
            title: title.to_string(),
            text: "text".to_string(),
            url: "http://url.com".to_string(),
        },
        is_active,
    }
}

pub fn test_config(cache_invalidate_on_write: bool) -> AppConfig {
    AppConfig {
        listen_addr: "127.0.0.1:0".to_string(),
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        db_max_connections: 1,
        db_connect_retries: 1,
        db_retry_interval_secs: 0,
        auto_migrate: true,
        cache_ttl_secs: 300,
        cache_cleanup_interval_secs: 600,
        cache_invalidate_on_write,
        request_timeout_secs: 30,
        log_dir: "logs".to_string(),
    }
}

pub struct TestHarness {
    pub db: DatabaseConnection,
    pub service: Arc<BannerService>,
    pub cache: Arc<BannerCache>,
    pub router: Router,
}

impl TestHarness {
    pub async fn new() -> Self {
        Self::with_config(test_config(false)).await
    }

    pub async fn with_config(config: AppConfig) -> Self {
        let db = setup_db().await;
        let store = Arc::new(SqlBannerStore::new(db.clone()));
        let catalog = Arc::new(SqlCatalog::new(db.clone()));
        let service = Arc::new(BannerService::new(store, catalog.clone(), catalog));

        let cache = Arc::new(BannerCache::new(config.cache_ttl()));
        if config.cache_invalidate_on_write {
            banner_service::cache::user_banner::spawn_invalidation_listener(
                cache.clone(),
                service.subscribe(),
            );
        }
        let user_banners = Arc::new(UserBannerCache::new(cache.clone(), service.clone()));

        let router = create_axum_router(Arc::new(AppState {
            banner_service: service.clone(),
            user_banners,
            config: Arc::new(config),
        }));

        Self {
            db,
            service,
            cache,
            router,
        }
    }

    pub async fn wait_for_invalidation(&self) {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
