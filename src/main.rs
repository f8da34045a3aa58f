use banner_service::cache::{self, BannerCache, UserBannerCache, user_banner};
use banner_service::db::{self, schema};
use banner_service::db::services::{SqlBannerStore, SqlCatalog};
use banner_service::server::config::AppConfig;
use banner_service::services::BannerService;
use banner_service::web::{AppState, create_axum_router};

use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
}

fn init_logging(log_dir: &str) {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily(log_dir, "banner-server.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    // Log to stdout: human-readable format
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    // Default to `info,sea_orm=warn` level if RUST_LOG is not set.
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sea_orm=warn,sqlx::query=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C; shutting down.");
        return;
    }
    info!("Ctrl-C received, shutting down.");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    // Logging needs the configured directory, so a bad config goes to stderr.
    let config = match AppConfig::load(args.config.as_deref()) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return Err(e.into());
        }
    };

    init_logging(&config.log_dir);
    info!(version = env!("CARGO_PKG_VERSION"), "Starting banner server.");

    // --- Database Setup ---
    let db_pool = db::connect_with_retry(
        &config.database_url,
        config.db_max_connections,
        config.db_connect_retries,
        config.db_retry_interval(),
    )
    .await?;

    if config.auto_migrate {
        schema::ensure_schema(&db_pool).await.map_err(|e| {
            error!(error = %e, "Failed to bootstrap the database schema.");
            e
        })?;
    }

    // --- Services ---
    let store = Arc::new(SqlBannerStore::new(db_pool.clone()));
    let catalog = Arc::new(SqlCatalog::new(db_pool.clone()));
    let banner_service = Arc::new(BannerService::new(store, catalog.clone(), catalog));

    // --- Banner Cache ---
    let banner_cache = Arc::new(BannerCache::new(config.cache_ttl()));
    let sweeper_handle = cache::spawn_sweeper(banner_cache.clone(), config.cache_cleanup_interval());
    info!(
        ttl_secs = config.cache_ttl_secs,
        cleanup_interval_secs = config.cache_cleanup_interval_secs,
        "Banner cache sweeper started."
    );

    let invalidation_handle = if config.cache_invalidate_on_write {
        Some(user_banner::spawn_invalidation_listener(
            banner_cache.clone(),
            banner_service.subscribe(),
        ))
    } else {
        None
    };

    let user_banners = Arc::new(UserBannerCache::new(banner_cache, banner_service.clone()));

    // --- HTTP Server ---
    let app_state = Arc::new(AppState {
        banner_service,
        user_banners,
        config: config.clone(),
    });
    let app_router = create_axum_router(app_state);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening.");

    axum::serve(listener, app_router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper_handle.abort();
    if let Some(handle) = invalidation_handle {
        handle.abort();
    }
    info!("Banner server stopped.");
    Ok(())
}
