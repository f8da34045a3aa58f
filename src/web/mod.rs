use axum::{
    Router,
    http::{Method, StatusCode},
    middleware as axum_middleware,
    routing::get,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::cache::UserBannerCache;
use crate::server::config::AppConfig;
use crate::services::BannerService;
use crate::web::{middleware::auth, routes::*};

pub use error::AppError;

pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;

pub struct AppState {
    pub banner_service: Arc<BannerService>,
    pub user_banners: Arc<UserBannerCache>,
    pub config: Arc<AppConfig>,
}

async fn health_check_handler() -> &'static str {
    "OK"
}

pub fn create_axum_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    // Layers added last run first: auth, then the admin gate.
    let admin_routes = banner_routes::create_banner_router()
        .route_layer(axum_middleware::from_fn(auth::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth::auth,
        ));

    let user_routes = user_banner_routes::create_user_banner_router().route_layer(
        axum_middleware::from_fn_with_state(app_state.clone(), auth::auth),
    );

    Router::new()
        .route("/health", get(health_check_handler))
        .merge(user_routes)
        .merge(admin_routes)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            app_state.config.request_timeout(),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}
