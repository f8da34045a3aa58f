use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use std::sync::Arc;
use tracing::info;

use crate::db::models::{Banner, BannerPatch, NewBanner};
use crate::web::models::banner_models::{CreateBannerResponse, ListBannersQuery};
use crate::web::{AppError, AppState};

// --- Route Handlers ---

async fn list_banners_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<ListBannersQuery>,
) -> Result<Json<Vec<Banner>>, AppError> {
    let (filter, page) = query.split()?;
    let banners = app_state.banner_service.get_all(filter, page).await?;
    Ok(Json(banners))
}

async fn get_banner_handler(
    State(app_state): State<Arc<AppState>>,
    Path(banner_id): Path<i32>,
) -> Result<Json<Banner>, AppError> {
    let banner = app_state.banner_service.get_by_id(banner_id).await?;
    Ok(Json(banner))
}

async fn create_banner_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<NewBanner>,
) -> Result<(StatusCode, Json<CreateBannerResponse>), AppError> {
    let created = app_state.banner_service.create(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateBannerResponse {
            banner_id: created.id,
        }),
    ))
}

async fn update_banner_handler(
    State(app_state): State<Arc<AppState>>,
    Path(banner_id): Path<i32>,
    Json(payload): Json<BannerPatch>,
) -> Result<StatusCode, AppError> {
    app_state.banner_service.update(banner_id, payload).await?;
    Ok(StatusCode::OK)
}

async fn delete_banner_handler(
    State(app_state): State<Arc<AppState>>,
    Path(banner_id): Path<i32>,
) -> Result<Json<Banner>, AppError> {
    let deleted = app_state.banner_service.delete(banner_id).await?;
    info!(banner_id, "Banner removed through the admin API.");
    Ok(Json(deleted))
}

// --- Router ---

pub fn create_banner_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/banner",
            get(list_banners_handler).post(create_banner_handler),
        )
        .route(
            "/banner/{id}",
            get(get_banner_handler)
                .patch(update_banner_handler)
                .delete(delete_banner_handler),
        )
}
