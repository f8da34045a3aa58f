use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use std::sync::Arc;
use tracing::debug;

use crate::cache::UserBanner;
use crate::web::models::AuthenticatedUser;
use crate::web::models::banner_models::{UserBannerQuery, UserBannerResponse};
use crate::web::{AppError, AppState};

async fn get_user_banner_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<UserBannerQuery>,
) -> Result<Response, AppError> {
    let lookup = query.into_lookup()?;
    let banner = app_state
        .user_banners
        .get(&lookup, authenticated_user.is_admin)
        .await?;

    match banner {
        UserBanner::Visible(content) => {
            Ok(Json(UserBannerResponse::from(content)).into_response())
        }
        UserBanner::Hidden => {
            debug!(
                feature_id = lookup.feature_id,
                username = %authenticated_user.username,
                "Inactive banner hidden from user."
            );
            Ok(StatusCode::NO_CONTENT.into_response())
        }
    }
}

pub fn create_user_banner_router() -> Router<Arc<AppState>> {
    Router::new().route("/user_banner", get(get_user_banner_handler))
}
