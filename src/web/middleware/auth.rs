use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{DecodingKey, Validation, decode};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::web::models::{AuthenticatedUser, Claims};
use crate::web::{AppState, error::AppError};

pub async fn auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let jwt_secret = &state.config.jwt_secret;

    // Authorization header first, then the bare `token` header, then the cookie
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .or_else(|| {
            req.headers()
                .get("token")
                .and_then(|header| header.to_str().ok())
        })
        .map(|s| s.to_string())
        .or_else(|| jar.get("token").map(|c| c.value().to_string()))
        .ok_or(AppError::InvalidCredentials)?;

    let token_data = decode::<Claims>(
        &token,
        &DecodingKey::from_secret(jwt_secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|e| {
        warn!(error = ?e, "JWT decoding error during auth middleware.");
        AppError::InvalidCredentials
    })?;

    let authenticated_user = AuthenticatedUser {
        username: token_data.claims.sub,
        is_admin: token_data.claims.is_admin,
    };
    req.extensions_mut().insert(authenticated_user);
    Ok(next.run(req).await)
}

/// Runs after `auth`; rejects callers whose token does not carry the admin claim.
pub async fn require_admin(req: Request, next: Next) -> Result<Response, AppError> {
    let user = req
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or(AppError::InvalidCredentials)?;

    if !user.is_admin {
        debug!(username = %user.username, "Non-admin caller rejected from admin route.");
        return Err(AppError::Forbidden(
            "Administrator access required".to_string(),
        ));
    }
    Ok(next.run(req).await)
}
