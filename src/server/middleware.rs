use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use std::sync::Arc;

use super::AppState;
use crate::crypto::verify_admin_key;

/// Admin API key authentication middleware
pub async fn admin_auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    // Admin API is off until a key hash is configured
    let Some(hash) = state.admin_key_hash.as_deref() else {
        return Err(StatusCode::FORBIDDEN);
    };

    let api_key = request
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if !verify_admin_key(api_key.token(), hash) {
        tracing::debug!("Rejected admin request with invalid key");
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(request).await)
}
