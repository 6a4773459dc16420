//! Credential endpoints.

use axum::{extract::State, http::header, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::api::AppState;
use crate::error::ApiError;

pub const HEALTH_MESSAGE: &str = "Contestify Server is running.....";

/// GET /
pub async fn health_check() -> &'static str {
    HEALTH_MESSAGE
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub email: String,
}

/// POST /jwt - Issue the credential cookie for `email`
pub async fn issue_token(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TokenRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.email.trim().is_empty() {
        return Err(ApiError::BadRequest("email is required".to_string()));
    }

    let token = state.tokens.issue(&req.email)?;
    let cookie = state.cookies.set_cookie(&token, state.tokens.ttl_secs())?;

    info!("Issued credential for {}", req.email);
    Ok(([(header::SET_COOKIE, cookie)], Json(json!({ "success": true }))))
}

/// DELETE /clear-cookie - Invalidate the credential cookie (logout)
pub async fn clear_cookie(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::SET_COOKIE, state.cookies.clear_cookie())],
        Json(json!({ "success": true })),
    )
}
