//! User endpoints.
//!
//! Profiles are readable and editable only by their owner. Listing, role
//! changes and deletion are reserved for administrators.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::api::AppState;
use crate::auth::{ensure_owner, ensure_role, Identity};
use crate::error::ApiError;
use crate::models::{DeleteOutcome, ProfileUpdate, Role, User, WriteOutcome};

/// GET /users - All users (admin)
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<Json<Vec<User>>, ApiError> {
    let caller = state.caller(&identity.email).await?;
    ensure_role(&identity, caller.as_ref(), &[Role::Admin])?;

    Ok(Json(state.store.list_users().await?))
}

/// GET /users/:email - Own profile
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(email): Path<String>,
) -> Result<Json<Option<User>>, ApiError> {
    ensure_owner(&identity, &email)?;
    Ok(Json(state.store.find_user(&email).await?))
}

#[derive(Debug, Deserialize)]
pub struct UpsertUserRequest {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum UpsertUserResponse {
    Found { status: &'static str },
    Inserted(WriteOutcome),
}

/// PUT /users - Create the user on first login; existing users are left untouched
pub async fn upsert_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpsertUserRequest>,
) -> Result<Json<UpsertUserResponse>, ApiError> {
    if req.email.trim().is_empty() {
        return Err(ApiError::BadRequest("email is required".to_string()));
    }

    let user = User::new(req.email, req.name, req.image);
    if !state.store.insert_user_if_absent(&user).await? {
        return Ok(Json(UpsertUserResponse::Found {
            status: "User Found",
        }));
    }

    info!("New user {}", user.email);
    Ok(Json(UpsertUserResponse::Inserted(WriteOutcome::upserted(
        user.id,
    ))))
}

/// PATCH /users/:email - Edit own name/image
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(email): Path<String>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<WriteOutcome>, ApiError> {
    ensure_owner(&identity, &email)?;
    if update.is_empty() {
        return Ok(Json(WriteOutcome::default()));
    }

    let modified = state.store.update_profile(&email, &update).await?;
    Ok(Json(WriteOutcome::modified(modified)))
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: Role,
}

/// PATCH /change-role/:id - Set a user's role (admin)
pub async fn change_role(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<String>,
    Json(req): Json<RoleRequest>,
) -> Result<Json<WriteOutcome>, ApiError> {
    let caller = state.caller(&identity.email).await?;
    ensure_role(&identity, caller.as_ref(), &[Role::Admin])?;

    let modified = state.store.set_role(&id, req.role).await?;
    info!("User {} role -> {:?} by {}", id, req.role, identity.email);
    Ok(Json(WriteOutcome::modified(modified)))
}

/// DELETE /users/:id - Remove a user (admin)
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<Json<DeleteOutcome>, ApiError> {
    let caller = state.caller(&identity.email).await?;
    ensure_role(&identity, caller.as_ref(), &[Role::Admin])?;

    let deleted_count = state.store.delete_user(&id).await?;
    info!("User {} deleted by {}", id, identity.email);
    Ok(Json(DeleteOutcome { deleted_count }))
}
