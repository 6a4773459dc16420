//! Contest endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::api::AppState;
use crate::auth::{ensure_creator_or_admin, ensure_owner, ensure_role, Identity};
use crate::contest;
use crate::error::ApiError;
use crate::models::{
    Contest, ContestDraft, ContestStatus, DeleteOutcome, Person, Role, User, WriteOutcome,
};
use crate::storage::ContestFilter;

// ============================================================================
// PUBLIC LISTINGS
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ContestsQuery {
    pub tags: Option<String>,
}

/// GET /contests?tags= - Accepted contests, optionally by type
pub async fn list_contests(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ContestsQuery>,
) -> Result<Json<Vec<Contest>>, ApiError> {
    let filter = contest::public_listing(query.tags.as_deref());
    Ok(Json(state.store.list_contests(&filter).await?))
}

/// GET /popular-contests - Up to six accepted contests, most participated first
pub async fn popular_contests(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Contest>>, ApiError> {
    let filter = contest::popular_listing();
    Ok(Json(state.store.list_contests(&filter).await?))
}

/// GET /contests/:id
pub async fn get_contest(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Option<Contest>>, ApiError> {
    Ok(Json(state.store.find_contest(&id).await?))
}

#[derive(Debug, Deserialize)]
pub struct WinnersQuery {
    pub email: Option<String>,
}

/// GET /get-winners?email= - Contests with a selected winner
pub async fn get_winners(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WinnersQuery>,
) -> Result<Json<Vec<Contest>>, ApiError> {
    let filter = contest::winners_listing(query.email.as_deref());
    Ok(Json(state.store.list_contests(&filter).await?))
}

// ============================================================================
// ADMIN
// ============================================================================

/// GET /all-contests - Every contest in every status (admin)
pub async fn all_contests(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<Json<Vec<Contest>>, ApiError> {
    let caller = state.caller(&identity.email).await?;
    ensure_role(&identity, caller.as_ref(), &[Role::Admin])?;

    Ok(Json(
        state.store.list_contests(&ContestFilter::default()).await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: ContestStatus,
}

/// PATCH /contests/:id - Accept or reject a pending contest (admin)
pub async fn change_status(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<String>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<WriteOutcome>, ApiError> {
    let caller = state.caller(&identity.email).await?;
    ensure_role(&identity, caller.as_ref(), &[Role::Admin])?;

    let outcome = contest::change_status(state.store.as_ref(), &id, req.status).await?;
    Ok(Json(outcome))
}

// ============================================================================
// CREATORS
// ============================================================================

/// GET /my-contests/:email - Contests created by the caller
pub async fn my_contests(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(email): Path<String>,
) -> Result<Json<Vec<Contest>>, ApiError> {
    ensure_owner(&identity, &email)?;

    let filter = ContestFilter {
        creator_email: Some(email),
        ..Default::default()
    };
    Ok(Json(state.store.list_contests(&filter).await?))
}

fn caller_person(identity: &Identity, caller: Option<&User>) -> Person {
    Person {
        email: identity.email.clone(),
        name: caller.and_then(|u| u.name.clone()),
        image: caller.and_then(|u| u.image.clone()),
    }
}

/// POST /contests - Submit a new contest for review (creator/admin)
pub async fn create_contest(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(mut draft): Json<ContestDraft>,
) -> Result<Json<WriteOutcome>, ApiError> {
    let caller = state.caller(&identity.email).await?;
    ensure_role(&identity, caller.as_ref(), &[Role::Creator, Role::Admin])?;

    let creator = match draft.contest_creator.take() {
        Some(person) => {
            ensure_owner(&identity, &person.email)?;
            person
        }
        None => caller_person(&identity, caller.as_ref()),
    };

    let outcome = contest::create_contest(state.store.as_ref(), creator, draft).await?;
    Ok(Json(outcome))
}

/// PUT /contests/:id - Replace the editable fields (creator/admin)
pub async fn update_contest(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<String>,
    Json(draft): Json<ContestDraft>,
) -> Result<Json<WriteOutcome>, ApiError> {
    let caller = state.caller(&identity.email).await?;
    let existing = state.store.find_contest(&id).await?;
    match &existing {
        Some(current) => ensure_creator_or_admin(&identity, caller.as_ref(), current)?,
        None => ensure_role(&identity, caller.as_ref(), &[Role::Creator, Role::Admin])?,
    }

    let outcome = contest::update_contest(
        state.store.as_ref(),
        &id,
        existing.as_ref(),
        caller_person(&identity, caller.as_ref()),
        draft,
    )
    .await?;
    Ok(Json(outcome))
}

/// PATCH /select-winner/:id - Choose the winning participant (creator/admin)
pub async fn select_winner(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<String>,
    Json(winner): Json<Person>,
) -> Result<Json<WriteOutcome>, ApiError> {
    let Some(current) = state.store.find_contest(&id).await? else {
        return Ok(Json(WriteOutcome::default()));
    };
    let caller = state.caller(&identity.email).await?;
    ensure_creator_or_admin(&identity, caller.as_ref(), &current)?;

    let outcome = contest::select_winner(state.store.as_ref(), &current, winner).await?;
    Ok(Json(outcome))
}

/// DELETE /contests/:id (creator/admin)
///
/// Participations on the contest are kept.
pub async fn delete_contest(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<Json<DeleteOutcome>, ApiError> {
    let Some(current) = state.store.find_contest(&id).await? else {
        return Ok(Json(DeleteOutcome::default()));
    };
    let caller = state.caller(&identity.email).await?;
    ensure_creator_or_admin(&identity, caller.as_ref(), &current)?;

    let deleted_count = state.store.delete_contest(&id).await?;
    info!("Contest {} deleted by {}", id, identity.email);
    Ok(Json(DeleteOutcome { deleted_count }))
}
