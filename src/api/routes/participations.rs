//! Participation endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::AppState;
use crate::auth::{ensure_creator_or_admin, ensure_owner, Identity};
use crate::error::ApiError;
use crate::ledger::{self, EntryRequest, WinStats};
use crate::models::{InsertOutcome, Participation, WriteOutcome};

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(rename = "contestID")]
    pub contest_id: Option<String>,
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
}

/// GET /is-participated/:email?contestID=&sortBy= - Own entries
pub async fn is_participated(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(email): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<Participation>>, ApiError> {
    ensure_owner(&identity, &email)?;

    let filter = ledger::history_filter(
        &email,
        query.contest_id.as_deref(),
        query.sort_by.as_deref(),
    );
    Ok(Json(state.store.list_participations(&filter).await?))
}

/// GET /total-submitted/:id - Submitted tasks of a contest (creator/admin)
pub async fn total_submitted(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<Json<Vec<Participation>>, ApiError> {
    let Some(contest) = state.store.find_contest(&id).await? else {
        return Ok(Json(Vec::new()));
    };
    let caller = state.caller(&identity.email).await?;
    ensure_creator_or_admin(&identity, caller.as_ref(), &contest)?;

    let filter = ledger::submissions_filter(&id);
    Ok(Json(state.store.list_participations(&filter).await?))
}

/// POST /participate-contest - Enter a contest
pub async fn participate(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(req): Json<EntryRequest>,
) -> Result<Json<InsertOutcome>, ApiError> {
    let outcome = ledger::enter_contest(state.store.as_ref(), &identity, req).await?;
    Ok(Json(outcome))
}

/// POST /participate-contest/:id - Attach a task to own entry
pub async fn submit_task(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<String>,
    Json(task): Json<serde_json::Value>,
) -> Result<Json<WriteOutcome>, ApiError> {
    let outcome = ledger::submit_task(state.store.as_ref(), &identity, &id, task).await?;
    Ok(Json(outcome))
}

/// GET /user-stats/:email - Own win rate
pub async fn user_stats(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(email): Path<String>,
) -> Result<Json<WinStats>, ApiError> {
    ensure_owner(&identity, &email)?;
    Ok(Json(ledger::user_stats(state.store.as_ref(), &email).await?))
}
