//! PostgreSQL document storage
//!
//! Each collection is a table of JSONB documents keyed by `id`. Columns
//! besides `doc` exist only where a uniqueness constraint needs them
//! (`users.email`, one entry per participator per contest). `seq` preserves
//! insertion order for unsorted listings.

pub mod contests;
pub mod participations;
pub mod users;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio_postgres::types::{Json, ToSql};
use tokio_postgres::Row;
use tracing::info;

use super::pg::{create_pool, PgConfig, PgPool};
use super::{ContestFilter, ContestStore, EntryOutcome, ParticipationFilter, Result};
use crate::models::{Contest, ContestStatus, Participation, Person, ProfileUpdate, Role, User};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    seq BIGSERIAL,
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    doc JSONB NOT NULL
);

CREATE TABLE IF NOT EXISTS contests (
    seq BIGSERIAL,
    id TEXT PRIMARY KEY,
    doc JSONB NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_contests_status ON contests((doc->>'status'));
CREATE INDEX IF NOT EXISTS idx_contests_creator ON contests((doc->'contest_creator'->>'email'));
CREATE INDEX IF NOT EXISTS idx_contests_winner ON contests((doc->'winner'->>'email'));

CREATE TABLE IF NOT EXISTS participations (
    seq BIGSERIAL,
    id TEXT PRIMARY KEY,
    contest_id TEXT NOT NULL,
    participator_email TEXT NOT NULL,
    doc JSONB NOT NULL,
    UNIQUE (contest_id, participator_email)
);

CREATE INDEX IF NOT EXISTS idx_participations_email ON participations(participator_email);
"#;

/// Boxed query parameter for filters assembled at runtime
pub(crate) type SqlParam = Box<dyn ToSql + Sync + Send>;

pub(crate) fn param_refs(params: &[SqlParam]) -> Vec<&(dyn ToSql + Sync)> {
    params
        .iter()
        .map(|p| p.as_ref() as &(dyn ToSql + Sync))
        .collect()
}

pub(crate) fn decode<T: DeserializeOwned>(row: &Row) -> Result<T> {
    let Json(doc) = row.try_get::<_, Json<T>>("doc")?;
    Ok(doc)
}

/// Escape `%`, `_` and `\` so a user string matches literally inside LIKE
pub(crate) fn like_escape(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect and apply the schema
    pub async fn connect(cfg: &PgConfig) -> Result<Self> {
        let pool = create_pool(cfg)?;

        let client = pool.get().await?;
        info!("Connected to PostgreSQL database");

        client.batch_execute(SCHEMA).await?;
        info!("Database schema initialized");

        Ok(Self { pool })
    }
}

#[async_trait]
impl ContestStore for PgStore {
    async fn list_users(&self) -> Result<Vec<User>> {
        users::list_users(&self.pool).await
    }

    async fn find_user(&self, email: &str) -> Result<Option<User>> {
        users::find_user(&self.pool, email).await
    }

    async fn insert_user_if_absent(&self, user: &User) -> Result<bool> {
        users::insert_user_if_absent(&self.pool, user).await
    }

    async fn update_profile(&self, email: &str, update: &ProfileUpdate) -> Result<u64> {
        users::update_profile(&self.pool, email, update).await
    }

    async fn set_role(&self, id: &str, role: Role) -> Result<u64> {
        users::set_role(&self.pool, id, role).await
    }

    async fn delete_user(&self, id: &str) -> Result<u64> {
        users::delete_user(&self.pool, id).await
    }

    async fn list_contests(&self, filter: &ContestFilter) -> Result<Vec<Contest>> {
        contests::list_contests(&self.pool, filter).await
    }

    async fn find_contest(&self, id: &str) -> Result<Option<Contest>> {
        contests::find_contest(&self.pool, id).await
    }

    async fn save_contest(&self, contest: &Contest) -> Result<bool> {
        contests::save_contest(&self.pool, contest).await
    }

    async fn upsert_contest_details(&self, contest: &Contest) -> Result<bool> {
        contests::upsert_contest_details(&self.pool, contest).await
    }

    async fn transition_status(
        &self,
        id: &str,
        from: ContestStatus,
        to: ContestStatus,
    ) -> Result<u64> {
        contests::transition_status(&self.pool, id, from, to).await
    }

    async fn set_winner(&self, id: &str, winner: &Person) -> Result<u64> {
        contests::set_winner(&self.pool, id, winner).await
    }

    async fn delete_contest(&self, id: &str) -> Result<u64> {
        contests::delete_contest(&self.pool, id).await
    }

    async fn enter_contest(&self, participation: &Participation) -> Result<EntryOutcome> {
        participations::enter_contest(&self.pool, participation).await
    }

    async fn list_participations(
        &self,
        filter: &ParticipationFilter,
    ) -> Result<Vec<Participation>> {
        participations::list_participations(&self.pool, filter).await
    }

    async fn find_participation(&self, id: &str) -> Result<Option<Participation>> {
        participations::find_participation(&self.pool, id).await
    }

    async fn submit_task(&self, id: &str, task: &serde_json::Value) -> Result<u64> {
        participations::submit_task(&self.pool, id, task).await
    }

    async fn count_participations(&self, email: &str) -> Result<u64> {
        participations::count_participations(&self.pool, email).await
    }

    async fn count_wins(&self, email: &str) -> Result<u64> {
        contests::count_wins(&self.pool, email).await
    }

    async fn reconcile_participate_counts(&self) -> Result<u64> {
        participations::reconcile_participate_counts(&self.pool).await
    }
}
