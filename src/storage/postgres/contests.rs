use tokio_postgres::types::Json;

use super::{decode, like_escape, param_refs, SqlParam};
use crate::models::{Contest, ContestStatus, Person};
use crate::storage::pg::PgPool;
use crate::storage::{ContestFilter, ContestSort, Result, EDITABLE_CONTEST_FIELDS};

/// Build the WHERE/ORDER/LIMIT tail for a contest listing
fn filter_sql(filter: &ContestFilter) -> (String, Vec<SqlParam>) {
    let mut clauses: Vec<String> = Vec::new();
    let mut params: Vec<SqlParam> = Vec::new();

    if let Some(status) = filter.status {
        params.push(Box::new(status.as_str().to_string()));
        clauses.push(format!("doc->>'status' = ${}", params.len()));
    }
    if let Some(needle) = &filter.contest_type_contains {
        params.push(Box::new(format!("%{}%", like_escape(needle))));
        clauses.push(format!("doc->>'contest_type' ILIKE ${}", params.len()));
    }
    if let Some(email) = &filter.creator_email {
        params.push(Box::new(email.clone()));
        clauses.push(format!(
            "doc->'contest_creator'->>'email' = ${}",
            params.len()
        ));
    }
    if filter.has_winner {
        clauses.push("doc->'winner'->>'email' IS NOT NULL".to_string());
    }
    if let Some(email) = &filter.winner_email {
        params.push(Box::new(email.clone()));
        clauses.push(format!("doc->'winner'->>'email' = ${}", params.len()));
    }

    let mut sql = String::new();
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }

    match filter.sort {
        Some(ContestSort::ParticipateCountDesc) => sql.push_str(
            " ORDER BY COALESCE((doc->>'participate_count')::BIGINT, 0) DESC, seq",
        ),
        None => sql.push_str(" ORDER BY seq"),
    }

    if let Some(limit) = filter.limit {
        params.push(Box::new(limit as i64));
        sql.push_str(&format!(" LIMIT ${}", params.len()));
    }

    (sql, params)
}

pub async fn list_contests(pool: &PgPool, filter: &ContestFilter) -> Result<Vec<Contest>> {
    let client = pool.get().await?;
    let (tail, params) = filter_sql(filter);
    let sql = format!("SELECT doc FROM contests{}", tail);

    let rows = client.query(&sql, &param_refs(&params)).await?;
    rows.iter().map(decode).collect()
}

pub async fn find_contest(pool: &PgPool, id: &str) -> Result<Option<Contest>> {
    let client = pool.get().await?;
    let row = client
        .query_opt("SELECT doc FROM contests WHERE id = $1", &[&id])
        .await?;

    row.as_ref().map(decode).transpose()
}

pub async fn save_contest(pool: &PgPool, contest: &Contest) -> Result<bool> {
    let client = pool.get().await?;
    let row = client
        .query_one(
            "INSERT INTO contests (id, doc) VALUES ($1, $2)
             ON CONFLICT (id) DO UPDATE SET doc = EXCLUDED.doc
             RETURNING (xmax = 0) AS inserted",
            &[&contest.id, &Json(contest)],
        )
        .await?;

    Ok(row.try_get("inserted")?)
}

pub async fn upsert_contest_details(pool: &PgPool, contest: &Contest) -> Result<bool> {
    let full = serde_json::to_value(contest)?;
    let details: serde_json::Map<String, serde_json::Value> = EDITABLE_CONTEST_FIELDS
        .iter()
        .map(|field| {
            let value = full.get(*field).cloned().unwrap_or(serde_json::Value::Null);
            (field.to_string(), value)
        })
        .collect();

    let client = pool.get().await?;
    let row = client
        .query_one(
            "INSERT INTO contests (id, doc) VALUES ($1, $2)
             ON CONFLICT (id) DO UPDATE SET doc = contests.doc || $3
             RETURNING (xmax = 0) AS inserted",
            &[&contest.id, &Json(contest), &Json(&details)],
        )
        .await?;

    Ok(row.try_get("inserted")?)
}

pub async fn transition_status(
    pool: &PgPool,
    id: &str,
    from: ContestStatus,
    to: ContestStatus,
) -> Result<u64> {
    let client = pool.get().await?;
    let modified = client
        .execute(
            "UPDATE contests SET doc = jsonb_set(doc, '{status}', $3)
             WHERE id = $1 AND doc->>'status' = $2",
            &[&id, &from.as_str(), &Json(to)],
        )
        .await?;

    Ok(modified)
}

pub async fn set_winner(pool: &PgPool, id: &str, winner: &Person) -> Result<u64> {
    let client = pool.get().await?;
    let modified = client
        .execute(
            "UPDATE contests SET doc = jsonb_set(doc, '{winner}', $2)
             WHERE id = $1
               AND doc->>'status' = 'accepted'
               AND doc->'winner'->>'email' IS NULL",
            &[&id, &Json(winner)],
        )
        .await?;

    Ok(modified)
}

pub async fn delete_contest(pool: &PgPool, id: &str) -> Result<u64> {
    let client = pool.get().await?;
    let deleted = client
        .execute("DELETE FROM contests WHERE id = $1", &[&id])
        .await?;

    Ok(deleted)
}

pub async fn count_wins(pool: &PgPool, email: &str) -> Result<u64> {
    let client = pool.get().await?;
    let row = client
        .query_one(
            "SELECT COUNT(*) AS wins FROM contests WHERE doc->'winner'->>'email' = $1",
            &[&email],
        )
        .await?;

    let wins: i64 = row.try_get("wins")?;
    Ok(wins as u64)
}
