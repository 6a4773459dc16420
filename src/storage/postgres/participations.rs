use tokio_postgres::types::Json;
use tracing::debug;

use super::{decode, param_refs, SqlParam};
use crate::models::Participation;
use crate::storage::pg::PgPool;
use crate::storage::{EntryOutcome, ParticipationFilter, ParticipationSort, Result};

/// Insert the entry and bump the contest counter in one transaction.
///
/// The contest row is locked first so concurrent entries serialize on it and
/// the increment happens in SQL rather than read-modify-write in the service.
pub async fn enter_contest(pool: &PgPool, participation: &Participation) -> Result<EntryOutcome> {
    let mut client = pool.get().await?;
    let tx = client.transaction().await?;

    let open = tx
        .query_opt(
            "SELECT 1 FROM contests
             WHERE id = $1 AND doc->>'status' = 'accepted'
             FOR UPDATE",
            &[&participation.contest_id],
        )
        .await?;
    if open.is_none() {
        tx.rollback().await?;
        return Ok(EntryOutcome::ContestUnavailable);
    }

    let inserted = tx
        .execute(
            "INSERT INTO participations (id, contest_id, participator_email, doc)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (contest_id, participator_email) DO NOTHING",
            &[
                &participation.id,
                &participation.contest_id,
                &participation.participator.email,
                &Json(participation),
            ],
        )
        .await?;
    if inserted == 0 {
        tx.rollback().await?;
        return Ok(EntryOutcome::AlreadyEntered);
    }

    tx.execute(
        "UPDATE contests SET doc = jsonb_set(
             doc,
             '{participate_count}',
             to_jsonb(COALESCE((doc->>'participate_count')::BIGINT, 0) + 1)
         )
         WHERE id = $1",
        &[&participation.contest_id],
    )
    .await?;

    tx.commit().await?;

    debug!(
        "Recorded entry {} on contest {}",
        participation.id, participation.contest_id
    );
    Ok(EntryOutcome::Entered {
        participation_id: participation.id.clone(),
    })
}

fn filter_sql(filter: &ParticipationFilter) -> (String, Vec<SqlParam>) {
    let mut clauses: Vec<String> = Vec::new();
    let mut params: Vec<SqlParam> = Vec::new();

    if let Some(email) = &filter.participator_email {
        params.push(Box::new(email.clone()));
        clauses.push(format!("participator_email = ${}", params.len()));
    }
    if let Some(contest_id) = &filter.contest_id {
        params.push(Box::new(contest_id.clone()));
        clauses.push(format!("contest_id = ${}", params.len()));
    }
    if filter.submitted_only {
        clauses.push("doc->'submitted_task' IS NOT NULL".to_string());
    }

    let mut sql = String::new();
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }

    sql.push_str(match filter.sort {
        Some(ParticipationSort::DeadlineAsc) => {
            " ORDER BY doc->>'contest_deadline' ASC NULLS FIRST, seq"
        }
        Some(ParticipationSort::DeadlineDesc) => {
            " ORDER BY doc->>'contest_deadline' DESC NULLS LAST, seq"
        }
        None => " ORDER BY seq",
    });

    (sql, params)
}

pub async fn list_participations(
    pool: &PgPool,
    filter: &ParticipationFilter,
) -> Result<Vec<Participation>> {
    let client = pool.get().await?;
    let (tail, params) = filter_sql(filter);
    let sql = format!("SELECT doc FROM participations{}", tail);

    let rows = client.query(&sql, &param_refs(&params)).await?;
    rows.iter().map(decode).collect()
}

pub async fn find_participation(pool: &PgPool, id: &str) -> Result<Option<Participation>> {
    let client = pool.get().await?;
    let row = client
        .query_opt("SELECT doc FROM participations WHERE id = $1", &[&id])
        .await?;

    row.as_ref().map(decode).transpose()
}

pub async fn submit_task(pool: &PgPool, id: &str, task: &serde_json::Value) -> Result<u64> {
    let client = pool.get().await?;
    let modified = client
        .execute(
            "UPDATE participations SET doc = jsonb_set(doc, '{submitted_task}', $2)
             WHERE id = $1",
            &[&id, &Json(task)],
        )
        .await?;

    Ok(modified)
}

pub async fn count_participations(pool: &PgPool, email: &str) -> Result<u64> {
    let client = pool.get().await?;
    let row = client
        .query_one(
            "SELECT COUNT(*) AS entries FROM participations WHERE participator_email = $1",
            &[&email],
        )
        .await?;

    let entries: i64 = row.try_get("entries")?;
    Ok(entries as u64)
}

pub async fn reconcile_participate_counts(pool: &PgPool) -> Result<u64> {
    let client = pool.get().await?;
    let repaired = client
        .execute(
            "WITH counts AS (
                 SELECT c.id, COUNT(p.id) AS actual
                 FROM contests c
                 LEFT JOIN participations p ON p.contest_id = c.id
                 GROUP BY c.id
             )
             UPDATE contests
             SET doc = jsonb_set(contests.doc, '{participate_count}', to_jsonb(counts.actual))
             FROM counts
             WHERE contests.id = counts.id
               AND COALESCE((contests.doc->>'participate_count')::BIGINT, -1) <> counts.actual",
            &[],
        )
        .await?;

    Ok(repaired)
}
