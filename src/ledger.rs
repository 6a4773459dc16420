//! Participation ledger
//!
//! Entries are append-only apart from attaching a submitted task. Each entry
//! bumps the parent contest's `participate_count` inside the same store-level
//! unit of work; [`ContestStore::reconcile_participate_counts`] repairs
//! counters that drifted before that guarantee existed.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::{ensure_owner, Identity};
use crate::error::ApiError;
use crate::models::{InsertOutcome, Participation, Person, WriteOutcome};
use crate::storage::{ContestStore, EntryOutcome, ParticipationFilter, ParticipationSort};

/// Body of `POST /participate-contest`
#[derive(Debug, Clone, Deserialize)]
pub struct EntryRequest {
    pub contest_id: String,
    pub participator: Person,
}

/// Record `request` as a new entry by the caller
pub async fn enter_contest(
    store: &dyn ContestStore,
    identity: &Identity,
    request: EntryRequest,
) -> Result<InsertOutcome, ApiError> {
    ensure_owner(identity, &request.participator.email)?;

    // snapshot display fields so history listings need no join
    let contest = store.find_contest(&request.contest_id).await?;
    let participation = Participation {
        id: uuid::Uuid::new_v4().to_string(),
        contest_id: request.contest_id,
        participator: request.participator,
        contest_name: contest.as_ref().map(|c| c.name.clone()),
        contest_deadline: contest.and_then(|c| c.contest_deadline),
        submitted_task: None,
    };

    match store.enter_contest(&participation).await? {
        EntryOutcome::Entered { participation_id } => {
            info!(
                "{} entered contest {}",
                participation.participator.email, participation.contest_id
            );
            Ok(InsertOutcome {
                acknowledged: true,
                inserted_id: participation_id,
            })
        }
        EntryOutcome::AlreadyEntered => Err(ApiError::Conflict(
            "already participating in this contest".to_string(),
        )),
        EntryOutcome::ContestUnavailable => Err(ApiError::BadRequest(
            "contest is not open for entries".to_string(),
        )),
    }
}

/// Attach `task` to the caller's own participation.
///
/// A `null` task is rejected. An absent participation modifies nothing.
pub async fn submit_task(
    store: &dyn ContestStore,
    identity: &Identity,
    participation_id: &str,
    task: serde_json::Value,
) -> Result<WriteOutcome, ApiError> {
    if task.is_null() {
        return Err(ApiError::BadRequest("task must not be null".to_string()));
    }

    let Some(participation) = store.find_participation(participation_id).await? else {
        return Ok(WriteOutcome::default());
    };
    ensure_owner(identity, &participation.participator.email)?;

    let modified = store.submit_task(participation_id, &task).await?;
    Ok(WriteOutcome::modified(modified))
}

/// Map the `sortBy` query of the history listing
pub fn history_sort(sort_by: Option<&str>) -> Option<ParticipationSort> {
    match sort_by.map(str::trim) {
        Some(s) if s.eq_ignore_ascii_case("deadline") || s.eq_ignore_ascii_case("asc") => {
            Some(ParticipationSort::DeadlineAsc)
        }
        Some(s) if s.eq_ignore_ascii_case("desc") => Some(ParticipationSort::DeadlineDesc),
        _ => None,
    }
}

/// Participations of `email`, optionally narrowed to one contest
pub fn history_filter(
    email: &str,
    contest_id: Option<&str>,
    sort_by: Option<&str>,
) -> ParticipationFilter {
    ParticipationFilter {
        participator_email: Some(email.to_string()),
        contest_id: contest_id.filter(|id| !id.is_empty()).map(str::to_string),
        submitted_only: false,
        sort: history_sort(sort_by),
    }
}

/// Participations on `contest_id` that carry a submitted task
pub fn submissions_filter(contest_id: &str) -> ParticipationFilter {
    ParticipationFilter {
        contest_id: Some(contest_id.to_string()),
        submitted_only: true,
        ..Default::default()
    }
}

// ============================================================================
// WIN RATE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinStats {
    #[serde(rename = "winningCount")]
    pub winning_count: u64,
    #[serde(rename = "participantCount")]
    pub participant_count: u64,
    #[serde(rename = "winningPercentage")]
    pub winning_percentage: f64,
}

/// `wins / entries * 100` rounded to two decimals; `0.0` when there are no entries
pub fn win_percentage(wins: u64, entries: u64) -> f64 {
    if entries == 0 {
        return 0.0;
    }
    let pct = wins as f64 / entries as f64 * 100.0;
    (pct * 100.0).round() / 100.0
}

pub async fn user_stats(store: &dyn ContestStore, email: &str) -> Result<WinStats, ApiError> {
    let winning_count = store.count_wins(email).await?;
    let participant_count = store.count_participations(email).await?;
    Ok(WinStats {
        winning_count,
        participant_count,
        winning_percentage: win_percentage(winning_count, participant_count),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContestDraft, ContestStatus};
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    fn person(email: &str) -> Person {
        Person {
            email: email.to_string(),
            name: None,
            image: None,
        }
    }

    fn identity(email: &str) -> Identity {
        Identity {
            email: email.to_string(),
        }
    }

    async fn accepted_contest(store: &MemoryStore, id: &str, deadline: &str) {
        let draft = ContestDraft {
            id: None,
            name: format!("Contest {}", id),
            image: None,
            description: String::new(),
            contest_price: 5.0,
            prize_money: 50.0,
            task_submission_instruction: String::new(),
            contest_type: "Gaming".to_string(),
            contest_deadline: Some(deadline.to_string()),
            contest_start_date: None,
            contest_creator: None,
        };
        let mut contest = draft.into_contest(id.to_string(), person("maker@example.com"));
        contest.status = ContestStatus::Accepted;
        store.save_contest(&contest).await.unwrap();
    }

    fn entry(contest_id: &str, email: &str) -> EntryRequest {
        EntryRequest {
            contest_id: contest_id.to_string(),
            participator: person(email),
        }
    }

    #[test]
    fn test_win_percentage() {
        assert_eq!(win_percentage(1, 3), 33.33);
        assert_eq!(win_percentage(2, 3), 66.67);
        assert_eq!(win_percentage(0, 5), 0.0);
        assert_eq!(win_percentage(0, 0), 0.0);
        assert!(win_percentage(3, 0).is_finite());
    }

    #[test]
    fn test_history_sort() {
        assert_eq!(history_sort(None), None);
        assert_eq!(
            history_sort(Some("deadline")),
            Some(ParticipationSort::DeadlineAsc)
        );
        assert_eq!(
            history_sort(Some("DESC")),
            Some(ParticipationSort::DeadlineDesc)
        );
        assert_eq!(history_sort(Some("random")), None);
    }

    #[tokio::test]
    async fn test_enter_snapshots_contest_and_counts() {
        let store = MemoryStore::new();
        accepted_contest(&store, "c1", "2030-05-01").await;

        let outcome = enter_contest(
            &store,
            &identity("a@example.com"),
            entry("c1", "a@example.com"),
        )
        .await
        .unwrap();
        assert!(outcome.acknowledged);

        let stored = store
            .find_participation(&outcome.inserted_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.contest_name.as_deref(), Some("Contest c1"));
        assert_eq!(stored.contest_deadline.as_deref(), Some("2030-05-01"));
        assert_eq!(
            store.find_contest("c1").await.unwrap().unwrap().participate_count,
            1
        );
    }

    #[tokio::test]
    async fn test_enter_for_someone_else_is_forbidden() {
        let store = MemoryStore::new();
        accepted_contest(&store, "c1", "2030-05-01").await;

        let err = enter_contest(
            &store,
            &identity("a@example.com"),
            entry("c1", "b@example.com"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden));
        assert_eq!(
            store.find_contest("c1").await.unwrap().unwrap().participate_count,
            0
        );
    }

    #[tokio::test]
    async fn test_enter_missing_contest_is_bad_request() {
        let store = MemoryStore::new();
        let err = enter_contest(
            &store,
            &identity("a@example.com"),
            entry("nope", "a@example.com"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_submit_task_owner_only() {
        let store = MemoryStore::new();
        accepted_contest(&store, "c1", "2030-05-01").await;
        let outcome = enter_contest(
            &store,
            &identity("a@example.com"),
            entry("c1", "a@example.com"),
        )
        .await
        .unwrap();

        let task = serde_json::json!({ "link": "https://example.com/work" });
        let err = submit_task(
            &store,
            &identity("b@example.com"),
            &outcome.inserted_id,
            task.clone(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden));

        let null_task = submit_task(
            &store,
            &identity("a@example.com"),
            &outcome.inserted_id,
            serde_json::Value::Null,
        )
        .await
        .unwrap_err();
        assert!(matches!(null_task, ApiError::BadRequest(_)));
        assert!(store
            .list_participations(&submissions_filter("c1"))
            .await
            .unwrap()
            .is_empty());

        let written = submit_task(
            &store,
            &identity("a@example.com"),
            &outcome.inserted_id,
            task.clone(),
        )
        .await
        .unwrap();
        assert_eq!(written.modified_count, 1);

        let missing = submit_task(&store, &identity("a@example.com"), "nope", task)
            .await
            .unwrap();
        assert_eq!(missing.modified_count, 0);

        let submitted = store
            .list_participations(&submissions_filter("c1"))
            .await
            .unwrap();
        assert_eq!(submitted.len(), 1);
    }

    #[tokio::test]
    async fn test_user_stats() {
        let store = MemoryStore::new();
        for id in ["c1", "c2", "c3"] {
            accepted_contest(&store, id, "2030-05-01").await;
            enter_contest(&store, &identity("a@example.com"), entry(id, "a@example.com"))
                .await
                .unwrap();
        }
        store.set_winner("c2", &person("a@example.com")).await.unwrap();

        let stats = user_stats(&store, "a@example.com").await.unwrap();
        assert_eq!(stats.winning_count, 1);
        assert_eq!(stats.participant_count, 3);
        assert_eq!(stats.winning_percentage, 33.33);

        let empty = user_stats(&store, "new@example.com").await.unwrap();
        assert_eq!(empty.participant_count, 0);
        assert_eq!(empty.winning_percentage, 0.0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_entries_keep_count_in_step() {
        const ENTRANTS: usize = 50;
        let store = Arc::new(MemoryStore::new());
        accepted_contest(&store, "c1", "2030-05-01").await;

        let mut handles = Vec::with_capacity(ENTRANTS);
        for i in 0..ENTRANTS {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let email = format!("p{}@example.com", i);
                enter_contest(store.as_ref(), &identity(&email), entry("c1", &email)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let contest = store.find_contest("c1").await.unwrap().unwrap();
        assert_eq!(contest.participate_count, ENTRANTS as i64);

        let entries = store
            .list_participations(&ParticipationFilter {
                contest_id: Some("c1".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(entries.len(), ENTRANTS);
        assert_eq!(store.count_participations("p7@example.com").await.unwrap(), 1);
        assert_eq!(store.reconcile_participate_counts().await.unwrap(), 0);
    }
}
