//! Contest lifecycle
//!
//! ```text
//!            admin            creator/admin
//! pending ─────────► accepted ─────────────► accepted + winner
//!    │
//!    └─────────────► rejected
//!            admin
//! ```
//!
//! Status changes are compare-and-set against the status that was read, so
//! two admins racing on the same contest cannot both win. The winner is an
//! annotation on an accepted contest and can be set exactly once.

use tracing::info;

use crate::error::ApiError;
use crate::models::{Contest, ContestDraft, ContestStatus, Person, WriteOutcome};
use crate::storage::{ContestFilter, ContestSort, ContestStore, ParticipationFilter};

/// Size of the `/popular-contests` listing
pub const POPULAR_LIMIT: usize = 6;

// ============================================================================
// LISTINGS
// ============================================================================

/// Translate the `tags` query into a `contest_type` substring.
///
/// Missing, empty, or exactly `all` disables the filter; hyphens stand for spaces.
pub fn tag_filter(tags: Option<&str>) -> Option<String> {
    let tags = tags?.trim();
    if tags.is_empty() || tags == "all" {
        return None;
    }
    Some(tags.replace('-', " "))
}

/// Accepted contests, optionally narrowed by `tags`
pub fn public_listing(tags: Option<&str>) -> ContestFilter {
    ContestFilter {
        status: Some(ContestStatus::Accepted),
        contest_type_contains: tag_filter(tags),
        ..Default::default()
    }
}

/// Accepted contests, most participated first
pub fn popular_listing() -> ContestFilter {
    ContestFilter {
        status: Some(ContestStatus::Accepted),
        sort: Some(ContestSort::ParticipateCountDesc),
        limit: Some(POPULAR_LIMIT),
        ..Default::default()
    }
}

/// Contests with a selected winner, optionally for one email
pub fn winners_listing(email: Option<&str>) -> ContestFilter {
    ContestFilter {
        has_winner: true,
        winner_email: email.filter(|e| !e.is_empty()).map(str::to_string),
        ..Default::default()
    }
}

// ============================================================================
// STATUS TRANSITIONS
// ============================================================================

/// Whether `from → to` is a legal status change.
///
/// Returns `Ok(false)` when nothing would change.
pub fn check_transition(from: ContestStatus, to: ContestStatus) -> Result<bool, ApiError> {
    match (from, to) {
        (a, b) if a == b => Ok(false),
        (ContestStatus::Pending, ContestStatus::Accepted)
        | (ContestStatus::Pending, ContestStatus::Rejected) => Ok(true),
        (a, b) => Err(ApiError::Conflict(format!(
            "contest cannot move from {} to {}",
            a, b
        ))),
    }
}

/// Apply an admin status decision. An absent contest modifies nothing.
pub async fn change_status(
    store: &dyn ContestStore,
    id: &str,
    to: ContestStatus,
) -> Result<WriteOutcome, ApiError> {
    let Some(contest) = store.find_contest(id).await? else {
        return Ok(WriteOutcome::default());
    };

    if !check_transition(contest.status, to)? {
        return Ok(WriteOutcome {
            matched_count: 1,
            ..Default::default()
        });
    }

    let modified = store.transition_status(id, contest.status, to).await?;
    if modified == 0 {
        return Err(ApiError::Conflict(
            "contest status changed concurrently".to_string(),
        ));
    }

    info!("Contest {} moved {} -> {}", id, contest.status, to);
    Ok(WriteOutcome::modified(modified))
}

// ============================================================================
// WINNER SELECTION
// ============================================================================

/// Record `winner` on an accepted contest that has none yet.
///
/// The winner must hold a participation on the contest.
pub async fn select_winner(
    store: &dyn ContestStore,
    contest: &Contest,
    winner: Person,
) -> Result<WriteOutcome, ApiError> {
    if contest.status != ContestStatus::Accepted {
        return Err(ApiError::Conflict(format!(
            "contest is {}, winners can only be chosen for accepted contests",
            contest.status
        )));
    }
    if contest.winner.is_some() {
        return Err(ApiError::Conflict("winner already selected".to_string()));
    }

    let entries = store
        .list_participations(&ParticipationFilter {
            participator_email: Some(winner.email.clone()),
            contest_id: Some(contest.id.clone()),
            ..Default::default()
        })
        .await?;
    if entries.is_empty() {
        return Err(ApiError::BadRequest(
            "winner must be a participant of the contest".to_string(),
        ));
    }

    let modified = store.set_winner(&contest.id, &winner).await?;
    if modified == 0 {
        return Err(ApiError::Conflict("winner already selected".to_string()));
    }

    info!("Contest {} winner: {}", contest.id, winner.email);
    Ok(WriteOutcome::modified(modified))
}

// ============================================================================
// CREATION AND EDITS
// ============================================================================

/// Store a new `pending` contest owned by `creator`, upserting on `_id`
pub async fn create_contest(
    store: &dyn ContestStore,
    creator: Person,
    mut draft: ContestDraft,
) -> Result<WriteOutcome, ApiError> {
    let id = draft
        .id
        .take()
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let existing = store.find_contest(&id).await?;
    if let Some(existing) = &existing {
        if existing.contest_creator.email != creator.email {
            return Err(ApiError::Forbidden);
        }
    }

    let contest = draft.into_contest(id.clone(), creator);
    // a repeated create only refreshes the editable fields
    let inserted = match existing {
        Some(_) => store.upsert_contest_details(&contest).await?,
        None => store.save_contest(&contest).await?,
    };

    info!("Contest {} saved by {}", id, contest.contest_creator.email);
    Ok(if inserted {
        WriteOutcome::upserted(id)
    } else {
        WriteOutcome::modified(1)
    })
}

/// Overwrite the editable fields of contest `id`, inserting it when absent
pub async fn update_contest(
    store: &dyn ContestStore,
    id: &str,
    existing: Option<&Contest>,
    caller: Person,
    draft: ContestDraft,
) -> Result<WriteOutcome, ApiError> {
    let creator = existing
        .map(|c| c.contest_creator.clone())
        .unwrap_or(caller);
    let contest = draft.into_contest(id.to_string(), creator);

    let inserted = store.upsert_contest_details(&contest).await?;
    Ok(if inserted {
        WriteOutcome::upserted(id)
    } else {
        WriteOutcome::modified(1)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Participation;
    use crate::storage::MemoryStore;

    fn person(email: &str) -> Person {
        Person {
            email: email.to_string(),
            name: None,
            image: None,
        }
    }

    fn draft(name: &str) -> ContestDraft {
        ContestDraft {
            id: None,
            name: name.to_string(),
            image: None,
            description: "desc".to_string(),
            contest_price: 10.0,
            prize_money: 200.0,
            task_submission_instruction: "upload a link".to_string(),
            contest_type: "Image Design".to_string(),
            contest_deadline: Some("2030-01-01".to_string()),
            contest_start_date: None,
            contest_creator: None,
        }
    }

    async fn seeded(status: ContestStatus) -> (MemoryStore, Contest) {
        let store = MemoryStore::new();
        let mut contest = draft("Logo").into_contest("c1".to_string(), person("maker@example.com"));
        contest.status = status;
        store.save_contest(&contest).await.unwrap();
        (store, contest)
    }

    #[test]
    fn test_tag_filter() {
        assert_eq!(tag_filter(None), None);
        assert_eq!(tag_filter(Some("")), None);
        assert_eq!(tag_filter(Some("all")), None);
        assert_eq!(tag_filter(Some("ALL")), Some("ALL".to_string()));
        assert_eq!(tag_filter(Some("image-design")), Some("image design".to_string()));
        assert_eq!(tag_filter(Some("Gaming")), Some("Gaming".to_string()));
    }

    #[test]
    fn test_transitions() {
        use ContestStatus::*;
        assert!(check_transition(Pending, Accepted).unwrap());
        assert!(check_transition(Pending, Rejected).unwrap());
        assert!(!check_transition(Accepted, Accepted).unwrap());
        assert!(matches!(
            check_transition(Accepted, Pending),
            Err(ApiError::Conflict(_))
        ));
        assert!(matches!(
            check_transition(Rejected, Accepted),
            Err(ApiError::Conflict(_))
        ));
    }

    #[test]
    fn test_popular_listing_shape() {
        let filter = popular_listing();
        assert_eq!(filter.limit, Some(6));
        assert_eq!(filter.sort, Some(ContestSort::ParticipateCountDesc));
        assert_eq!(filter.status, Some(ContestStatus::Accepted));
    }

    #[tokio::test]
    async fn test_change_status_missing_contest_is_zero() {
        let store = MemoryStore::new();
        let outcome = change_status(&store, "nope", ContestStatus::Accepted)
            .await
            .unwrap();
        assert_eq!(outcome, WriteOutcome::default());
    }

    #[tokio::test]
    async fn test_change_status_accepts_pending() {
        let (store, _) = seeded(ContestStatus::Pending).await;
        let outcome = change_status(&store, "c1", ContestStatus::Accepted)
            .await
            .unwrap();
        assert_eq!(outcome.modified_count, 1);

        let again = change_status(&store, "c1", ContestStatus::Accepted)
            .await
            .unwrap();
        assert_eq!(again.modified_count, 0);
        assert_eq!(again.matched_count, 1);
    }

    #[tokio::test]
    async fn test_select_winner_rules() {
        let (store, contest) = seeded(ContestStatus::Accepted).await;

        let err = select_winner(&store, &contest, person("nobody@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        store
            .enter_contest(&Participation {
                id: "p1".to_string(),
                contest_id: "c1".to_string(),
                participator: person("champ@example.com"),
                contest_name: None,
                contest_deadline: None,
                submitted_task: None,
            })
            .await
            .unwrap();

        let outcome = select_winner(&store, &contest, person("champ@example.com"))
            .await
            .unwrap();
        assert_eq!(outcome.modified_count, 1);

        let current = store.find_contest("c1").await.unwrap().unwrap();
        let err = select_winner(&store, &current, person("champ@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_select_winner_requires_accepted() {
        let (store, contest) = seeded(ContestStatus::Pending).await;
        let err = select_winner(&store, &contest, person("champ@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_create_contest_is_pending() {
        let store = MemoryStore::new();
        let mut body = draft("Essay");
        body.id = Some("fixed-id".to_string());

        let outcome = create_contest(&store, person("maker@example.com"), body)
            .await
            .unwrap();
        assert_eq!(outcome.upserted_id.as_deref(), Some("fixed-id"));

        let stored = store.find_contest("fixed-id").await.unwrap().unwrap();
        assert_eq!(stored.status, ContestStatus::Pending);
        assert_eq!(stored.participate_count, 0);

        let err = create_contest(&store, person("thief@example.com"), {
            let mut again = draft("Essay");
            again.id = Some("fixed-id".to_string());
            again
        })
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden));
    }

    #[tokio::test]
    async fn test_update_contest_keeps_creator() {
        let (store, contest) = seeded(ContestStatus::Accepted).await;
        let outcome = update_contest(
            &store,
            "c1",
            Some(&contest),
            person("boss@example.com"),
            draft("Renamed"),
        )
        .await
        .unwrap();
        assert_eq!(outcome.modified_count, 1);

        let stored = store.find_contest("c1").await.unwrap().unwrap();
        assert_eq!(stored.name, "Renamed");
        assert_eq!(stored.contest_creator.email, "maker@example.com");
        assert_eq!(stored.status, ContestStatus::Accepted);
    }
}
