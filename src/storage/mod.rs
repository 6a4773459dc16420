//! Data persistence layer.
//!
//! [`ContestStore`] is the only seam between the HTTP layer and the document
//! store. Every call is atomic at the single-document level; the one
//! multi-document write ([`ContestStore::enter_contest`]) is a unit of work in
//! each backend.

pub mod memory;
pub mod pg;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Contest, ContestStatus, Participation, Person, ProfileUpdate, Role, User};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    #[error("pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("pool setup error: {0}")]
    PoolSetup(#[from] deadpool_postgres::CreatePoolError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;

// ============================================================================
// QUERY FILTERS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContestSort {
    ParticipateCountDesc,
}

/// Field-equality filter over the contests collection.
///
/// All set conditions must hold. `contest_type_contains` is a case-insensitive
/// substring match.
#[derive(Debug, Clone, Default)]
pub struct ContestFilter {
    pub status: Option<ContestStatus>,
    pub contest_type_contains: Option<String>,
    pub creator_email: Option<String>,
    pub winner_email: Option<String>,
    pub has_winner: bool,
    pub sort: Option<ContestSort>,
    pub limit: Option<usize>,
}

impl ContestFilter {
    pub fn matches(&self, contest: &Contest) -> bool {
        if let Some(status) = self.status {
            if contest.status != status {
                return false;
            }
        }
        if let Some(needle) = &self.contest_type_contains {
            if !contest
                .contest_type
                .to_lowercase()
                .contains(&needle.to_lowercase())
            {
                return false;
            }
        }
        if let Some(email) = &self.creator_email {
            if &contest.contest_creator.email != email {
                return false;
            }
        }
        if self.has_winner && contest.winner.is_none() {
            return false;
        }
        if let Some(email) = &self.winner_email {
            match &contest.winner {
                Some(winner) if &winner.email == email => {}
                _ => return false,
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipationSort {
    DeadlineAsc,
    DeadlineDesc,
}

#[derive(Debug, Clone, Default)]
pub struct ParticipationFilter {
    pub participator_email: Option<String>,
    pub contest_id: Option<String>,
    pub submitted_only: bool,
    pub sort: Option<ParticipationSort>,
}

impl ParticipationFilter {
    pub fn matches(&self, participation: &Participation) -> bool {
        if let Some(email) = &self.participator_email {
            if &participation.participator.email != email {
                return false;
            }
        }
        if let Some(contest_id) = &self.contest_id {
            if &participation.contest_id != contest_id {
                return false;
            }
        }
        !(self.submitted_only && participation.submitted_task.is_none())
    }
}

/// Outcome of recording a contest entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    /// Participation stored and the contest counter incremented
    Entered { participation_id: String },
    /// The participator already has an entry on this contest
    AlreadyEntered,
    /// The contest is absent or not `accepted`; nothing was written
    ContestUnavailable,
}

// ============================================================================
// STORE TRAIT
// ============================================================================

#[async_trait]
pub trait ContestStore: Send + Sync {
    // ==================== Users ====================

    async fn list_users(&self) -> Result<Vec<User>>;
    async fn find_user(&self, email: &str) -> Result<Option<User>>;
    /// Insert unless a user with the same email exists. Returns whether it inserted.
    async fn insert_user_if_absent(&self, user: &User) -> Result<bool>;
    async fn update_profile(&self, email: &str, update: &ProfileUpdate) -> Result<u64>;
    async fn set_role(&self, id: &str, role: Role) -> Result<u64>;
    async fn delete_user(&self, id: &str) -> Result<u64>;

    // ==================== Contests ====================

    async fn list_contests(&self, filter: &ContestFilter) -> Result<Vec<Contest>>;
    async fn find_contest(&self, id: &str) -> Result<Option<Contest>>;
    /// Upsert the whole document by id. Returns whether it inserted.
    async fn save_contest(&self, contest: &Contest) -> Result<bool>;
    /// Insert if absent, otherwise overwrite only the creator-editable fields.
    /// Returns whether it inserted.
    async fn upsert_contest_details(&self, contest: &Contest) -> Result<bool>;
    /// Compare-and-set on the current status.
    async fn transition_status(
        &self,
        id: &str,
        from: ContestStatus,
        to: ContestStatus,
    ) -> Result<u64>;
    /// Set the winner only while the contest is accepted and has none.
    async fn set_winner(&self, id: &str, winner: &Person) -> Result<u64>;
    async fn delete_contest(&self, id: &str) -> Result<u64>;

    // ==================== Participations ====================

    /// Insert the participation and increment the parent contest's
    /// `participate_count` as a single unit of work.
    async fn enter_contest(&self, participation: &Participation) -> Result<EntryOutcome>;
    async fn list_participations(&self, filter: &ParticipationFilter)
        -> Result<Vec<Participation>>;
    async fn find_participation(&self, id: &str) -> Result<Option<Participation>>;
    async fn submit_task(&self, id: &str, task: &serde_json::Value) -> Result<u64>;
    async fn count_participations(&self, email: &str) -> Result<u64>;
    async fn count_wins(&self, email: &str) -> Result<u64>;
    /// Recompute every contest's `participate_count` from the ledger.
    /// Returns the number of contests whose counter changed.
    async fn reconcile_participate_counts(&self) -> Result<u64>;
}

/// Fields a creator may overwrite on an existing contest
pub(crate) const EDITABLE_CONTEST_FIELDS: &[&str] = &[
    "name",
    "image",
    "description",
    "contest_price",
    "prize_money",
    "task_submission_instruction",
    "contest_type",
    "contest_deadline",
    "contest_startDate",
];

#[cfg(test)]
mod tests {
    use super::*;

    fn contest(contest_type: &str, status: ContestStatus, winner: Option<&str>) -> Contest {
        Contest {
            id: "c1".to_string(),
            name: "Contest".to_string(),
            image: None,
            description: String::new(),
            contest_price: 0.0,
            prize_money: 0.0,
            task_submission_instruction: String::new(),
            status,
            contest_type: contest_type.to_string(),
            contest_deadline: None,
            contest_start_date: None,
            participate_count: 0,
            contest_creator: Person {
                email: "maker@example.com".to_string(),
                name: None,
                image: None,
            },
            winner: winner.map(|email| Person {
                email: email.to_string(),
                name: None,
                image: None,
            }),
        }
    }

    #[test]
    fn test_contest_filter_type_is_case_insensitive() {
        let filter = ContestFilter {
            status: Some(ContestStatus::Accepted),
            contest_type_contains: Some("image design".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&contest("Image Design", ContestStatus::Accepted, None)));
        assert!(!filter.matches(&contest("Image Design", ContestStatus::Pending, None)));
        assert!(!filter.matches(&contest("Article Writing", ContestStatus::Accepted, None)));
    }

    #[test]
    fn test_contest_filter_winner() {
        let filter = ContestFilter {
            winner_email: Some("champ@example.com".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&contest("x", ContestStatus::Accepted, Some("champ@example.com"))));
        assert!(!filter.matches(&contest("x", ContestStatus::Accepted, Some("other@example.com"))));
        assert!(!filter.matches(&contest("x", ContestStatus::Accepted, None)));

        let any_winner = ContestFilter {
            has_winner: true,
            ..Default::default()
        };
        assert!(!any_winner.matches(&contest("x", ContestStatus::Accepted, None)));
    }
}
