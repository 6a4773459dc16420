//! In-process store
//!
//! Keeps the three collections in insertion-ordered vectors behind one lock.
//! Used by the `memory` backend and by tests. Holding a single write lock for
//! [`ContestStore::enter_contest`] makes the ledger insert and the counter
//! increment one unit of work.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

use super::{
    ContestFilter, ContestSort, ContestStore, EntryOutcome, ParticipationFilter,
    ParticipationSort, Result,
};
use crate::models::{Contest, ContestStatus, Participation, Person, ProfileUpdate, Role, User};

#[derive(Default)]
struct Collections {
    users: Vec<User>,
    contests: Vec<Contest>,
    participations: Vec<Participation>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContestStore for MemoryStore {
    async fn list_users(&self) -> Result<Vec<User>> {
        Ok(self.inner.read().users.clone())
    }

    async fn find_user(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .inner
            .read()
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn insert_user_if_absent(&self, user: &User) -> Result<bool> {
        let mut inner = self.inner.write();
        if inner.users.iter().any(|u| u.email == user.email) {
            return Ok(false);
        }
        inner.users.push(user.clone());
        Ok(true)
    }

    async fn update_profile(&self, email: &str, update: &ProfileUpdate) -> Result<u64> {
        let mut inner = self.inner.write();
        let Some(user) = inner.users.iter_mut().find(|u| u.email == email) else {
            return Ok(0);
        };
        if let Some(name) = &update.name {
            user.name = Some(name.clone());
        }
        if let Some(image) = &update.image {
            user.image = Some(image.clone());
        }
        Ok(1)
    }

    async fn set_role(&self, id: &str, role: Role) -> Result<u64> {
        let mut inner = self.inner.write();
        match inner.users.iter_mut().find(|u| u.id == id) {
            Some(user) => {
                user.role = role;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_user(&self, id: &str) -> Result<u64> {
        let mut inner = self.inner.write();
        let before = inner.users.len();
        inner.users.retain(|u| u.id != id);
        Ok((before - inner.users.len()) as u64)
    }

    async fn list_contests(&self, filter: &ContestFilter) -> Result<Vec<Contest>> {
        let mut contests: Vec<Contest> = self
            .inner
            .read()
            .contests
            .iter()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();

        if let Some(ContestSort::ParticipateCountDesc) = filter.sort {
            // stable, so ties keep insertion order
            contests.sort_by(|a, b| b.participate_count.cmp(&a.participate_count));
        }
        if let Some(limit) = filter.limit {
            contests.truncate(limit);
        }
        Ok(contests)
    }

    async fn find_contest(&self, id: &str) -> Result<Option<Contest>> {
        Ok(self
            .inner
            .read()
            .contests
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn save_contest(&self, contest: &Contest) -> Result<bool> {
        let mut inner = self.inner.write();
        match inner.contests.iter_mut().find(|c| c.id == contest.id) {
            Some(existing) => {
                *existing = contest.clone();
                Ok(false)
            }
            None => {
                inner.contests.push(contest.clone());
                Ok(true)
            }
        }
    }

    async fn upsert_contest_details(&self, contest: &Contest) -> Result<bool> {
        let mut inner = self.inner.write();
        match inner.contests.iter_mut().find(|c| c.id == contest.id) {
            Some(existing) => {
                existing.name = contest.name.clone();
                existing.image = contest.image.clone();
                existing.description = contest.description.clone();
                existing.contest_price = contest.contest_price;
                existing.prize_money = contest.prize_money;
                existing.task_submission_instruction = contest.task_submission_instruction.clone();
                existing.contest_type = contest.contest_type.clone();
                existing.contest_deadline = contest.contest_deadline.clone();
                existing.contest_start_date = contest.contest_start_date.clone();
                Ok(false)
            }
            None => {
                inner.contests.push(contest.clone());
                Ok(true)
            }
        }
    }

    async fn transition_status(
        &self,
        id: &str,
        from: ContestStatus,
        to: ContestStatus,
    ) -> Result<u64> {
        let mut inner = self.inner.write();
        match inner
            .contests
            .iter_mut()
            .find(|c| c.id == id && c.status == from)
        {
            Some(contest) => {
                contest.status = to;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn set_winner(&self, id: &str, winner: &Person) -> Result<u64> {
        let mut inner = self.inner.write();
        match inner.contests.iter_mut().find(|c| {
            c.id == id && c.status == ContestStatus::Accepted && c.winner.is_none()
        }) {
            Some(contest) => {
                contest.winner = Some(winner.clone());
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_contest(&self, id: &str) -> Result<u64> {
        let mut inner = self.inner.write();
        let before = inner.contests.len();
        inner.contests.retain(|c| c.id != id);
        Ok((before - inner.contests.len()) as u64)
    }

    async fn enter_contest(&self, participation: &Participation) -> Result<EntryOutcome> {
        let mut inner = self.inner.write();

        let open = inner
            .contests
            .iter()
            .any(|c| c.id == participation.contest_id && c.status == ContestStatus::Accepted);
        if !open {
            return Ok(EntryOutcome::ContestUnavailable);
        }

        let duplicate = inner.participations.iter().any(|p| {
            p.contest_id == participation.contest_id
                && p.participator.email == participation.participator.email
        });
        if duplicate {
            return Ok(EntryOutcome::AlreadyEntered);
        }

        inner.participations.push(participation.clone());
        if let Some(contest) = inner
            .contests
            .iter_mut()
            .find(|c| c.id == participation.contest_id)
        {
            contest.participate_count += 1;
        }

        debug!(
            "Recorded entry {} on contest {}",
            participation.id, participation.contest_id
        );
        Ok(EntryOutcome::Entered {
            participation_id: participation.id.clone(),
        })
    }

    async fn list_participations(
        &self,
        filter: &ParticipationFilter,
    ) -> Result<Vec<Participation>> {
        let mut participations: Vec<Participation> = self
            .inner
            .read()
            .participations
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();

        match filter.sort {
            Some(ParticipationSort::DeadlineAsc) => {
                participations.sort_by(|a, b| a.contest_deadline.cmp(&b.contest_deadline))
            }
            Some(ParticipationSort::DeadlineDesc) => {
                participations.sort_by(|a, b| b.contest_deadline.cmp(&a.contest_deadline))
            }
            None => {}
        }
        Ok(participations)
    }

    async fn find_participation(&self, id: &str) -> Result<Option<Participation>> {
        Ok(self
            .inner
            .read()
            .participations
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn submit_task(&self, id: &str, task: &serde_json::Value) -> Result<u64> {
        let mut inner = self.inner.write();
        match inner.participations.iter_mut().find(|p| p.id == id) {
            Some(participation) => {
                participation.submitted_task = Some(task.clone());
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn count_participations(&self, email: &str) -> Result<u64> {
        Ok(self
            .inner
            .read()
            .participations
            .iter()
            .filter(|p| p.participator.email == email)
            .count() as u64)
    }

    async fn count_wins(&self, email: &str) -> Result<u64> {
        Ok(self
            .inner
            .read()
            .contests
            .iter()
            .filter(|c| c.winner.as_ref().is_some_and(|w| w.email == email))
            .count() as u64)
    }

    async fn reconcile_participate_counts(&self) -> Result<u64> {
        let mut inner = self.inner.write();

        let mut counts: HashMap<String, i64> = HashMap::new();
        for participation in &inner.participations {
            *counts.entry(participation.contest_id.clone()).or_default() += 1;
        }

        let mut repaired = 0;
        for contest in inner.contests.iter_mut() {
            let actual = counts.get(&contest.id).copied().unwrap_or(0);
            if contest.participate_count != actual {
                contest.participate_count = actual;
                repaired += 1;
            }
        }
        Ok(repaired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(email: &str) -> Person {
        Person {
            email: email.to_string(),
            name: None,
            image: None,
        }
    }

    fn contest(id: &str, status: ContestStatus, count: i64) -> Contest {
        Contest {
            id: id.to_string(),
            name: format!("Contest {}", id),
            image: None,
            description: String::new(),
            contest_price: 10.0,
            prize_money: 100.0,
            task_submission_instruction: String::new(),
            status,
            contest_type: "Image Design".to_string(),
            contest_deadline: None,
            contest_start_date: None,
            participate_count: count,
            contest_creator: person("maker@example.com"),
            winner: None,
        }
    }

    fn participation(id: &str, contest_id: &str, email: &str) -> Participation {
        Participation {
            id: id.to_string(),
            contest_id: contest_id.to_string(),
            participator: person(email),
            contest_name: None,
            contest_deadline: None,
            submitted_task: None,
        }
    }

    #[tokio::test]
    async fn test_insert_user_if_absent_keeps_first() {
        let store = MemoryStore::new();
        let first = User::new("a@example.com", Some("First".to_string()), None);
        let second = User::new("a@example.com", Some("Second".to_string()), None);

        assert!(store.insert_user_if_absent(&first).await.unwrap());
        assert!(!store.insert_user_if_absent(&second).await.unwrap());

        let stored = store.find_user("a@example.com").await.unwrap().unwrap();
        assert_eq!(stored, first);
    }

    #[tokio::test]
    async fn test_enter_contest_increments_once() {
        let store = MemoryStore::new();
        store
            .save_contest(&contest("c1", ContestStatus::Accepted, 0))
            .await
            .unwrap();

        let outcome = store
            .enter_contest(&participation("p1", "c1", "a@example.com"))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            EntryOutcome::Entered {
                participation_id: "p1".to_string()
            }
        );

        let outcome = store
            .enter_contest(&participation("p2", "c1", "a@example.com"))
            .await
            .unwrap();
        assert_eq!(outcome, EntryOutcome::AlreadyEntered);

        let stored = store.find_contest("c1").await.unwrap().unwrap();
        assert_eq!(stored.participate_count, 1);
        assert_eq!(store.count_participations("a@example.com").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_enter_pending_contest_writes_nothing() {
        let store = MemoryStore::new();
        store
            .save_contest(&contest("c1", ContestStatus::Pending, 0))
            .await
            .unwrap();

        let outcome = store
            .enter_contest(&participation("p1", "c1", "a@example.com"))
            .await
            .unwrap();
        assert_eq!(outcome, EntryOutcome::ContestUnavailable);
        assert_eq!(store.count_participations("a@example.com").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_popular_sort_and_limit() {
        let store = MemoryStore::new();
        for (id, count) in [("a", 3), ("b", 9), ("c", 1), ("d", 5)] {
            store
                .save_contest(&contest(id, ContestStatus::Accepted, count))
                .await
                .unwrap();
        }

        let filter = ContestFilter {
            sort: Some(ContestSort::ParticipateCountDesc),
            limit: Some(2),
            ..Default::default()
        };
        let ids: Vec<String> = store
            .list_contests(&filter)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec!["b", "d"]);
    }

    #[tokio::test]
    async fn test_transition_status_is_compare_and_set() {
        let store = MemoryStore::new();
        store
            .save_contest(&contest("c1", ContestStatus::Pending, 0))
            .await
            .unwrap();

        let changed = store
            .transition_status("c1", ContestStatus::Pending, ContestStatus::Accepted)
            .await
            .unwrap();
        assert_eq!(changed, 1);

        let changed = store
            .transition_status("c1", ContestStatus::Pending, ContestStatus::Rejected)
            .await
            .unwrap();
        assert_eq!(changed, 0);
        assert_eq!(
            store.find_contest("c1").await.unwrap().unwrap().status,
            ContestStatus::Accepted
        );
    }

    #[tokio::test]
    async fn test_upsert_details_preserves_lifecycle_fields() {
        let store = MemoryStore::new();
        store
            .save_contest(&contest("c1", ContestStatus::Accepted, 7))
            .await
            .unwrap();

        let mut edit = contest("c1", ContestStatus::Pending, 0);
        edit.name = "Renamed".to_string();
        let inserted = store.upsert_contest_details(&edit).await.unwrap();
        assert!(!inserted);

        let stored = store.find_contest("c1").await.unwrap().unwrap();
        assert_eq!(stored.name, "Renamed");
        assert_eq!(stored.status, ContestStatus::Accepted);
        assert_eq!(stored.participate_count, 7);
    }

    #[tokio::test]
    async fn test_reconcile_repairs_drifted_counters() {
        let store = MemoryStore::new();
        store
            .save_contest(&contest("c1", ContestStatus::Accepted, 0))
            .await
            .unwrap();
        store
            .save_contest(&contest("c2", ContestStatus::Accepted, 0))
            .await
            .unwrap();
        store
            .enter_contest(&participation("p1", "c1", "a@example.com"))
            .await
            .unwrap();

        // simulate a counter that drifted
        let mut drifted = store.find_contest("c2").await.unwrap().unwrap();
        drifted.participate_count = 4;
        store.save_contest(&drifted).await.unwrap();

        assert_eq!(store.reconcile_participate_counts().await.unwrap(), 1);
        assert_eq!(
            store.find_contest("c2").await.unwrap().unwrap().participate_count,
            0
        );
        assert_eq!(
            store.find_contest("c1").await.unwrap().unwrap().participate_count,
            1
        );
    }
}
