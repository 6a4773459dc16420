//! Documents stored by the contest platform
//!
//! Three collections exist:
//! - `users`: one document per email, created on first login
//! - `contests`: owned by `contest_creator`, moved through [`ContestStatus`]
//! - `participations`: the ledger of contest entries, owned by `participator`
//!
//! Field names on the wire follow the web client (`_id`, `contest_startDate`,
//! `participate_count`), so several fields carry explicit serde renames.

use serde::{Deserialize, Serialize};

// ============================================================================
// USERS
// ============================================================================

/// Platform role of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Creator,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub role: Role,
}

impl User {
    pub fn new(email: impl Into<String>, name: Option<String>, image: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.into(),
            name,
            image,
            role: Role::User,
        }
    }
}

/// Self-service profile edit. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.image.is_none()
    }
}

// ============================================================================
// CONTESTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContestStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

impl ContestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContestStatus::Pending => "pending",
            ContestStatus::Accepted => "accepted",
            ContestStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for ContestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user reference embedded in another document (creator, participator, winner)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contest {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub contest_price: f64,
    #[serde(default)]
    pub prize_money: f64,
    #[serde(default)]
    pub task_submission_instruction: String,
    #[serde(default)]
    pub status: ContestStatus,
    #[serde(default)]
    pub contest_type: String,
    #[serde(default)]
    pub contest_deadline: Option<String>,
    #[serde(rename = "contest_startDate", default)]
    pub contest_start_date: Option<String>,
    #[serde(default)]
    pub participate_count: i64,
    pub contest_creator: Person,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<Person>,
}

/// Creator-editable contest fields, as sent by `POST /contests` and `PUT /contests/:id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContestDraft {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub contest_price: f64,
    #[serde(default)]
    pub prize_money: f64,
    #[serde(default)]
    pub task_submission_instruction: String,
    #[serde(default)]
    pub contest_type: String,
    #[serde(default)]
    pub contest_deadline: Option<String>,
    #[serde(rename = "contest_startDate", default)]
    pub contest_start_date: Option<String>,
    #[serde(default)]
    pub contest_creator: Option<Person>,
}

impl ContestDraft {
    /// Build a fresh `pending` contest owned by `creator`
    pub fn into_contest(self, id: String, creator: Person) -> Contest {
        Contest {
            id,
            name: self.name,
            image: self.image,
            description: self.description,
            contest_price: self.contest_price,
            prize_money: self.prize_money,
            task_submission_instruction: self.task_submission_instruction,
            status: ContestStatus::Pending,
            contest_type: self.contest_type,
            contest_deadline: self.contest_deadline,
            contest_start_date: self.contest_start_date,
            participate_count: 0,
            contest_creator: creator,
            winner: None,
        }
    }
}

// ============================================================================
// PARTICIPATIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participation {
    #[serde(rename = "_id")]
    pub id: String,
    pub contest_id: String,
    pub participator: Person,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contest_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contest_deadline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_task: Option<serde_json::Value>,
}

// ============================================================================
// WRITE RESULTS
// ============================================================================

/// Result of an update-style write, shaped like the document store's reply
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOutcome {
    #[serde(rename = "matchedCount")]
    pub matched_count: u64,
    #[serde(rename = "modifiedCount")]
    pub modified_count: u64,
    #[serde(rename = "upsertedId", skip_serializing_if = "Option::is_none")]
    pub upserted_id: Option<String>,
}

impl WriteOutcome {
    pub fn modified(count: u64) -> Self {
        Self {
            matched_count: count,
            modified_count: count,
            upserted_id: None,
        }
    }

    pub fn upserted(id: impl Into<String>) -> Self {
        Self {
            matched_count: 0,
            modified_count: 0,
            upserted_id: Some(id.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertOutcome {
    pub acknowledged: bool,
    #[serde(rename = "insertedId")]
    pub inserted_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOutcome {
    #[serde(rename = "deletedCount")]
    pub deleted_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contest_wire_names() {
        let raw = serde_json::json!({
            "_id": "c1",
            "name": "Logo Design",
            "contest_type": "Image Design",
            "contest_startDate": "2024-01-01",
            "participate_count": 4,
            "status": "accepted",
            "contest_creator": { "email": "maker@example.com" }
        });
        let contest: Contest = serde_json::from_value(raw).unwrap();
        assert_eq!(contest.status, ContestStatus::Accepted);
        assert_eq!(contest.contest_start_date.as_deref(), Some("2024-01-01"));
        assert_eq!(contest.participate_count, 4);
        assert!(contest.winner.is_none());

        let back = serde_json::to_value(&contest).unwrap();
        assert_eq!(back["_id"], "c1");
        assert!(back.get("winner").is_none());
    }

    #[test]
    fn test_draft_forces_pending() {
        let draft = ContestDraft {
            id: None,
            name: "Essay".to_string(),
            image: None,
            description: String::new(),
            contest_price: 5.0,
            prize_money: 50.0,
            task_submission_instruction: String::new(),
            contest_type: "Article Writing".to_string(),
            contest_deadline: None,
            contest_start_date: None,
            contest_creator: None,
        };
        let creator = Person {
            email: "maker@example.com".to_string(),
            name: None,
            image: None,
        };
        let contest = draft.into_contest("c9".to_string(), creator);
        assert_eq!(contest.status, ContestStatus::Pending);
        assert_eq!(contest.participate_count, 0);
    }

    #[test]
    fn test_role_defaults_to_user() {
        let user: User =
            serde_json::from_value(serde_json::json!({"_id": "u1", "email": "a@b.c"})).unwrap();
        assert_eq!(user.role, Role::User);
        assert_eq!(
            serde_json::to_value(Role::Admin).unwrap(),
            serde_json::json!("admin")
        );
    }
}
