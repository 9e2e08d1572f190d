use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Per-assignee progress on a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum TaskStatus {
    Pending,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
    Failed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Completed => "Completed",
            TaskStatus::Failed => "Failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == value)
    }
}

/// One assignee's status record, embedded in its task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignedUser {
    pub email: String,
    pub status: TaskStatus,
    pub seen: bool,
    pub seen_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission: Option<String>,
}

impl AssignedUser {
    pub fn pending(email: &str) -> Self {
        AssignedUser {
            email: email.to_string(),
            status: TaskStatus::Pending,
            seen: false,
            seen_at: None,
            completed_at: None,
            submission: None,
        }
    }

    /// Applies a status change. Any status may follow any other.
    pub fn apply_status(
        &mut self,
        status: TaskStatus,
        seen: Option<bool>,
        submission: Option<String>,
        now: DateTime<Utc>,
    ) {
        if let Some(seen) = seen {
            self.seen = seen;
            self.seen_at = if seen { Some(now) } else { None };
        }

        self.status = status;
        match status {
            TaskStatus::Completed => self.completed_at = Some(now),
            TaskStatus::Failed => self.completed_at = None,
            TaskStatus::Pending | TaskStatus::InProgress => {}
        }

        if submission.is_some() {
            self.submission = submission;
        }
    }
}

/// Builds a fresh assignee list; repeated emails collapse to their first
/// occurrence.
pub fn seed_assignees(emails: &[String]) -> Vec<AssignedUser> {
    let mut seen = HashSet::new();
    emails
        .iter()
        .filter(|email| seen.insert(email.as_str()))
        .map(|email| AssignedUser::pending(email))
        .collect()
}

/// Rebuilds the assignee list for `emails`, carrying over the records of
/// emails already assigned. New emails start at Pending.
pub fn reconcile_assignees(current: &[AssignedUser], emails: &[String]) -> Vec<AssignedUser> {
    let previous: HashMap<&str, &AssignedUser> = current
        .iter()
        .map(|entry| (entry.email.as_str(), entry))
        .collect();

    seed_assignees(emails)
        .into_iter()
        .map(|fresh| match previous.get(fresh.email.as_str()) {
            Some(existing) => (*existing).clone(),
            None => fresh,
        })
        .collect()
}

/// Free-text question or note attached to a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    pub id: String,
    pub user: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Query {
    pub fn new(user: &str, message: &str, now: DateTime<Utc>) -> Self {
        Query {
            id: Uuid::new_v4().to_string(),
            user: user.to_string(),
            message: message.to_string(),
            created_at: now,
        }
    }
}

/// Task document (stored in the `tasks` collection)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub date: String,
    pub deadline: String,
    pub category: String,
    pub description: String,
    pub assigned_users: Vec<AssignedUser>,
    #[serde(default)]
    pub queries: Vec<Query>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn assignee(&self, email: &str) -> Option<&AssignedUser> {
        self.assigned_users.iter().find(|entry| entry.email == email)
    }

    pub fn assignee_mut(&mut self, email: &str) -> Option<&mut AssignedUser> {
        self.assigned_users.iter_mut().find(|entry| entry.email == email)
    }
}

/// Request para criar tarefa. Todos os campos são opcionais para que os
/// ausentes sejam reportados juntos.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub title: Option<String>,
    pub date: Option<String>,
    pub deadline: Option<String>,
    #[schema(value_type = Option<Vec<String>>)]
    pub assign_to: Option<serde_json::Value>,
    pub category: Option<String>,
    pub description: Option<String>,
}

/// Request para atualizar tarefa
#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub date: Option<String>,
    pub deadline: Option<String>,
    #[schema(value_type = Option<Vec<String>>)]
    pub assign_to: Option<serde_json::Value>,
    pub category: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdateStatusRequest {
    pub email: Option<String>,
    pub status: Option<String>,
    pub seen: Option<bool>,
    pub submission: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct AddQueryRequest {
    pub user: Option<String>,
    pub message: Option<String>,
}

/// Response de tarefa
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub date: String,
    pub deadline: String,
    pub category: String,
    pub description: String,
    pub assigned_users: Vec<AssignedUser>,
    pub queries: Vec<Query>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        TaskResponse {
            id: task.id.map(|id| id.to_hex()).unwrap_or_default(),
            title: task.title,
            date: task.date,
            deadline: task.deadline,
            category: task.category,
            description: task.description,
            assigned_users: task.assigned_users,
            queries: task.queries,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

/// One assignee's view of a task
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserTaskSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub description: String,
    pub deadline: String,
    pub user_status: TaskStatus,
    pub seen: bool,
    pub seen_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn emails(list: &[&str]) -> Vec<String> {
        list.iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn test_status_names_match_wire_format() {
        assert_eq!(serde_json::to_value(TaskStatus::InProgress).unwrap(), "In Progress");
        assert_eq!(TaskStatus::parse("In Progress"), Some(TaskStatus::InProgress));
        assert_eq!(TaskStatus::parse("Seen"), None);
        assert_eq!(TaskStatus::parse("completed"), None);
    }

    #[test]
    fn test_seeded_assignees_start_pending_and_unseen() {
        let seeded = seed_assignees(&emails(&["a@x.com", "b@x.com"]));

        assert_eq!(seeded.len(), 2);
        for entry in &seeded {
            assert_eq!(entry.status, TaskStatus::Pending);
            assert!(!entry.seen);
            assert!(entry.seen_at.is_none());
            assert!(entry.completed_at.is_none());
        }
    }

    #[test]
    fn test_seed_collapses_duplicate_emails() {
        let seeded = seed_assignees(&emails(&["a@x.com", "b@x.com", "a@x.com"]));
        let order: Vec<_> = seeded.iter().map(|e| e.email.as_str()).collect();
        assert_eq!(order, vec!["a@x.com", "b@x.com"]);
    }

    #[test]
    fn test_reconcile_keeps_retained_and_resets_new() {
        let now = Utc::now();
        let mut a = AssignedUser::pending("a@x.com");
        a.apply_status(TaskStatus::Completed, Some(true), None, now);
        let b = AssignedUser::pending("b@x.com");

        let result = reconcile_assignees(&[a.clone(), b], &emails(&["c@x.com", "a@x.com"]));

        assert_eq!(result.len(), 2);
        assert_eq!(result[0], AssignedUser::pending("c@x.com"));
        assert_eq!(result[1], a);
        assert_eq!(result[1].completed_at, Some(now));
    }

    #[test]
    fn test_completed_stamps_and_failed_clears_completion() {
        let now = Utc::now();
        let mut entry = AssignedUser::pending("a@x.com");

        entry.apply_status(TaskStatus::Completed, None, None, now);
        assert_eq!(entry.completed_at, Some(now));

        entry.apply_status(TaskStatus::Failed, None, None, now + Duration::seconds(5));
        assert_eq!(entry.status, TaskStatus::Failed);
        assert!(entry.completed_at.is_none());
    }

    #[test]
    fn test_in_progress_leaves_completion_untouched() {
        let now = Utc::now();
        let mut entry = AssignedUser::pending("a@x.com");
        entry.apply_status(TaskStatus::Completed, None, None, now);

        entry.apply_status(TaskStatus::InProgress, None, None, now + Duration::seconds(1));
        assert_eq!(entry.completed_at, Some(now));
    }

    #[test]
    fn test_seen_flag_stamps_and_clears_seen_at() {
        let now = Utc::now();
        let mut entry = AssignedUser::pending("a@x.com");

        entry.apply_status(TaskStatus::Pending, Some(true), None, now);
        assert!(entry.seen);
        assert_eq!(entry.seen_at, Some(now));

        entry.apply_status(TaskStatus::Pending, None, None, now + Duration::seconds(1));
        assert_eq!(entry.seen_at, Some(now));

        entry.apply_status(TaskStatus::Pending, Some(false), None, now);
        assert!(!entry.seen);
        assert!(entry.seen_at.is_none());
    }

    #[test]
    fn test_submission_is_kept_until_replaced() {
        let now = Utc::now();
        let mut entry = AssignedUser::pending("a@x.com");

        entry.apply_status(TaskStatus::Completed, None, Some("done.pdf".to_string()), now);
        entry.apply_status(TaskStatus::Completed, None, None, now);
        assert_eq!(entry.submission.as_deref(), Some("done.pdf"));
    }

    #[test]
    fn test_assigned_user_serializes_camel_case_with_nulls() {
        let json = serde_json::to_value(AssignedUser::pending("a@x.com")).unwrap();
        assert_eq!(json["status"], "Pending");
        assert_eq!(json["seen"], false);
        assert!(json["seenAt"].is_null());
        assert!(json["completedAt"].is_null());
        assert!(json.get("submission").is_none());
    }

    #[test]
    fn test_query_ids_are_unique() {
        let now = Utc::now();
        let first = Query::new("a@x.com", "When is this due?", now);
        let second = Query::new("a@x.com", "When is this due?", now);
        assert_ne!(first.id, second.id);
    }
}
