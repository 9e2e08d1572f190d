use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Task, TaskStatus};

/// Per-user progress summary
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserInsight {
    pub name: String,
    pub email: String,
    pub total: u32,
    pub completed: u32,
    pub in_progress: u32,
    pub failed: u32,
    pub seen: u32,
    pub last_seen: Option<DateTime<Utc>>,
    pub last_completed: Option<DateTime<Utc>>,
}

impl UserInsight {
    /// Folds every task `email` is assigned to into one summary.
    pub fn fold(name: &str, email: &str, tasks: &[Task]) -> Self {
        let mut insight = UserInsight {
            name: name.to_string(),
            email: email.to_string(),
            total: 0,
            completed: 0,
            in_progress: 0,
            failed: 0,
            seen: 0,
            last_seen: None,
            last_completed: None,
        };

        for entry in tasks.iter().filter_map(|task| task.assignee(email)) {
            insight.total += 1;
            match entry.status {
                TaskStatus::Completed => insight.completed += 1,
                TaskStatus::InProgress => insight.in_progress += 1,
                TaskStatus::Failed => insight.failed += 1,
                TaskStatus::Pending => {}
            }
            if entry.seen {
                insight.seen += 1;
            }
            insight.last_seen = insight.last_seen.max(entry.seen_at);
            insight.last_completed = insight.last_completed.max(entry.completed_at);
        }

        insight
    }
}

/// One labelled counter of the per-user stats panel
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct StatEntry {
    pub label: &'static str,
    pub status: TaskStatus,
    pub count: u32,
}

/// Counts `email`'s tasks per status, in display order.
pub fn task_stats(email: &str, tasks: &[Task]) -> Vec<StatEntry> {
    let count = |status: TaskStatus| {
        tasks
            .iter()
            .filter_map(|task| task.assignee(email))
            .filter(|entry| entry.status == status)
            .count() as u32
    };

    [
        ("New task", TaskStatus::Pending),
        ("Completed task", TaskStatus::Completed),
        ("In Progress", TaskStatus::InProgress),
        ("Failed", TaskStatus::Failed),
    ]
    .into_iter()
    .map(|(label, status)| StatEntry {
        label,
        status,
        count: count(status),
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{seed_assignees, AssignedUser};
    use chrono::Duration;

    fn task_for(entries: Vec<AssignedUser>) -> Task {
        let now = Utc::now();
        Task {
            id: None,
            title: "Report".to_string(),
            date: "2024-01-01".to_string(),
            deadline: "2024-01-10".to_string(),
            category: "Docs".to_string(),
            description: "Write report".to_string(),
            assigned_users: entries,
            queries: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn entry(email: &str, status: TaskStatus, seen_at: Option<DateTime<Utc>>) -> AssignedUser {
        let mut entry = AssignedUser::pending(email);
        let now = seen_at.unwrap_or_else(Utc::now);
        entry.apply_status(status, Some(seen_at.is_some()), None, now);
        entry
    }

    #[test]
    fn test_fold_counts_and_latest_timestamps() {
        let early = Utc::now() - Duration::days(2);
        let late = Utc::now() - Duration::hours(1);
        let tasks = vec![
            task_for(vec![entry("a@x.com", TaskStatus::Completed, Some(early))]),
            task_for(vec![entry("a@x.com", TaskStatus::Completed, Some(late))]),
            task_for(vec![entry("a@x.com", TaskStatus::InProgress, None)]),
            task_for(vec![entry("a@x.com", TaskStatus::Failed, None)]),
            task_for(vec![entry("b@x.com", TaskStatus::Completed, None)]),
        ];

        let insight = UserInsight::fold("Ada", "a@x.com", &tasks);

        assert_eq!(insight.total, 4);
        assert_eq!(insight.completed, 2);
        assert_eq!(insight.in_progress, 1);
        assert_eq!(insight.failed, 1);
        assert_eq!(insight.seen, 2);
        assert_eq!(insight.last_seen, Some(late));
        assert_eq!(insight.last_completed, Some(late));
    }

    #[test]
    fn test_fold_with_no_tasks_is_empty() {
        let insight = UserInsight::fold("Ada", "a@x.com", &[]);
        assert_eq!(insight.total, 0);
        assert!(insight.last_seen.is_none());
        assert!(insight.last_completed.is_none());
    }

    #[test]
    fn test_stats_follow_status_changes() {
        let emails = vec!["a@x.com".to_string(), "b@x.com".to_string()];
        let mut task = task_for(seed_assignees(&emails));
        task.assignee_mut("a@x.com")
            .unwrap()
            .apply_status(TaskStatus::InProgress, None, None, Utc::now());

        let before = task_stats("a@x.com", &[task.clone()]);
        assert_eq!(before[1].count, 0);
        assert_eq!(before[2].count, 1);

        task.assignee_mut("a@x.com")
            .unwrap()
            .apply_status(TaskStatus::Completed, None, None, Utc::now());

        let after = task_stats("a@x.com", &[task]);
        assert_eq!(after[1].label, "Completed task");
        assert_eq!(after[1].count, 1);
        assert_eq!(after[2].count, 0);
    }
}
