use crate::{
    database::{MongoDB, TASKS},
    models::{
        reconcile_assignees, seed_assignees, AddQueryRequest, CreateTaskRequest, Query, Task,
        TaskStatus, UpdateStatusRequest, UpdateTaskRequest, UserTaskSummary,
    },
    utils::{error::AppError, required},
};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, to_bson, Document};
use mongodb::options::ReturnDocument;

/// Pseudo-status accepted by the per-user filter: tasks the user has opened.
pub const SEEN_FILTER: &str = "Seen";

pub fn parse_task_id(task_id: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(task_id).map_err(|_| AppError::Validation("Invalid task ID".to_string()))
}

/// Reads an assignee list; it must be a JSON array of non-blank strings.
pub fn parse_assignees(value: &serde_json::Value) -> Result<Vec<String>, AppError> {
    let invalid = || AppError::Validation("assignTo must be an array".to_string());

    value
        .as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::trim)
                .filter(|email| !email.is_empty())
                .map(str::to_string)
                .ok_or_else(invalid)
        })
        .collect()
}

/// Validates a creation request into a new task with every assignee Pending.
pub fn build_task(request: &CreateTaskRequest, now: DateTime<Utc>) -> Result<Task, AppError> {
    let fields = (
        required(&request.title),
        required(&request.date),
        required(&request.deadline),
        request.assign_to.as_ref().filter(|value| !value.is_null()),
        required(&request.category),
        required(&request.description),
    );

    let (title, date, deadline, assign_to, category, description) = match fields {
        (Some(t), Some(d), Some(dl), Some(a), Some(c), Some(desc)) => (t, d, dl, a, c, desc),
        _ => return Err(AppError::Validation("All fields are required.".to_string())),
    };

    let emails = parse_assignees(assign_to)?;

    Ok(Task {
        id: None,
        title: title.to_string(),
        date: date.to_string(),
        deadline: deadline.to_string(),
        category: category.to_string(),
        description: description.to_string(),
        assigned_users: seed_assignees(&emails),
        queries: Vec::new(),
        created_at: now,
        updated_at: now,
    })
}

/// Builds the `$set` document for an edit. A new assignee list is reconciled
/// against `current`; other provided fields overwrite.
pub fn build_task_update(
    current: &Task,
    request: &UpdateTaskRequest,
    now: DateTime<Utc>,
) -> Result<Document, AppError> {
    let mut set = Document::new();

    let text_fields = [
        ("title", &request.title),
        ("date", &request.date),
        ("deadline", &request.deadline),
        ("category", &request.category),
        ("description", &request.description),
    ];
    for (key, value) in text_fields {
        if let Some(value) = value {
            set.insert(key, value.as_str());
        }
    }

    if let Some(assign_to) = request.assign_to.as_ref().filter(|value| !value.is_null()) {
        let emails = parse_assignees(assign_to)?;
        let assigned = reconcile_assignees(&current.assigned_users, &emails);
        set.insert("assignedUsers", to_bson(&assigned)?);
    }

    set.insert("updatedAt", to_bson(&now)?);
    Ok(set)
}

async fn find_tasks(db: &MongoDB, filter: Document) -> Result<Vec<Task>, AppError> {
    // Mais recentes primeiro (o ObjectId carrega o instante de criação)
    let tasks: Vec<Task> = db
        .collection::<Task>(TASKS)
        .find(filter)
        .sort(doc! { "_id": -1 })
        .await?
        .try_collect()
        .await?;
    Ok(tasks)
}

pub async fn create_task(db: &MongoDB, request: &CreateTaskRequest) -> Result<Task, AppError> {
    let mut task = build_task(request, Utc::now())?;

    let inserted = db.collection::<Task>(TASKS).insert_one(&task).await?;
    task.id = inserted.inserted_id.as_object_id();

    log::info!(
        "✅ Task created: {} ({} assignees)",
        task.title,
        task.assigned_users.len()
    );
    Ok(task)
}

pub async fn list_tasks(db: &MongoDB) -> Result<Vec<Task>, AppError> {
    find_tasks(db, doc! {}).await
}

pub async fn get_task(db: &MongoDB, task_id: &str) -> Result<Task, AppError> {
    let object_id = parse_task_id(task_id)?;

    db.collection::<Task>(TASKS)
        .find_one(doc! { "_id": object_id })
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".to_string()))
}

pub async fn tasks_for_user(db: &MongoDB, email: &str) -> Result<Vec<Task>, AppError> {
    find_tasks(db, doc! { "assignedUsers.email": email }).await
}

/// Summaries of `email`'s tasks whose status is `status`, or that the user
/// has seen when `status` is "Seen".
pub async fn user_tasks_by_status(
    db: &MongoDB,
    email: &str,
    status: &str,
) -> Result<Vec<UserTaskSummary>, AppError> {
    let wanted = if status == SEEN_FILTER {
        None
    } else {
        Some(
            TaskStatus::parse(status)
                .ok_or_else(|| AppError::Validation("Invalid status value".to_string()))?,
        )
    };

    let tasks = tasks_for_user(db, email).await?;

    Ok(tasks
        .into_iter()
        .filter_map(|task| {
            let entry = task.assignee(email)?.clone();
            let keep = match wanted {
                Some(status) => entry.status == status,
                None => entry.seen,
            };
            keep.then(|| UserTaskSummary {
                id: task.id.map(|id| id.to_hex()).unwrap_or_default(),
                title: task.title,
                description: task.description,
                deadline: task.deadline,
                user_status: entry.status,
                seen: entry.seen,
                seen_at: entry.seen_at,
                completed_at: entry.completed_at,
            })
        })
        .collect())
}

pub async fn update_task(
    db: &MongoDB,
    task_id: &str,
    request: &UpdateTaskRequest,
) -> Result<Task, AppError> {
    let current = get_task(db, task_id).await?;
    let set = build_task_update(&current, request, Utc::now())?;

    let updated = db
        .collection::<Task>(TASKS)
        .find_one_and_update(doc! { "_id": current.id }, doc! { "$set": set })
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".to_string()))?;

    log::info!("✅ Task updated: {}", task_id);
    Ok(updated)
}

/// Updates one assignee's entry. Only that entry is written, so concurrent
/// updates for other assignees of the same task are preserved.
pub async fn update_task_status(
    db: &MongoDB,
    task_id: &str,
    request: &UpdateStatusRequest,
) -> Result<Task, AppError> {
    let email = required(&request.email)
        .ok_or_else(|| AppError::Validation("Email is required".to_string()))?;
    let status = request
        .status
        .as_deref()
        .and_then(TaskStatus::parse)
        .ok_or_else(|| AppError::Validation("Invalid status value".to_string()))?;

    let mut task = get_task(db, task_id).await?;

    let now = Utc::now();
    let entry = task
        .assignee_mut(email)
        .ok_or_else(|| AppError::NotFound("User not assigned to this task".to_string()))?;
    entry.apply_status(status, request.seen, request.submission.clone(), now);

    let update = doc! {
        "$set": {
            "assignedUsers.$": to_bson(&*entry)?,
            "updatedAt": to_bson(&now)?,
        }
    };

    let updated = db
        .collection::<Task>(TASKS)
        .find_one_and_update(doc! { "_id": task.id, "assignedUsers.email": email }, update)
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::NotFound("User not assigned to this task".to_string()))?;

    log::info!("✅ Status updated: task {} / {} -> {}", task_id, email, status.as_str());
    Ok(updated)
}

pub async fn delete_task(db: &MongoDB, task_id: &str) -> Result<(), AppError> {
    let object_id = parse_task_id(task_id)?;

    let result = db
        .collection::<Task>(TASKS)
        .delete_one(doc! { "_id": object_id })
        .await?;

    if result.deleted_count == 0 {
        return Err(AppError::NotFound("Task not found".to_string()));
    }

    log::info!("🗑️ Task deleted: {}", task_id);
    Ok(())
}

pub async fn add_query(
    db: &MongoDB,
    task_id: &str,
    request: &AddQueryRequest,
) -> Result<Vec<Query>, AppError> {
    let object_id = parse_task_id(task_id)?;

    let (user, message) = match (required(&request.user), required(&request.message)) {
        (Some(user), Some(message)) => (user, message),
        _ => return Err(AppError::Validation("User and message are required".to_string())),
    };

    let query = Query::new(user, message, Utc::now());

    let task = db
        .collection::<Task>(TASKS)
        .find_one_and_update(
            doc! { "_id": object_id },
            doc! { "$push": { "queries": to_bson(&query)? } },
        )
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".to_string()))?;

    Ok(task.queries)
}

/// Removes a query by id. With `author` set, someone else's query is refused.
pub async fn delete_query(
    db: &MongoDB,
    task_id: &str,
    query_id: &str,
    author: Option<&str>,
) -> Result<Vec<Query>, AppError> {
    let object_id = parse_task_id(task_id)?;

    let mut matcher = doc! { "id": query_id };
    if let Some(author) = author {
        let task = get_task(db, task_id).await?;
        if task.queries.iter().any(|query| query.id == query_id && query.user != author) {
            return Err(AppError::Forbidden(
                "You can only delete your own queries".to_string(),
            ));
        }
        matcher.insert("user", author);
    }

    let task = db
        .collection::<Task>(TASKS)
        .find_one_and_update(
            doc! { "_id": object_id },
            doc! { "$pull": { "queries": matcher } },
        )
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".to_string()))?;

    Ok(task.queries)
}
