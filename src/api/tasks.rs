use actix_web::{web, HttpResponse, ResponseError};
use serde::Deserialize;

use crate::database::MongoDB;
use crate::middleware::auth::{require_role, Claims};
use crate::models::{
    AddQueryRequest, CreateTaskRequest, Role, StatEntry, TaskResponse, UpdateStatusRequest,
    UpdateTaskRequest, UserInsight, UserTaskSummary,
};
use crate::services::{insight_service, task_service};
use crate::utils::{error::AppError, required};

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EmailQuery {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserTasksQuery {
    pub email: Option<String>,
    /// A task status, or "Seen"
    pub status: Option<String>,
}

/// Plain users may only look at their own assignments.
fn ensure_self_or_staff(claims: &Claims, email: &str) -> Result<(), AppError> {
    if claims.role == Role::User && claims.email != email {
        return Err(AppError::Forbidden(
            "You can only access your own tasks".to_string(),
        ));
    }
    Ok(())
}

fn tasks_json(tasks: Vec<crate::models::Task>) -> serde_json::Value {
    let tasks: Vec<TaskResponse> = tasks.into_iter().map(TaskResponse::from).collect();
    serde_json::json!({
        "success": true,
        "total": tasks.len(),
        "tasks": tasks
    })
}

#[utoipa::path(
    post,
    path = "/api/tasks",
    tag = "Tasks",
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created", body = TaskResponse),
        (status = 400, description = "Missing fields or assignTo is not an array"),
        (status = 403, description = "Caller is not an admin")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_task(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    request: web::Json<CreateTaskRequest>,
) -> HttpResponse {
    log::info!("📋 POST /tasks - by {}", user.email);

    let result = match require_role(&user, &[Role::Admin]) {
        Ok(()) => task_service::create_task(&db, &request).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(task) => HttpResponse::Created().json(serde_json::json!({
            "success": true,
            "message": "Task created",
            "task": TaskResponse::from(task)
        })),
        Err(e) => {
            log::warn!("❌ Task creation failed: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/tasks",
    tag = "Tasks",
    responses((status = 200, description = "All tasks, newest first", body = [TaskResponse])),
    security(("bearer_auth" = []))
)]
pub async fn list_tasks(user: web::ReqData<Claims>, db: web::Data<MongoDB>) -> HttpResponse {
    log::info!("📋 GET /tasks - by {}", user.email);

    match task_service::list_tasks(&db).await {
        Ok(tasks) => HttpResponse::Ok().json(tasks_json(tasks)),
        Err(e) => {
            log::error!("❌ Failed to fetch tasks: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/tasks/user",
    tag = "Tasks",
    params(EmailQuery),
    responses(
        (status = 200, description = "Tasks assigned to the email", body = [TaskResponse]),
        (status = 400, description = "Email missing")
    ),
    security(("bearer_auth" = []))
)]
pub async fn tasks_for_user(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    query: web::Query<EmailQuery>,
) -> HttpResponse {
    log::info!("📋 GET /tasks/user - email: {:?}", query.email);

    let result = async {
        let email = required(&query.email)
            .ok_or_else(|| AppError::Validation("Email is required".to_string()))?;
        ensure_self_or_staff(&user, email)?;
        task_service::tasks_for_user(&db, email).await
    }
    .await;

    match result {
        Ok(tasks) => HttpResponse::Ok().json(tasks_json(tasks)),
        Err(e) => {
            log::warn!("❌ Failed to fetch user tasks: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/tasks/user/status",
    tag = "Tasks",
    params(UserTasksQuery),
    responses(
        (status = 200, description = "Filtered task summaries", body = [UserTaskSummary]),
        (status = 400, description = "Email or status missing or invalid")
    ),
    security(("bearer_auth" = []))
)]
pub async fn user_tasks_by_status(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    query: web::Query<UserTasksQuery>,
) -> HttpResponse {
    log::info!(
        "📋 GET /tasks/user/status - email: {:?}, status: {:?}",
        query.email,
        query.status
    );

    let result = async {
        let (email, status) = match (required(&query.email), required(&query.status)) {
            (Some(email), Some(status)) => (email, status),
            _ => {
                return Err(AppError::Validation(
                    "Email and status are required".to_string(),
                ))
            }
        };
        ensure_self_or_staff(&user, email)?;
        task_service::user_tasks_by_status(&db, email, status).await
    }
    .await;

    match result {
        Ok(tasks) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "total": tasks.len(),
            "tasks": tasks
        })),
        Err(e) => {
            log::warn!("❌ Failed to filter user tasks: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/tasks/stats",
    tag = "Insights",
    params(EmailQuery),
    responses((status = 200, description = "Per-status counters", body = [StatEntry])),
    security(("bearer_auth" = []))
)]
pub async fn task_stats(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    query: web::Query<EmailQuery>,
) -> HttpResponse {
    // Defaults to the caller's own stats
    let email = required(&query.email).unwrap_or(&user.email).to_string();
    log::info!("📊 GET /tasks/stats - email: {}", email);

    let result = match ensure_self_or_staff(&user, &email) {
        Ok(()) => insight_service::task_stats(&db, &email).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(stats) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "email": email,
            "stats": stats
        })),
        Err(e) => {
            log::error!("❌ Failed to compute stats: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/tasks/insights",
    tag = "Insights",
    responses(
        (status = 200, description = "Insights for every employee", body = [UserInsight]),
        (status = 403, description = "Caller is not an admin")
    ),
    security(("bearer_auth" = []))
)]
pub async fn user_insights(user: web::ReqData<Claims>, db: web::Data<MongoDB>) -> HttpResponse {
    log::info!("📊 GET /tasks/insights - by {}", user.email);

    let result = match require_role(&user, &[Role::Admin]) {
        Ok(()) => insight_service::user_insights(&db).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(insights) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "insights": insights
        })),
        Err(e) => {
            log::error!("❌ Failed to fetch user insights: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/tasks/insights/mentor",
    tag = "Insights",
    responses(
        (status = 200, description = "Insights for the mentor's roster", body = [UserInsight]),
        (status = 403, description = "Caller is not a mentor")
    ),
    security(("bearer_auth" = []))
)]
pub async fn mentor_insights(user: web::ReqData<Claims>, db: web::Data<MongoDB>) -> HttpResponse {
    log::info!("📊 GET /tasks/insights/mentor - by {}", user.email);

    match insight_service::mentor_insights(&db, &user.email).await {
        Ok(insights) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "insights": insights
        })),
        Err(e) => {
            log::warn!("❌ Failed to fetch mentor insights: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/tasks/{task_id}",
    tag = "Tasks",
    params(("task_id" = String, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task", body = TaskResponse),
        (status = 404, description = "Task not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_task(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> HttpResponse {
    log::info!("📋 GET /tasks/{} - by {}", path, user.email);

    match task_service::get_task(&db, &path).await {
        Ok(task) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "task": TaskResponse::from(task)
        })),
        Err(e) => {
            log::warn!("❌ Failed to fetch task {}: {}", path, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    patch,
    path = "/api/tasks/{task_id}",
    tag = "Tasks",
    params(("task_id" = String, Path, description = "Task id")),
    request_body = UpdateTaskRequest,
    responses(
        (status = 200, description = "Updated task", body = TaskResponse),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Task not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_task(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
    request: web::Json<UpdateTaskRequest>,
) -> HttpResponse {
    log::info!("✏️ PATCH /tasks/{} - by {}", path, user.email);

    let result = match require_role(&user, &[Role::Admin]) {
        Ok(()) => task_service::update_task(&db, &path, &request).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(task) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "task": TaskResponse::from(task)
        })),
        Err(e) => {
            log::warn!("❌ Failed to update task {}: {}", path, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    patch,
    path = "/api/tasks/{task_id}/status",
    tag = "Tasks",
    params(("task_id" = String, Path, description = "Task id")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Updated task", body = TaskResponse),
        (status = 400, description = "Invalid status value"),
        (status = 404, description = "Task not found or user not assigned")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_task_status(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
    request: web::Json<UpdateStatusRequest>,
) -> HttpResponse {
    log::info!(
        "🔄 PATCH /tasks/{}/status - email: {:?}, status: {:?}",
        path,
        request.email,
        request.status
    );

    let result = async {
        let email = required(&request.email)
            .ok_or_else(|| AppError::Validation("Email is required".to_string()))?;
        ensure_self_or_staff(&user, email)?;
        task_service::update_task_status(&db, &path, &request).await
    }
    .await;

    match result {
        Ok(task) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "task": TaskResponse::from(task)
        })),
        Err(e) => {
            log::warn!("❌ Failed to update status on {}: {}", path, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    delete,
    path = "/api/tasks/{task_id}",
    tag = "Tasks",
    params(("task_id" = String, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task deleted"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Task not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_task(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> HttpResponse {
    log::info!("🗑️ DELETE /tasks/{} - by {}", path, user.email);

    let result = match require_role(&user, &[Role::Admin]) {
        Ok(()) => task_service::delete_task(&db, &path).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "Task deleted successfully"
        })),
        Err(e) => {
            log::warn!("❌ Failed to delete task {}: {}", path, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/tasks/{task_id}/queries",
    tag = "Queries",
    params(("task_id" = String, Path, description = "Task id")),
    request_body = AddQueryRequest,
    responses(
        (status = 201, description = "Query list after the append", body = [crate::models::Query]),
        (status = 403, description = "Plain user posting as someone else"),
        (status = 404, description = "Task not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn add_query(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
    request: web::Json<AddQueryRequest>,
) -> HttpResponse {
    log::info!("💬 POST /tasks/{}/queries - by {}", path, user.email);

    // Plain users post under their own name only
    let result = match required(&request.user) {
        Some(author) if user.role == Role::User && author != user.email => Err(
            AppError::Forbidden("You can only post queries as yourself".to_string()),
        ),
        _ => task_service::add_query(&db, &path, &request).await,
    };

    match result {
        Ok(queries) => HttpResponse::Created().json(serde_json::json!({
            "success": true,
            "queries": queries
        })),
        Err(e) => {
            log::warn!("❌ Failed to add query to {}: {}", path, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    delete,
    path = "/api/tasks/{task_id}/queries/{query_id}",
    tag = "Queries",
    params(
        ("task_id" = String, Path, description = "Task id"),
        ("query_id" = String, Path, description = "Query id")
    ),
    responses(
        (status = 200, description = "Query list after the removal", body = [crate::models::Query]),
        (status = 403, description = "Plain user deleting someone else's query"),
        (status = 404, description = "Task not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_query(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<(String, String)>,
) -> HttpResponse {
    let (task_id, query_id) = path.into_inner();
    log::info!("💬 DELETE /tasks/{}/queries/{} - by {}", task_id, query_id, user.email);

    let author = (user.role == Role::User).then_some(user.email.as_str());

    match task_service::delete_query(&db, &task_id, &query_id, author).await {
        Ok(queries) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "queries": queries
        })),
        Err(e) => {
            log::warn!("❌ Failed to delete query {} on {}: {}", query_id, task_id, e);
            e.error_response()
        }
    }
}
