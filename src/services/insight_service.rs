use crate::{
    database::{MongoDB, USERS},
    models::{task_stats as count_by_status, Role, StatEntry, User, UserInsight},
    services::task_service::tasks_for_user,
    utils::error::AppError,
};
use futures::{future::try_join_all, TryStreamExt};
use mongodb::bson::{doc, Document};

pub async fn task_stats(db: &MongoDB, email: &str) -> Result<Vec<StatEntry>, AppError> {
    let tasks = tasks_for_user(db, email).await?;
    Ok(count_by_status(email, &tasks))
}

async fn insights_for(db: &MongoDB, filter: Document) -> Result<Vec<UserInsight>, AppError> {
    let users: Vec<User> = db
        .collection::<User>(USERS)
        .find(filter)
        .await?
        .try_collect()
        .await?;

    try_join_all(users.iter().map(|user| async move {
        let tasks = tasks_for_user(db, &user.email).await?;
        Ok::<_, AppError>(UserInsight::fold(&user.name, &user.email, &tasks))
    }))
    .await
}

/// Insights for every user-role account
pub async fn user_insights(db: &MongoDB) -> Result<Vec<UserInsight>, AppError> {
    insights_for(db, doc! { "role": Role::User.as_str() }).await
}

/// Insights for the accounts on a mentor's roster
pub async fn mentor_insights(db: &MongoDB, mentor_email: &str) -> Result<Vec<UserInsight>, AppError> {
    let mentor = db
        .collection::<User>(USERS)
        .find_one(doc! { "email": mentor_email })
        .await?
        .filter(|user| user.role == Role::Mentor)
        .ok_or_else(|| AppError::Forbidden("Only mentors can access this resource.".to_string()))?;

    if mentor.assigned_users.is_empty() {
        return Ok(Vec::new());
    }

    insights_for(db, doc! { "email": { "$in": mentor.assigned_users.clone() } }).await
}
