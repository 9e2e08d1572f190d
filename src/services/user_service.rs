use crate::{
    database::{MongoDB, USERS},
    models::{EmployeeInfo, MentorRosterRequest, Role, User},
    utils::error::AppError,
};
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::ReturnDocument;
use std::collections::HashSet;

pub async fn list_employees(db: &MongoDB) -> Result<Vec<EmployeeInfo>, AppError> {
    let users: Vec<User> = db
        .collection::<User>(USERS)
        .find(doc! { "role": Role::User.as_str() })
        .await?
        .try_collect()
        .await?;

    Ok(users.into_iter().map(EmployeeInfo::from).collect())
}

/// Trims, drops blanks and removes duplicates, keeping first occurrences.
pub fn normalize_roster(emails: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    emails
        .iter()
        .map(|email| email.trim())
        .filter(|email| !email.is_empty() && seen.insert(*email))
        .map(str::to_string)
        .collect()
}

/// Replaces a mentor's roster
pub async fn set_mentor_roster(
    db: &MongoDB,
    mentor_email: &str,
    request: &MentorRosterRequest,
) -> Result<Vec<String>, AppError> {
    let emails = request
        .emails
        .as_deref()
        .map(normalize_roster)
        .ok_or_else(|| AppError::Validation("emails must be an array".to_string()))?;

    let collection = db.collection::<User>(USERS);
    let mentor = collection
        .find_one(doc! { "email": mentor_email })
        .await?
        .ok_or_else(|| AppError::NotFound("Mentor not found".to_string()))?;

    if mentor.role != Role::Mentor {
        return Err(AppError::Validation(format!(
            "{} is not a mentor",
            mentor_email
        )));
    }

    let updated = collection
        .find_one_and_update(
            doc! { "email": mentor_email },
            doc! { "$set": { "assignedUsers": emails.clone() } },
        )
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::NotFound("Mentor not found".to_string()))?;

    log::info!("✅ Roster updated: {} ({} users)", mentor_email, emails.len());
    Ok(updated.assigned_users)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roster_is_trimmed_and_deduplicated() {
        let input = vec![
            " a@x.com".to_string(),
            "b@x.com".to_string(),
            "".to_string(),
            "a@x.com ".to_string(),
        ];
        assert_eq!(normalize_roster(&input), vec!["a@x.com", "b@x.com"]);
    }
}
