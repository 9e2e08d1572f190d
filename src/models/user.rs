use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Account role. Pending registrations are a separate entity, so there is no
/// placeholder role here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
    Mentor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::Mentor => "mentor",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            "mentor" => Some(Role::Mentor),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account document (stored in the `users` collection)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    /// bcrypt hash
    pub password: String,
    pub organization: String,
    pub role: Role,
    #[serde(rename = "resetPasswordOTP", default, skip_serializing_if = "Option::is_none")]
    pub reset_password_otp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_password_expires: Option<DateTime<Utc>>,
    /// Mentor roster (emails). Empty for other roles.
    #[serde(default)]
    pub assigned_users: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Public view of an employee account
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct EmployeeInfo {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub organization: String,
}

impl From<User> for EmployeeInfo {
    fn from(user: User) -> Self {
        EmployeeInfo {
            id: user.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: user.name,
            email: user.email,
            organization: user.organization,
        }
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct MentorRosterRequest {
    pub emails: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_its_name() {
        for role in [Role::User, Role::Admin, Role::Mentor] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("temp"), None);
    }

    #[test]
    fn test_user_document_field_names() {
        let user = User {
            id: None,
            name: "Ada".to_string(),
            email: "ada@x.com".to_string(),
            password: "hash".to_string(),
            organization: "Acme".to_string(),
            role: Role::Mentor,
            reset_password_otp: Some("123456".to_string()),
            reset_password_expires: None,
            assigned_users: vec!["a@x.com".to_string()],
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["role"], "mentor");
        assert_eq!(json["resetPasswordOTP"], "123456");
        assert_eq!(json["assignedUsers"][0], "a@x.com");
        assert!(json.get("_id").is_none());
        assert!(json.get("resetPasswordExpires").is_none());
    }
}
