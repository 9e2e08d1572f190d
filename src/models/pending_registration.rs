use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Role;

/// An in-progress sign-up, keyed by email.
///
/// Lives in its own collection so that an unfinished registration can never
/// be mistaken for an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRegistration {
    pub email: String,
    /// Role requested when the code was issued
    pub role: Role,
    pub otp: String,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
