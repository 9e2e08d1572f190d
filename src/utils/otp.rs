use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::utils::error::AppError;

/// How long an issued code stays valid.
pub const OTP_TTL_MINUTES: i64 = 10;

/// Generates a 6-digit numeric code in `100000..=999999`.
///
/// Entropy comes from a v4 UUID (122 random bits), so the modulo bias is
/// negligible.
pub fn generate_otp() -> String {
    let random = Uuid::new_v4().as_u128();
    (100_000 + (random % 900_000)).to_string()
}

pub fn otp_expiry(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::minutes(OTP_TTL_MINUTES)
}

/// Checks a submitted code against the stored one.
///
/// Expiry is checked first, so an expired code is rejected even if it
/// matches.
pub fn check_otp(
    stored: &str,
    expires_at: DateTime<Utc>,
    submitted: &str,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    if now > expires_at {
        return Err(AppError::Conflict(
            "OTP expired. Please request a new one.".to_string(),
        ));
    }

    if stored.trim().to_lowercase() != submitted.trim().to_lowercase() {
        return Err(AppError::Conflict("Invalid OTP".to_string()));
    }

    Ok(())
}
