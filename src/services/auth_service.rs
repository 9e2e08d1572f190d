use crate::{
    database::{MongoDB, PENDING_REGISTRATIONS, USERS},
    models::{PendingRegistration, Role, User},
    services::mail_service::Mailer,
    utils::{
        error::AppError,
        otp::{check_otp, generate_otp, otp_expiry},
        required, OtpInput,
    },
};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::{doc, to_bson};
use serde::{Deserialize, Serialize};

const TOKEN_TTL_HOURS: i64 = 24;

// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // user id (hex ObjectId)
    pub email: String,
    pub role: Role,
    pub iat: usize,
    pub exp: usize,
}

// Request/Response structures
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SendOtpRequest {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct VerifyOtpRequest {
    pub email: Option<String>,
    pub otp: Option<OtpInput>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
    pub organization: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: Option<String>,
    pub otp: Option<OtpInput>,
    pub new_password: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub role: Role,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        MessageResponse {
            success: true,
            message: message.into(),
        }
    }
}

// Generate JWT token
pub fn generate_jwt(user: &User, secret: &str) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id.map(|id| id.to_hex()).unwrap_or_default(),
        email: user.email.clone(),
        role: user.role,
        iat: now.timestamp() as usize,
        exp: (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp() as usize,
    };

    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?)
}

// Verify JWT token
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
}

async fn find_user(db: &MongoDB, email: &str) -> Result<Option<User>, AppError> {
    Ok(db.collection::<User>(USERS).find_one(doc! { "email": email }).await?)
}

fn otp_text(otp: &Option<OtpInput>) -> Option<String> {
    otp.clone()
        .map(OtpInput::into_text)
        .filter(|text| !text.trim().is_empty())
}

// ==================== REGISTRATION ====================

/// Issues a registration code for `email`, reusing any earlier pending
/// registration for the same address.
pub async fn request_registration_otp(
    db: &MongoDB,
    mailer: &Mailer,
    request: &SendOtpRequest,
    role: Role,
) -> Result<(), AppError> {
    let email = required(&request.email)
        .ok_or_else(|| AppError::Validation("Email is required".to_string()))?;

    mailer.ensure_configured()?;

    if find_user(db, email).await?.is_some() {
        return Err(AppError::Conflict("Email already in use.".to_string()));
    }

    let now = Utc::now();
    let pending = PendingRegistration {
        email: email.to_string(),
        role,
        otp: generate_otp(),
        expires_at: otp_expiry(now),
        verified_at: None,
        created_at: now,
    };

    db.collection::<PendingRegistration>(PENDING_REGISTRATIONS)
        .replace_one(doc! { "email": email }, &pending)
        .upsert(true)
        .await?;

    mailer.send_registration_otp(email, &pending.otp).await?;

    log::info!("✅ Registration OTP issued: {} ({})", email, role);
    Ok(())
}

pub async fn verify_registration_otp(
    db: &MongoDB,
    request: &VerifyOtpRequest,
) -> Result<(), AppError> {
    let (email, otp) = match (required(&request.email), otp_text(&request.otp)) {
        (Some(email), Some(otp)) => (email, otp),
        _ => return Err(AppError::Validation("Email and OTP are required".to_string())),
    };

    let collection = db.collection::<PendingRegistration>(PENDING_REGISTRATIONS);
    let pending = collection
        .find_one(doc! { "email": email })
        .await?
        .ok_or_else(|| {
            AppError::NotFound("No pending registration for this email".to_string())
        })?;

    check_otp(&pending.otp, pending.expires_at, &otp, Utc::now())?;

    collection
        .update_one(
            doc! { "email": email },
            doc! { "$set": { "verifiedAt": to_bson(&Utc::now())? } },
        )
        .await?;

    Ok(())
}

/// A pending registration completes only once its code was verified, and
/// only for the role the code was issued for.
fn check_pending(pending: &PendingRegistration, role: Role) -> Result<(), AppError> {
    if pending.verified_at.is_none() {
        return Err(AppError::Conflict("OTP verification required.".to_string()));
    }
    if pending.role != role {
        log::warn!(
            "⚠️ {} verified a {} code but tried to register as {}",
            pending.email,
            pending.role,
            role
        );
        return Err(AppError::Conflict(format!(
            "OTP was issued for a {} account.",
            pending.role
        )));
    }
    Ok(())
}

/// Turns a verified pending registration into an account with `role`.
pub async fn complete_registration(
    db: &MongoDB,
    mailer: &Mailer,
    request: &RegisterRequest,
    role: Role,
) -> Result<User, AppError> {
    let fields = (
        required(&request.email),
        required(&request.name),
        request.password.as_deref().filter(|p| !p.is_empty()),
        required(&request.organization),
    );
    let (email, name, password, organization) = match fields {
        (Some(email), Some(name), Some(password), Some(organization)) => {
            (email, name, password, organization)
        }
        _ => return Err(AppError::Validation("All fields are required.".to_string())),
    };

    let pending_collection = db.collection::<PendingRegistration>(PENDING_REGISTRATIONS);
    let pending = pending_collection
        .find_one(doc! { "email": email })
        .await?
        .ok_or_else(|| {
            AppError::Conflict("OTP verification required or already registered.".to_string())
        })?;

    if find_user(db, email).await?.is_some() {
        return Err(AppError::Conflict("Email already in use.".to_string()));
    }

    check_pending(&pending, role)?;

    let mut user = User {
        id: None,
        name: name.to_string(),
        email: email.to_string(),
        password: hash(password, DEFAULT_COST)?,
        organization: organization.to_string(),
        role,
        reset_password_otp: None,
        reset_password_expires: None,
        assigned_users: Vec::new(),
        created_at: Utc::now(),
    };

    let inserted = db.collection::<User>(USERS).insert_one(&user).await?;
    user.id = inserted.inserted_id.as_object_id();

    pending_collection.delete_one(doc! { "email": email }).await?;

    if let Err(e) = mailer.send_welcome(email, name).await {
        log::warn!("⚠️ Welcome email to {} failed: {}", email, e);
    }

    log::info!("✅ User registered successfully: {} ({})", email, role);
    Ok(user)
}

// ==================== LOGIN ====================

pub async fn login(
    db: &MongoDB,
    jwt_secret: &str,
    request: &LoginRequest,
) -> Result<LoginResponse, AppError> {
    let (email, password) = match (required(&request.email), request.password.as_deref()) {
        (Some(email), Some(password)) if !password.is_empty() => (email, password),
        _ => {
            return Err(AppError::Validation(
                "Email and password are required".to_string(),
            ))
        }
    };

    let user = find_user(db, email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if !verify(password, &user.password)? {
        return Err(AppError::Auth("Invalid password".to_string()));
    }

    Ok(LoginResponse {
        success: true,
        token: generate_jwt(&user, jwt_secret)?,
        role: user.role,
    })
}

// ==================== PASSWORD RESET ====================

pub async fn forgot_password(
    db: &MongoDB,
    mailer: &Mailer,
    request: &SendOtpRequest,
) -> Result<(), AppError> {
    let email = required(&request.email)
        .ok_or_else(|| AppError::Validation("Email is required".to_string()))?;

    mailer.ensure_configured()?;

    if find_user(db, email).await?.is_none() {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let otp = generate_otp();
    db.collection::<User>(USERS)
        .update_one(
            doc! { "email": email },
            doc! { "$set": {
                "resetPasswordOTP": otp.as_str(),
                "resetPasswordExpires": to_bson(&otp_expiry(Utc::now()))?,
            } },
        )
        .await?;

    mailer.send_reset_otp(email, &otp).await?;

    log::info!("✅ Password reset OTP issued: {}", email);
    Ok(())
}

/// Checks the reset code stored on `user`. An expired code is cleared.
async fn check_reset_otp(db: &MongoDB, user: &User, otp: &str) -> Result<(), AppError> {
    let (stored, expires_at) = match (&user.reset_password_otp, user.reset_password_expires) {
        (Some(stored), Some(expires_at)) => (stored, expires_at),
        _ => {
            return Err(AppError::Conflict(
                "No OTP request found for this user".to_string(),
            ))
        }
    };

    let now = Utc::now();
    if now > expires_at {
        clear_reset_otp(db, &user.email).await?;
    }

    check_otp(stored, expires_at, otp, now)
}

async fn clear_reset_otp(db: &MongoDB, email: &str) -> Result<(), AppError> {
    db.collection::<User>(USERS)
        .update_one(
            doc! { "email": email },
            doc! { "$unset": { "resetPasswordOTP": "", "resetPasswordExpires": "" } },
        )
        .await?;
    Ok(())
}

pub async fn verify_reset_otp(db: &MongoDB, request: &VerifyOtpRequest) -> Result<(), AppError> {
    let (email, otp) = match (required(&request.email), otp_text(&request.otp)) {
        (Some(email), Some(otp)) => (email, otp),
        _ => return Err(AppError::Validation("Email and OTP are required".to_string())),
    };

    let user = find_user(db, email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    check_reset_otp(db, &user, &otp).await
}

pub async fn reset_password(
    db: &MongoDB,
    request: &ResetPasswordRequest,
) -> Result<(), AppError> {
    let fields = (
        required(&request.email),
        otp_text(&request.otp),
        request.new_password.as_deref().filter(|p| !p.is_empty()),
    );
    let (email, otp, new_password) = match fields {
        (Some(email), Some(otp), Some(new_password)) => (email, otp, new_password),
        _ => {
            return Err(AppError::Validation(
                "Email, OTP and new password are required".to_string(),
            ))
        }
    };

    let user = find_user(db, email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    check_reset_otp(db, &user, &otp).await?;

    db.collection::<User>(USERS)
        .update_one(
            doc! { "email": email },
            doc! {
                "$set": { "password": hash(new_password, DEFAULT_COST)? },
                "$unset": { "resetPasswordOTP": "", "resetPasswordExpires": "" },
            },
        )
        .await?;

    log::info!("✅ Password reset: {}", email);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::oid::ObjectId;

    fn sample_user(role: Role) -> User {
        User {
            id: Some(ObjectId::new()),
            name: "Ada".to_string(),
            email: "ada@x.com".to_string(),
            password: "hash".to_string(),
            organization: "Acme".to_string(),
            role,
            reset_password_otp: None,
            reset_password_expires: None,
            assigned_users: Vec::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_token_round_trip_carries_id_and_role() {
        let user = sample_user(Role::Admin);
        let token = generate_jwt(&user, "secret").unwrap();

        let claims = verify_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, user.id.unwrap().to_hex());
        assert_eq!(claims.email, "ada@x.com");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp - claims.iat, 24 * 60 * 60);
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let token = generate_jwt(&sample_user(Role::User), "secret").unwrap();
        let err = verify_token(&token, "other").unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    fn pending(role: Role, verified: bool) -> PendingRegistration {
        let now = Utc::now();
        PendingRegistration {
            email: "ada@x.com".to_string(),
            role,
            otp: "482913".to_string(),
            expires_at: otp_expiry(now),
            verified_at: verified.then_some(now),
            created_at: now,
        }
    }

    #[test]
    fn test_unverified_pending_registration_cannot_complete() {
        let err = check_pending(&pending(Role::User, false), Role::User).unwrap_err();
        assert_eq!(err.message(), "OTP verification required.");
    }

    #[test]
    fn test_code_issued_for_one_role_cannot_register_another() {
        let err = check_pending(&pending(Role::User, true), Role::Admin).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert!(check_pending(&pending(Role::Admin, true), Role::Admin).is_ok());
    }

    #[test]
    fn test_otp_text_ignores_blank_input() {
        assert_eq!(otp_text(&Some(OtpInput::Text("  ".to_string()))), None);
        assert_eq!(otp_text(&Some(OtpInput::Number(482913))).as_deref(), Some("482913"));
        assert_eq!(otp_text(&None), None);
    }

    /// Mail goes nowhere: nothing listens on localhost:1.
    fn dead_mailer() -> Mailer {
        Mailer::new(Some(crate::config::MailConfig {
            from: "noreply@dutydeck.app".to_string(),
            credential: "unused".to_string(),
            smtp_host: "localhost".to_string(),
            smtp_port: 1,
        }))
    }

    fn send_otp(email: &str) -> SendOtpRequest {
        SendOtpRequest {
            email: Some(email.to_string()),
        }
    }

    fn registration(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: Some(email.to_string()),
            name: Some("Ada".to_string()),
            password: Some("s3cret".to_string()),
            organization: Some("Acme".to_string()),
        }
    }

    async fn pending_count(db: &MongoDB, email: &str) -> u64 {
        db.collection::<PendingRegistration>(PENDING_REGISTRATIONS)
            .count_documents(doc! { "email": email })
            .await
            .unwrap()
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_registration_reuses_pending_and_conflicts_once_registered() {
        let db = MongoDB::for_tests().await;
        let mailer = dead_mailer();
        let email = "ada@x.com";

        // Delivery fails, but the pending record is written first
        let _ = request_registration_otp(&db, &mailer, &send_otp(email), Role::User).await;
        let _ = request_registration_otp(&db, &mailer, &send_otp(email), Role::User).await;
        assert_eq!(pending_count(&db, email).await, 1);

        let early = complete_registration(&db, &mailer, &registration(email), Role::User).await;
        assert!(matches!(early, Err(AppError::Conflict(_))));

        let stored = db
            .collection::<PendingRegistration>(PENDING_REGISTRATIONS)
            .find_one(doc! { "email": email })
            .await
            .unwrap()
            .unwrap();
        let verify = VerifyOtpRequest {
            email: Some(email.to_string()),
            otp: Some(OtpInput::Text(stored.otp.clone())),
        };
        verify_registration_otp(&db, &verify).await.unwrap();

        let wrong_role = complete_registration(&db, &mailer, &registration(email), Role::Admin).await;
        assert!(matches!(wrong_role, Err(AppError::Conflict(_))));

        let user = complete_registration(&db, &mailer, &registration(email), Role::User)
            .await
            .unwrap();
        assert_eq!(user.role, Role::User);
        assert!(user.id.is_some());
        assert_eq!(pending_count(&db, email).await, 0);

        let again = request_registration_otp(&db, &mailer, &send_otp(email), Role::User).await;
        assert_eq!(again.unwrap_err().message(), "Email already in use.");

        let login_request = LoginRequest {
            email: Some(email.to_string()),
            password: Some("s3cret".to_string()),
        };
        let response = login(&db, "secret", &login_request).await.unwrap();
        assert_eq!(verify_token(&response.token, "secret").unwrap().email, email);

        db.drop_for_tests().await;
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_expired_reset_otp_is_cleared() {
        let db = MongoDB::for_tests().await;
        let mut user = sample_user(Role::User);
        user.id = None;
        user.reset_password_otp = Some("482913".to_string());
        user.reset_password_expires = Some(Utc::now() - Duration::minutes(1));
        db.collection::<User>(USERS).insert_one(&user).await.unwrap();

        let request = VerifyOtpRequest {
            email: Some(user.email.clone()),
            otp: Some(OtpInput::Number(482913)),
        };
        let err = verify_reset_otp(&db, &request).await.unwrap_err();
        assert_eq!(err.message(), "OTP expired. Please request a new one.");

        let stored = find_user(&db, &user.email).await.unwrap().unwrap();
        assert!(stored.reset_password_otp.is_none());
        assert!(stored.reset_password_expires.is_none());

        db.drop_for_tests().await;
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_reset_password_replaces_hash_and_clears_otp() {
        let db = MongoDB::for_tests().await;
        let mut user = sample_user(Role::User);
        user.id = None;
        user.password = hash("old-password", DEFAULT_COST).unwrap();
        user.reset_password_otp = Some("482913".to_string());
        user.reset_password_expires = Some(otp_expiry(Utc::now()));
        db.collection::<User>(USERS).insert_one(&user).await.unwrap();

        let request = ResetPasswordRequest {
            email: Some(user.email.clone()),
            otp: Some(OtpInput::Text("482913".to_string())),
            new_password: Some("new-password".to_string()),
        };
        reset_password(&db, &request).await.unwrap();

        let stored = find_user(&db, &user.email).await.unwrap().unwrap();
        assert!(verify("new-password", &stored.password).unwrap());
        assert!(stored.reset_password_otp.is_none());

        db.drop_for_tests().await;
    }
}
