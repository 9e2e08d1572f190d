use actix_web::{web, HttpResponse, ResponseError};
use crate::{config::Config, database::MongoDB, models::Role, services::auth_service, services::Mailer};
use crate::services::auth_service::{
    LoginRequest, LoginResponse, MessageResponse, RegisterRequest, ResetPasswordRequest,
    SendOtpRequest, VerifyOtpRequest,
};
use crate::utils::error::AppError;

fn role_from_path(role: &str) -> Result<Role, AppError> {
    Role::parse(role).ok_or_else(|| AppError::NotFound(format!("Unknown role: {}", role)))
}

#[utoipa::path(
    post,
    path = "/api/auth/register-{role}/send-otp",
    tag = "Auth",
    params(("role" = String, Path, description = "user, admin or mentor")),
    request_body = SendOtpRequest,
    responses(
        (status = 200, description = "OTP sent to email", body = MessageResponse),
        (status = 400, description = "Email missing or already in use"),
        (status = 500, description = "Mailer not configured or delivery failed")
    )
)]
pub async fn send_registration_otp(
    db: web::Data<MongoDB>,
    mailer: web::Data<Mailer>,
    path: web::Path<String>,
    request: web::Json<SendOtpRequest>,
) -> HttpResponse {
    let email = request.email.as_deref().unwrap_or("N/A");
    log::info!("📨 POST /auth/register-{}/send-otp - email: {}", path, email);

    let result = match role_from_path(&path) {
        Ok(role) => auth_service::request_registration_otp(&db, &mailer, &request, role).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => HttpResponse::Ok().json(MessageResponse::new("OTP sent to email.")),
        Err(e) => {
            log::warn!("❌ Registration OTP failed: {} - {}", email, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/register-{role}/verify-otp",
    tag = "Auth",
    params(("role" = String, Path, description = "user, admin or mentor")),
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "OTP verified", body = MessageResponse),
        (status = 400, description = "OTP expired or invalid"),
        (status = 404, description = "No pending registration")
    )
)]
pub async fn verify_registration_otp(
    db: web::Data<MongoDB>,
    path: web::Path<String>,
    request: web::Json<VerifyOtpRequest>,
) -> HttpResponse {
    let email = request.email.as_deref().unwrap_or("N/A");
    log::info!("🔑 POST /auth/register-{}/verify-otp - email: {}", path, email);

    let result = match role_from_path(&path) {
        Ok(_) => auth_service::verify_registration_otp(&db, &request).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => HttpResponse::Ok().json(MessageResponse::new("OTP verified")),
        Err(e) => {
            log::warn!("❌ Registration OTP rejected: {} - {}", email, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/register-{role}",
    tag = "Auth",
    params(("role" = String, Path, description = "user, admin or mentor")),
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registration successful", body = MessageResponse),
        (status = 400, description = "Missing fields, no pending registration or email in use")
    )
)]
pub async fn register(
    db: web::Data<MongoDB>,
    mailer: web::Data<Mailer>,
    path: web::Path<String>,
    request: web::Json<RegisterRequest>,
) -> HttpResponse {
    let email = request.email.as_deref().unwrap_or("N/A");
    log::info!("📝 POST /auth/register-{} - email: {}", path, email);

    let result = match role_from_path(&path) {
        Ok(role) => auth_service::complete_registration(&db, &mailer, &request, role).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(user) => {
            let label = match user.role {
                Role::User => "User",
                Role::Admin => "Admin",
                Role::Mentor => "Mentor",
            };
            HttpResponse::Created().json(MessageResponse::new(format!(
                "{} registered successfully.",
                label
            )))
        }
        Err(e) => {
            log::warn!("❌ Registration failed: {} - {}", email, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Invalid password"),
        (status = 404, description = "User not found")
    )
)]
pub async fn login(
    db: web::Data<MongoDB>,
    config: web::Data<Config>,
    request: web::Json<LoginRequest>,
) -> HttpResponse {
    let email = request.email.as_deref().unwrap_or("N/A");
    log::info!("🔐 POST /auth/login - email: {}", email);

    match auth_service::login(&db, &config.jwt_secret, &request).await {
        Ok(response) => {
            log::info!("✅ Login successful: {}", email);
            HttpResponse::Ok().json(response)
        }
        Err(e) => {
            log::warn!("❌ Login failed: {} - {}", email, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    tag = "Auth",
    request_body = SendOtpRequest,
    responses(
        (status = 200, description = "OTP sent to email", body = MessageResponse),
        (status = 404, description = "User not found"),
        (status = 500, description = "Mailer not configured or delivery failed")
    )
)]
pub async fn forgot_password(
    db: web::Data<MongoDB>,
    mailer: web::Data<Mailer>,
    request: web::Json<SendOtpRequest>,
) -> HttpResponse {
    let email = request.email.as_deref().unwrap_or("N/A");
    log::info!("🔁 POST /auth/forgot-password - email: {}", email);

    match auth_service::forgot_password(&db, &mailer, &request).await {
        Ok(()) => HttpResponse::Ok().json(MessageResponse::new("OTP sent to email")),
        Err(e) => {
            log::error!("❌ Forgot password failed: {} - {}", email, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/verify-otp",
    tag = "Auth",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "OTP verified", body = MessageResponse),
        (status = 400, description = "OTP missing, expired or invalid"),
        (status = 404, description = "User not found")
    )
)]
pub async fn verify_otp(
    db: web::Data<MongoDB>,
    request: web::Json<VerifyOtpRequest>,
) -> HttpResponse {
    let email = request.email.as_deref().unwrap_or("N/A");
    log::info!("🔑 POST /auth/verify-otp - email: {}", email);

    match auth_service::verify_reset_otp(&db, &request).await {
        Ok(()) => HttpResponse::Ok().json(MessageResponse::new("OTP verified successfully")),
        Err(e) => {
            log::warn!("❌ Reset OTP rejected: {} - {}", email, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    tag = "Auth",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset successful", body = MessageResponse),
        (status = 400, description = "Missing fields or OTP rejected"),
        (status = 404, description = "User not found")
    )
)]
pub async fn reset_password(
    db: web::Data<MongoDB>,
    request: web::Json<ResetPasswordRequest>,
) -> HttpResponse {
    let email = request.email.as_deref().unwrap_or("N/A");
    log::info!("🔒 POST /auth/reset-password - email: {}", email);

    match auth_service::reset_password(&db, &request).await {
        Ok(()) => HttpResponse::Ok().json(MessageResponse::new("Password reset successful")),
        Err(e) => {
            log::warn!("❌ Password reset failed: {} - {}", email, e);
            e.error_response()
        }
    }
}
