pub mod auth;
pub mod health;
pub mod swagger;
pub mod tasks;
pub mod users;

#[cfg(test)]
pub mod test_support;

use actix_web::{error, web, HttpRequest, HttpResponse, ResponseError};

use crate::middleware::auth::AuthMiddleware;
use crate::utils::error::AppError;

/// Registers every `/api` route. Static task paths go before `/{task_id}`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/auth")
            .route("/login", web::post().to(auth::login))
            .route("/forgot-password", web::post().to(auth::forgot_password))
            .route("/verify-otp", web::post().to(auth::verify_otp))
            .route("/reset-password", web::post().to(auth::reset_password))
            .route("/register-{role}/send-otp", web::post().to(auth::send_registration_otp))
            .route("/register-{role}/verify-otp", web::post().to(auth::verify_registration_otp))
            .route("/register-{role}", web::post().to(auth::register)),
    )
    .service(
        web::scope("/api/tasks")
            .wrap(AuthMiddleware)
            .route("", web::post().to(tasks::create_task))
            .route("", web::get().to(tasks::list_tasks))
            .route("/user", web::get().to(tasks::tasks_for_user))
            .route("/user/status", web::get().to(tasks::user_tasks_by_status))
            .route("/stats", web::get().to(tasks::task_stats))
            .route("/insights", web::get().to(tasks::user_insights))
            .route("/insights/mentor", web::get().to(tasks::mentor_insights))
            .route("/{task_id}", web::get().to(tasks::get_task))
            .route("/{task_id}", web::patch().to(tasks::update_task))
            .route("/{task_id}", web::delete().to(tasks::delete_task))
            .route("/{task_id}/status", web::patch().to(tasks::update_task_status))
            .route("/{task_id}/queries", web::post().to(tasks::add_query))
            .route("/{task_id}/queries/{query_id}", web::delete().to(tasks::delete_query)),
    )
    .service(
        web::scope("/api/users")
            .wrap(AuthMiddleware)
            .route("/employees", web::get().to(users::list_employees))
            .route("/mentors/{email}/roster", web::put().to(users::set_mentor_roster)),
    );
}

/// Malformed bodies answer with the usual error envelope
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let message = format!("Invalid request body: {}", err);
        error::InternalError::from_response(err, AppError::Validation(message).error_response())
            .into()
    })
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        let message = format!("Invalid query string: {}", err);
        error::InternalError::from_response(err, AppError::Validation(message).error_response())
            .into()
    })
}

pub async fn not_found(req: HttpRequest) -> HttpResponse {
    log::warn!("🚫 {} {} - no such route", req.method(), req.path());
    AppError::NotFound(format!("Route {} not found", req.path())).error_response()
}
