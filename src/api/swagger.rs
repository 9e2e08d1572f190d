use utoipa::OpenApi;
use utoipa::openapi::security::{SecurityScheme, HttpAuthScheme, HttpBuilder};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "DutyDeck Service API",
        version = "1.0.0",
        description = "Task assignment and tracking API.\n\n**Authentication:** everything under `/api/tasks` and `/api/users` requires a JWT Bearer token obtained from `/api/auth/login`.\n\n**Roles:** `user` (employee), `mentor`, `admin`."
    ),
    paths(
        // Auth
        crate::api::auth::send_registration_otp,
        crate::api::auth::verify_registration_otp,
        crate::api::auth::register,
        crate::api::auth::login,
        crate::api::auth::forgot_password,
        crate::api::auth::verify_otp,
        crate::api::auth::reset_password,

        // Tasks
        crate::api::tasks::create_task,
        crate::api::tasks::list_tasks,
        crate::api::tasks::tasks_for_user,
        crate::api::tasks::user_tasks_by_status,
        crate::api::tasks::get_task,
        crate::api::tasks::update_task,
        crate::api::tasks::update_task_status,
        crate::api::tasks::delete_task,
        crate::api::tasks::add_query,
        crate::api::tasks::delete_query,

        // Insights
        crate::api::tasks::task_stats,
        crate::api::tasks::user_insights,
        crate::api::tasks::mentor_insights,

        // Users
        crate::api::users::list_employees,
        crate::api::users::set_mentor_roster,

        crate::api::health::health_check,
    ),
    components(
        schemas(
            crate::services::auth_service::SendOtpRequest,
            crate::services::auth_service::VerifyOtpRequest,
            crate::services::auth_service::RegisterRequest,
            crate::services::auth_service::LoginRequest,
            crate::services::auth_service::ResetPasswordRequest,
            crate::services::auth_service::LoginResponse,
            crate::services::auth_service::MessageResponse,
            crate::utils::validation::OtpInput,

            crate::models::Role,
            crate::models::TaskStatus,
            crate::models::AssignedUser,
            crate::models::Query,
            crate::models::CreateTaskRequest,
            crate::models::UpdateTaskRequest,
            crate::models::UpdateStatusRequest,
            crate::models::AddQueryRequest,
            crate::models::TaskResponse,
            crate::models::UserTaskSummary,
            crate::models::UserInsight,
            crate::models::StatEntry,
            crate::models::EmployeeInfo,
            crate::models::MentorRosterRequest,

            crate::api::health::HealthResponse,
        )
    ),
    tags(
        (name = "Auth", description = "OTP-backed registration, login and password reset."),
        (name = "Tasks", description = "Task CRUD and per-assignee status."),
        (name = "Queries", description = "Clarification threads attached to a task."),
        (name = "Insights", description = "Per-status counters and per-employee progress."),
        (name = "Users", description = "Employee directory and mentor rosters."),
        (name = "Health", description = "Liveness probe."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Token returned by /api/auth/login"))
                        .build()
                ),
            );
        }
    }
}
