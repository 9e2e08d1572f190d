use actix_web::{web, HttpResponse, ResponseError};

use crate::database::MongoDB;
use crate::middleware::auth::{require_role, Claims};
use crate::models::{EmployeeInfo, MentorRosterRequest, Role};
use crate::services::user_service;

#[utoipa::path(
    get,
    path = "/api/users/employees",
    tag = "Users",
    responses(
        (status = 200, description = "Every account with role user", body = [EmployeeInfo]),
        (status = 403, description = "Caller is neither admin nor mentor")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_employees(user: web::ReqData<Claims>, db: web::Data<MongoDB>) -> HttpResponse {
    log::info!("👥 GET /users/employees - by {}", user.email);

    let result = match require_role(&user, &[Role::Admin, Role::Mentor]) {
        Ok(()) => user_service::list_employees(&db).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(employees) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "total": employees.len(),
            "employees": employees
        })),
        Err(e) => {
            log::warn!("❌ Failed to list employees: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    put,
    path = "/api/users/mentors/{email}/roster",
    tag = "Users",
    params(("email" = String, Path, description = "Mentor email")),
    request_body = MentorRosterRequest,
    responses(
        (status = 200, description = "Roster replaced"),
        (status = 400, description = "emails missing or target is not a mentor"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Mentor not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn set_mentor_roster(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
    request: web::Json<MentorRosterRequest>,
) -> HttpResponse {
    log::info!("👥 PUT /users/mentors/{}/roster - by {}", path, user.email);

    let result = match require_role(&user, &[Role::Admin]) {
        Ok(()) => user_service::set_mentor_roster(&db, &path, &request).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(roster) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "mentor": path.as_str(),
            "assignedUsers": roster
        })),
        Err(e) => {
            log::warn!("❌ Failed to update roster for {}: {}", path, e);
            e.error_response()
        }
    }
}
