use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage, ResponseError,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};

use crate::config::Config;
use crate::models::Role;
use crate::services::auth_service::verify_token;
use crate::utils::error::AppError;

pub use crate::services::auth_service::Claims;

/// Verifies the bearer token and stores its [`Claims`] in the request
/// extensions for `web::ReqData<Claims>`.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService { service }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        match authenticate(&req) {
            Ok(claims) => {
                req.extensions_mut().insert(claims);

                let fut = self.service.call(req);
                Box::pin(async move {
                    let res = fut.await?;
                    Ok(res.map_into_left_body())
                })
            }
            Err(e) => {
                log::warn!("❌ {} {} rejected: {}", req.method(), req.path(), e);
                let (request, _payload) = req.into_parts();
                let response = e.error_response().map_into_right_body();
                Box::pin(async move { Ok(ServiceResponse::new(request, response)) })
            }
        }
    }
}

fn authenticate(req: &ServiceRequest) -> Result<Claims, AppError> {
    let header = req
        .headers()
        .get("Authorization")
        .ok_or_else(|| AppError::Unauthorized("Missing authorization token".to_string()))?;

    let token = header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Invalid token format".to_string()))?;

    let config = req
        .app_data::<web::Data<Config>>()
        .ok_or_else(|| AppError::Config("Auth configuration missing".to_string()))?;

    verify_token(token, &config.jwt_secret)
}

/// Rejects callers whose role is not in `allowed`.
pub fn require_role(claims: &Claims, allowed: &[Role]) -> Result<(), AppError> {
    if allowed.contains(&claims.role) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Role '{}' cannot access this resource",
            claims.role
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;
    use crate::services::auth_service::generate_jwt;
    use actix_web::{test, App, HttpResponse};
    use chrono::Utc;
    use mongodb::bson::oid::ObjectId;

    async fn whoami(claims: web::ReqData<Claims>) -> HttpResponse {
        HttpResponse::Ok().body(claims.email.clone())
    }

    fn token_for(role: Role, secret: &str) -> String {
        let user = User {
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
        };
        generate_jwt(&user, secret).unwrap()
    }

    #[actix_web::test]
    async fn test_requests_without_token_are_unauthorized() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Config::for_tests()))
                .service(web::scope("/api").wrap(AuthMiddleware).route("/me", web::get().to(whoami))),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/me").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);

        let req = test::TestRequest::get()
            .uri("/api/me")
            .insert_header(("Authorization", "Token abc"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);
    }

    #[actix_web::test]
    async fn test_valid_token_exposes_claims() {
        let config = Config::for_tests();
        let token = token_for(Role::User, &config.jwt_secret);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(config))
                .service(web::scope("/api").wrap(AuthMiddleware).route("/me", web::get().to(whoami))),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/me")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        let body = test::read_body(resp).await;
        assert_eq!(body, "ada@x.com");
    }

    #[actix_web::test]
    async fn test_token_from_other_secret_is_unauthorized() {
        let token = token_for(Role::Admin, "someone-else");
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Config::for_tests()))
                .service(web::scope("/api").wrap(AuthMiddleware).route("/me", web::get().to(whoami))),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/me")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);
    }

    #[::core::prelude::v1::test]
    fn test_require_role() {
        let claims = Claims {
            sub: "id".to_string(),
            email: "ada@x.com".to_string(),
            role: Role::Mentor,
            iat: 0,
            exp: 0,
        };
        assert!(require_role(&claims, &[Role::Admin, Role::Mentor]).is_ok());
        assert!(matches!(
            require_role(&claims, &[Role::Admin]),
            Err(AppError::Forbidden(_))
        ));
    }
}
