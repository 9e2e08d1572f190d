use actix_web::web;
use chrono::Utc;
use mongodb::{bson::oid::ObjectId, Client};

use crate::config::Config;
use crate::database::MongoDB;
use crate::models::{Role, User};
use crate::services::{auth_service::generate_jwt, Mailer};

/// A handle whose server never answers; routes under test must fail before
/// touching it.
pub async fn unreachable_db() -> MongoDB {
    let client = Client::with_uri_str("mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=200")
        .await
        .unwrap();
    MongoDB::from_client(client, "dutydeck_test")
}

pub fn test_app(db: MongoDB) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg: &mut web::ServiceConfig| {
        cfg.app_data(web::Data::new(db))
            .app_data(web::Data::new(Config::for_tests()))
            .app_data(web::Data::new(Mailer::new(None)))
            .app_data(super::json_config())
            .app_data(super::query_config())
            .configure(super::configure)
            .default_service(web::route().to(super::not_found));
    }
}

/// `Authorization` header for a token signed with the test secret
pub fn bearer(role: Role, email: &str) -> (&'static str, String) {
    let user = User {
        id: Some(ObjectId::new()),
        name: "Tester".to_string(),
        email: email.to_string(),
        password: "hash".to_string(),
        organization: "Acme".to_string(),
        role,
        reset_password_otp: None,
        reset_password_expires: None,
        assigned_users: Vec::new(),
        created_at: Utc::now(),
    };
    let token = generate_jwt(&user, &Config::for_tests().jwt_secret).unwrap();
    ("Authorization", format!("Bearer {}", token))
}
