pub mod auth_service;
pub mod insight_service;
pub mod mail_service;
pub mod task_service;
pub mod user_service;

pub use mail_service::Mailer;
