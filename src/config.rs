use std::env;

const DEFAULT_ORIGINS: &str =
    "https://duty-deck.vercel.app,http://localhost:5173,https://techspotinfotech.com";

/// Outbound mail settings. Only present when a sender and a credential are set.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub from: String,
    pub credential: String,
    pub smtp_host: String,
    pub smtp_port: u16,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub mongo_uri: String,
    pub database_name: String,
    pub jwt_secret: String,
    pub allowed_origins: Vec<String>,
    pub mail: Option<MailConfig>,
}

impl Config {
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(5000);

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| DEFAULT_ORIGINS.to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port,
            mongo_uri: env::var("MONGO_URI").expect("MONGO_URI must be set"),
            database_name: env::var("DATABASE_NAME").unwrap_or_else(|_| "dutydeck".to_string()),
            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| "myjwtsecret".to_string()),
            allowed_origins,
            mail: MailConfig::from_env(),
        }
    }
}

impl MailConfig {
    fn from_env() -> Option<Self> {
        let from = env::var("EMAIL").ok().filter(|v| !v.is_empty())?;
        let credential = ["EMAIL_PASSWORD", "SMTP_PASSWORD", "MAILER_PASS"]
            .iter()
            .find_map(|key| env::var(key).ok().filter(|v| !v.is_empty()))?;
        let smtp_host = env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".to_string());
        let smtp_port = env::var("SMTP_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(465);

        Some(Self {
            from,
            credential,
            smtp_host,
            smtp_port,
        })
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            mongo_uri: "mongodb://127.0.0.1:27017".to_string(),
            database_name: "dutydeck_test".to_string(),
            jwt_secret: "test-secret".to_string(),
            allowed_origins: vec!["http://localhost:5173".to_string()],
            mail: None,
        }
    }
}
