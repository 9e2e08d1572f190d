use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::MailConfig;
use crate::utils::error::AppError;

type SmtpTransport = AsyncSmtpTransport<Tokio1Executor>;

/// Sends transactional mail over SMTP
#[derive(Clone)]
pub struct Mailer {
    config: Option<MailConfig>,
    transport: Option<SmtpTransport>,
}

impl Mailer {
    pub fn new(config: Option<MailConfig>) -> Self {
        let transport = config.as_ref().and_then(|config| match smtp_transport(config) {
            Ok(transport) => Some(transport),
            Err(e) => {
                log::error!("❌ SMTP setup failed for {}: {}", config.smtp_host, e);
                None
            }
        });

        Self { config, transport }
    }

    fn parts(&self) -> Result<(&MailConfig, &SmtpTransport), AppError> {
        match (&self.config, &self.transport) {
            (Some(config), Some(transport)) => Ok((config, transport)),
            _ => Err(AppError::Config(
                "Email sending unavailable. Server missing env config.".to_string(),
            )),
        }
    }

    /// Fails when sender or credentials are missing.
    pub fn ensure_configured(&self) -> Result<(), AppError> {
        self.parts().map(|_| ())
    }

    async fn send(&self, to: &str, subject: &str, html: String) -> Result<(), AppError> {
        let (config, transport) = self.parts()?;

        let message = build_message(&config.from, to, subject, html)?;
        transport.send(message).await?;

        log::info!("📧 Mail sent: '{}' -> {}", subject, to);
        Ok(())
    }

    pub async fn send_registration_otp(&self, to: &str, otp: &str) -> Result<(), AppError> {
        self.send(to, "Confirm your email address", otp_body("Confirm your email address", otp))
            .await
    }

    pub async fn send_reset_otp(&self, to: &str, otp: &str) -> Result<(), AppError> {
        self.send(to, "Reset Your Password", otp_body("Reset your password", otp))
            .await
    }

    pub async fn send_welcome(&self, to: &str, name: &str) -> Result<(), AppError> {
        let html = format!(
            "<h2>Welcome to DutyDeck, {}!</h2>\
             <p>Your account is ready. Sign in to see the tasks assigned to you.</p>",
            escape_html(name)
        );
        self.send(to, "🎉 Welcome to DutyDeck!", html).await
    }
}

/// Port 465 uses implicit TLS, anything else STARTTLS.
fn smtp_transport(config: &MailConfig) -> Result<SmtpTransport, lettre::transport::smtp::Error> {
    let credentials = Credentials::new(config.from.clone(), config.credential.clone());

    let builder = if config.smtp_port == 465 {
        SmtpTransport::relay(&config.smtp_host)?
    } else {
        SmtpTransport::starttls_relay(&config.smtp_host)?
    };

    Ok(builder.port(config.smtp_port).credentials(credentials).build())
}

fn build_message(from: &str, to: &str, subject: &str, html: String) -> Result<Message, AppError> {
    let message = Message::builder()
        .from(from.parse::<Mailbox>()?)
        .to(to.parse::<Mailbox>()?)
        .subject(subject)
        .header(ContentType::TEXT_HTML)
        .body(html)?;
    Ok(message)
}

fn otp_body(heading: &str, otp: &str) -> String {
    format!(
        "<h2>{}</h2>\
         <p>Your one-time code is:</p>\
         <p style=\"font-size:28px;letter-spacing:6px\"><strong>{}</strong></p>\
         <p>The code expires in 10 minutes.</p>",
        heading, otp
    )
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_mailer_reports_config_error() {
        let mailer = Mailer::new(None);

        let err = mailer.send_welcome("a@x.com", "Ada").await.unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    fn gmail_config() -> MailConfig {
        MailConfig {
            from: "noreply@dutydeck.app".to_string(),
            credential: "app-password".to_string(),
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 465,
        }
    }

    #[tokio::test]
    async fn test_mailer_with_smtp_settings_is_configured() {
        assert!(Mailer::new(Some(gmail_config())).ensure_configured().is_ok());

        let starttls = MailConfig {
            smtp_port: 587,
            ..gmail_config()
        };
        assert!(Mailer::new(Some(starttls)).ensure_configured().is_ok());
    }

    #[test]
    fn test_message_is_html_with_subject() {
        let message = build_message(
            "noreply@dutydeck.app",
            "a@x.com",
            "Reset Your Password",
            otp_body("Reset your password", "482913"),
        )
        .unwrap();

        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: Reset Your Password"));
        assert!(raw.contains("text/html"));
        assert!(raw.contains("To: a@x.com"));
    }

    #[test]
    fn test_bad_recipient_is_a_validation_error() {
        let err = build_message("noreply@dutydeck.app", "not an address", "Hi", String::new())
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_otp_body_contains_code() {
        assert!(otp_body("Reset your password", "482913").contains("482913"));
    }

    #[test]
    fn test_names_are_escaped() {
        assert_eq!(escape_html("<b>Ada</b>"), "&lt;b&gt;Ada&lt;/b&gt;");
    }
}
