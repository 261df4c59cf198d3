use anyhow::Context;
use axum::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tokio::sync::OnceCell;
use tracing::{error, info, warn};

use crate::config::MailConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> anyhow::Result<()>;
}

/// Builds the password-reset message pointing at the frontend reset page.
pub fn reset_email(cfg: &MailConfig, to: &str, token: &str, ttl_minutes: i64) -> OutgoingMail {
    let link = format!(
        "{}/reset-password/{}",
        cfg.frontend_url.trim_end_matches('/'),
        token
    );
    OutgoingMail {
        to: to.to_string(),
        subject: "Password Reset Link".into(),
        html_body: format!(
            "<p>You requested a password reset.</p>\
             <p>Click <a href=\"{link}\">here</a> to reset your password.</p>\
             <p>This link will expire in {}.</p>",
            describe_minutes(ttl_minutes)
        ),
    }
}

fn describe_minutes(minutes: i64) -> String {
    match minutes {
        60 => "1 hour".into(),
        m if m % 60 == 0 => format!("{} hours", m / 60),
        1 => "1 minute".into(),
        m => format!("{} minutes", m),
    }
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    verified: OnceCell<()>,
}

impl SmtpMailer {
    pub fn new(host: &str, cfg: &MailConfig) -> anyhow::Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .with_context(|| format!("smtp relay {}", host))?
            .credentials(Credentials::new(
                cfg.smtp_username.clone(),
                cfg.smtp_password.clone(),
            ))
            .build();
        let from = cfg
            .from
            .parse::<Mailbox>()
            .with_context(|| format!("parse MAIL_FROM {:?}", cfg.from))?;
        Ok(Self {
            transport,
            from,
            verified: OnceCell::new(),
        })
    }

    /// Checks the SMTP connection once, on first use. The outcome is only logged.
    async fn verify_once(&self) {
        self.verified
            .get_or_init(|| async {
                match self.transport.test_connection().await {
                    Ok(true) => info!("mail server is ready to take messages"),
                    Ok(false) => error!("mail server connection check failed"),
                    Err(e) => error!(error = %e, "mail server connection failed"),
                }
            })
            .await;
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> anyhow::Result<()> {
        self.verify_once().await;
        let to = mail
            .to
            .parse::<Mailbox>()
            .with_context(|| format!("parse recipient {:?}", mail.to))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(mail.subject)
            .header(ContentType::TEXT_HTML)
            .body(mail.html_body)
            .context("build mail")?;
        self.transport.send(message).await.context("smtp send")?;
        Ok(())
    }
}

/// Used when no SMTP host is configured: drops messages with a warning.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: OutgoingMail) -> anyhow::Result<()> {
        warn!(to = %mail.to, subject = %mail.subject, "mail transport not configured; message dropped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> MailConfig {
        MailConfig {
            smtp_host: None,
            smtp_username: String::new(),
            smtp_password: String::new(),
            from: "no-reply@tolet.test".into(),
            frontend_url: "https://tolet.test/".into(),
        }
    }

    #[test]
    fn reset_email_links_to_frontend() {
        let mail = reset_email(&cfg(), "ana@example.com", "abc123", 60);
        assert_eq!(mail.to, "ana@example.com");
        assert_eq!(mail.subject, "Password Reset Link");
        assert!(mail
            .html_body
            .contains("href=\"https://tolet.test/reset-password/abc123\""));
        assert!(mail.html_body.contains("expire in 1 hour"));
    }

    #[test]
    fn ttl_wording() {
        assert_eq!(describe_minutes(120), "2 hours");
        assert_eq!(describe_minutes(45), "45 minutes");
    }

    #[tokio::test]
    async fn log_mailer_accepts_everything() {
        let mail = reset_email(&cfg(), "ana@example.com", "t", 60);
        assert!(LogMailer.send(mail).await.is_ok());
    }
}
