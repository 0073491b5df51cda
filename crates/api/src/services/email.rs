//! Outgoing email.
//!
//! Uses SMTP via lettre for delivery with Askama templates. Without SMTP
//! configuration a [`DisabledMailer`] is installed and every send fails.

use askama::Template;
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use bookaholic_core::Email;

use crate::config::EmailConfig;

/// Subject line of the password reset message.
pub const PASSWORD_RESET_SUBJECT: &str = "Bookaholic password reset token";

/// HTML template for the password reset email.
#[derive(Template)]
#[template(path = "email/password_reset.html")]
struct PasswordResetEmailHtml<'a> {
    name: &'a str,
    reset_url: &'a str,
    expires_in_minutes: i64,
}

/// Plain text template for the password reset email.
#[derive(Template)]
#[template(path = "email/password_reset.txt")]
struct PasswordResetEmailText<'a> {
    name: &'a str,
    reset_url: &'a str,
    expires_in_minutes: i64,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// No SMTP server is configured.
    #[error("Email delivery is not configured")]
    NotConfigured,
}

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: Email,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

/// Render the password reset message.
///
/// # Errors
///
/// Returns `EmailError::Template` if a template fails to render.
pub fn password_reset_email(
    to: &Email,
    name: &str,
    reset_url: &str,
    expires_in_minutes: i64,
) -> Result<OutgoingEmail, EmailError> {
    let html_body = PasswordResetEmailHtml {
        name,
        reset_url,
        expires_in_minutes,
    }
    .render()?;
    let text_body = PasswordResetEmailText {
        name,
        reset_url,
        expires_in_minutes,
    }
    .render()?;

    Ok(OutgoingEmail {
        to: to.clone(),
        subject: PASSWORD_RESET_SUBJECT.to_owned(),
        text_body,
        html_body,
    })
}

/// Delivers rendered messages.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver `email`, or report why it could not be delivered.
    async fn send(&self, email: OutgoingEmail) -> Result<(), EmailError>;
}

/// Mailer that sends through an SMTP relay.
#[derive(Clone)]
pub struct SmtpMailer {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpMailer {
    /// Create a new SMTP mailer from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), EmailError> {
        let message = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(email
                .to
                .as_str()
                .parse()
                .map_err(|_| EmailError::InvalidAddress(email.to.to_string()))?)
            .subject(&email.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.text_body),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(email.html_body),
                    ),
            )?;

        self.mailer.send(message).await?;

        tracing::info!(to = %email.to, subject = %email.subject, "Email sent successfully");
        Ok(())
    }
}

/// Mailer used when SMTP is not configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledMailer;

#[async_trait]
impl Mailer for DisabledMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), EmailError> {
        tracing::warn!(to = %email.to, subject = %email.subject, "email not sent: SMTP is not configured");
        Err(EmailError::NotConfigured)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_password_reset_email_contains_link() {
        let to = Email::parse("reader@example.com").unwrap();
        let url = "http://localhost:5000/api/v1/auth/resetpassword/abc123";
        let email = password_reset_email(&to, "Reader", url, 10).unwrap();

        assert_eq!(email.subject, PASSWORD_RESET_SUBJECT);
        assert!(email.text_body.contains(url));
        assert!(email.text_body.contains("10 minutes"));
        assert!(email.html_body.contains(url));
        assert!(email.html_body.contains("Hello Reader"));
    }

    #[tokio::test]
    async fn test_disabled_mailer_fails() {
        let to = Email::parse("reader@example.com").unwrap();
        let email = password_reset_email(&to, "Reader", "http://x/y", 10).unwrap();
        assert!(matches!(
            DisabledMailer.send(email).await,
            Err(EmailError::NotConfigured)
        ));
    }
}
