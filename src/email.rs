use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, AsyncSmtpTransport,
    AsyncTransport, Message, Tokio1Executor,
};

use crate::config::SmtpSettings;

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), String>;
}

pub struct SmtpEmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_email: String,
}

impl SmtpEmailSender {
    pub fn new(smtp: &SmtpSettings, from_email: &str) -> Result<Self, String> {
        let creds = Credentials::new(smtp.username.clone(), smtp.password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.server)
            .map_err(|e| e.to_string())?
            .credentials(creds)
            .build();

        Ok(Self {
            transport,
            from_email: from_email.to_string(),
        })
    }
}

fn build_message(from: &str, to: &str, subject: &str, body: &str) -> Result<Message, String> {
    Message::builder()
        .from(from.parse().map_err(|e| format!("{:?}", e))?)
        .to(to.parse().map_err(|e| format!("{:?}", e))?)
        .subject(subject)
        .header(ContentType::TEXT_PLAIN)
        .body(body.to_string())
        .map_err(|e| e.to_string())
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), String> {
        let email = build_message(&self.from_email, to, subject, body)?;

        self.transport.send(email).await.map_err(|e| e.to_string())?;
        tracing::info!(%to, %subject, "email sent");
        Ok(())
    }
}

/// Used when no SMTP server is configured: the message is written to the log instead.
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), String> {
        tracing::info!(%to, %subject, %body, "smtp not configured, email logged");
        Ok(())
    }
}
