use std::time::Duration;

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{debug, error, info};

use crate::config::{MailConfig, SmtpTls};

pub const VERIFICATION_SUBJECT: &str = "Verify your Travel App account";

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("failed to build message: {0}")]
    Build(String),
    #[error("smtp transport error: {0}")]
    Transport(String),
    #[error("refusing to send SMTP credentials over an unencrypted connection")]
    InsecureCredentials,
}

/// Outbound notifications sent by the auth workflow.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_verification(
        &self,
        to: &str,
        display_name: Option<&str>,
        link: &str,
    ) -> Result<(), MailError>;
}

pub fn verification_body(display_name: Option<&str>, link: &str) -> String {
    let name = display_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or("there");
    format!(
        "Hi {name},\n\n\
         Thanks for registering with Travel App. Please verify your email address by clicking the link below:\n\n\
         {link}\n\n\
         If you did not sign up, please ignore this email.\n"
    )
}

pub struct SmtpMailer {
    config: MailConfig,
}

impl SmtpMailer {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }

    fn build_transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailError> {
        let host = &self.config.smtp_host;
        let builder = match self.config.tls {
            SmtpTls::Starttls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .map_err(|e| MailError::Transport(e.to_string()))?,
            SmtpTls::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                .map_err(|e| MailError::Transport(e.to_string()))?,
            SmtpTls::None => {
                if self.config.smtp_username.is_some() {
                    return Err(MailError::InsecureCredentials);
                }
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            }
        };
        let mut builder = builder
            .port(self.config.smtp_port)
            .timeout(Some(Duration::from_secs(self.config.timeout_secs)));
        if let Some(username) = &self.config.smtp_username {
            let password = self.config.smtp_password.clone().unwrap_or_default();
            builder = builder.credentials(Credentials::new(username.clone(), password));
        }
        Ok(builder.build())
    }

    fn build_message(&self, to: &str, subject: &str, body: String) -> Result<Message, MailError> {
        let from: Mailbox = self
            .config
            .from
            .parse()
            .map_err(|e| MailError::InvalidAddress(format!("from {}: {e}", self.config.from)))?;
        let to: Mailbox = to
            .parse()
            .map_err(|e| MailError::InvalidAddress(format!("to {to}: {e}")))?;
        Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| MailError::Build(e.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_verification(
        &self,
        to: &str,
        display_name: Option<&str>,
        link: &str,
    ) -> Result<(), MailError> {
        if !self.config.enabled {
            info!(to = %to, "mail disabled via configuration; skipping verification mail");
            return Ok(());
        }

        let message = self.build_message(to, VERIFICATION_SUBJECT, verification_body(display_name, link))?;
        let transport = self.build_transport()?;
        debug!(to = %to, host = %self.config.smtp_host, "sending verification mail");

        transport.send(message).await.map_err(|e| {
            error!(to = %to, error = %e, "failed to send verification email");
            MailError::Transport(e.to_string())
        })?;

        info!(to = %to, "verification mail sent");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    };

    use super::*;

    #[derive(Debug, Clone)]
    pub struct SentMail {
        pub to: String,
        pub display_name: Option<String>,
        pub link: String,
    }

    /// Keeps every send in memory; can be switched to fail.
    #[derive(Default)]
    pub struct RecordingMailer {
        sent: Mutex<Vec<SentMail>>,
        fail: AtomicBool,
    }

    impl RecordingMailer {
        pub fn failing() -> Self {
            let mailer = Self::default();
            mailer.fail.store(true, Ordering::SeqCst);
            mailer
        }

        pub fn sent(&self) -> Vec<SentMail> {
            self.sent.lock().unwrap().clone()
        }

        pub fn last_link(&self) -> Option<String> {
            self.sent.lock().unwrap().last().map(|m| m.link.clone())
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send_verification(
            &self,
            to: &str,
            display_name: Option<&str>,
            link: &str,
        ) -> Result<(), MailError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(MailError::Transport("connection refused".into()));
            }
            self.sent.lock().unwrap().push(SentMail {
                to: to.to_string(),
                display_name: display_name.map(str::to_string),
                link: link.to_string(),
            });
            Ok(())
        }
    }
}
