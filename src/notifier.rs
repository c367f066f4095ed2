use crate::config::EmailConfig;
use crate::types::Result;
use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::info;

/// Delivers a single alert describing one detected change. One call,
/// one outbound message; no batching.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, url: &str, title: &str, link: &str) -> Result<()>;
}

/// Notifier that sends a plain-text email over an authenticated SMTP
/// session, upgrading the connection with STARTTLS before logging in.
pub struct EmailNotifier {
    config: EmailConfig,
    mailer: SmtpTransport,
}

impl EmailNotifier {
    pub fn new(config: EmailConfig) -> Result<Self> {
        let mailer = SmtpTransport::starttls_relay(&config.smtp_server)?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.smtp_username.clone(),
                config.smtp_password.clone(),
            ))
            .build();

        Ok(Self { config, mailer })
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn notify(&self, url: &str, title: &str, link: &str) -> Result<()> {
        let body = format!("New post detected at {url}\n\nTitle: {title}\nLink: {link}");

        let message = Message::builder()
            .from(self.config.from.parse()?)
            .to(self.config.to.parse()?)
            .subject("New Post Alert!")
            .body(body)?;

        // Blocking send on the tokio worker; the pass is fully
        // sequential, so nothing else is waiting on this task.
        self.mailer.send(&message)?;
        info!("Alert sent to {} for {}", self.config.to, url);
        Ok(())
    }
}
