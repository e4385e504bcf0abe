use async_trait::async_trait;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Outbox lock poisoned")]
    Poisoned,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_verification(&self, email: &str, link: &str) -> Result<(), MailError>;
}

pub fn verification_link(origin: &str, token: &str) -> String {
    format!("{}/verify?token={}", origin.trim_end_matches('/'), token)
}

/// Writes the link to the log instead of delivering it.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_verification(&self, email: &str, link: &str) -> Result<(), MailError> {
        tracing::info!(%email, %link, "Verification email");
        Ok(())
    }
}

/// Keeps every message in memory. Used by tests to pick up the link.
#[derive(Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<(String, String)>>,
}

impl MemoryMailer {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn last_link_for(&self, email: &str) -> Option<String> {
        self.sent()
            .into_iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, link)| link)
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send_verification(&self, email: &str, link: &str) -> Result<(), MailError> {
        self.sent
            .lock()
            .map_err(|_| MailError::Poisoned)?
            .push((email.to_string(), link.to_string()));
        Ok(())
    }
}
