use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use super::compose::NotificationMessage;

/// Envelope handed to a [`MailTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMail {
    pub recipients: Vec<String>,
    pub subject: String,
    pub html_body: String,
    pub attachments: Vec<PathBuf>,
}

/// Outbound mail capability (SMTP relay, provider API, or a test double).
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, mail: &OutboundMail) -> Result<(), MailError>;
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("invalid mail address '{address}': {reason}")]
    Address { address: String, reason: String },
    #[error("no notification recipients configured")]
    NoRecipients,
    #[error("failed to build notification message: {0}")]
    Message(String),
    #[error("mail transport failed: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Sent { recipients: usize, attachments: usize },
    Failed { error: String },
}

impl DispatchOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, DispatchOutcome::Sent { .. })
    }
}

/// Sends notifications to a fixed distribution list.
#[derive(Clone)]
pub struct NotificationDispatcher {
    transport: Arc<dyn MailTransport>,
    recipients: Vec<String>,
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("recipients", &self.recipients)
            .finish_non_exhaustive()
    }
}

impl NotificationDispatcher {
    pub fn new(transport: Arc<dyn MailTransport>, recipients: Vec<String>) -> Self {
        Self {
            transport,
            recipients,
        }
    }

    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    /// Never fails: transport errors come back as [`DispatchOutcome::Failed`].
    pub async fn dispatch(&self, message: &NotificationMessage) -> DispatchOutcome {
        match self.try_dispatch(message).await {
            Ok(()) => {
                info!(
                    recipients = ?self.recipients,
                    attachments = message.attachments.len(),
                    subject = %message.subject,
                    "notification sent"
                );
                DispatchOutcome::Sent {
                    recipients: self.recipients.len(),
                    attachments: message.attachments.len(),
                }
            }
            Err(err) => {
                warn!(error = %err, subject = %message.subject, "failed to send notification");
                DispatchOutcome::Failed {
                    error: err.to_string(),
                }
            }
        }
    }

    async fn try_dispatch(&self, message: &NotificationMessage) -> Result<(), MailError> {
        if self.recipients.is_empty() {
            return Err(MailError::NoRecipients);
        }

        let mail = OutboundMail {
            recipients: self.recipients.clone(),
            subject: message.subject.clone(),
            html_body: message.body.clone(),
            attachments: message.attachments.clone(),
        };
        self.transport.send(&mail).await
    }
}
