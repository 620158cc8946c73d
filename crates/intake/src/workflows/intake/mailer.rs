use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::path::Path;
use tracing::warn;

use super::dispatch::{MailError, MailTransport, OutboundMail};
use crate::config::SmtpConfig;

/// SMTP relay transport over STARTTLS with a bounded command timeout.
pub struct SmtpMailTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
}

impl std::fmt::Debug for SmtpMailTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpMailTransport")
            .field("sender", &self.sender.to_string())
            .finish_non_exhaustive()
    }
}

impl SmtpMailTransport {
    pub fn new(config: &SmtpConfig, sender: &str) -> Result<Self, MailError> {
        let sender = parse_mailbox(sender)?;
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|err| MailError::Transport(err.to_string()))?
            .port(config.port)
            .timeout(Some(config.timeout));

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            sender,
        })
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn send(&self, mail: &OutboundMail) -> Result<(), MailError> {
        let message = build_message(&self.sender, mail).await?;
        self.transport
            .send(message)
            .await
            .map_err(|err| MailError::Transport(err.to_string()))?;
        Ok(())
    }
}

pub(crate) fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.trim().parse().map_err(|err: lettre::address::AddressError| MailError::Address {
        address: address.to_string(),
        reason: err.to_string(),
    })
}

/// HTML body plus one part per readable attachment; unreadable files are skipped.
async fn build_message(sender: &Mailbox, mail: &OutboundMail) -> Result<Message, MailError> {
    let mut builder = Message::builder()
        .from(sender.clone())
        .subject(mail.subject.clone());
    for recipient in &mail.recipients {
        builder = builder.to(parse_mailbox(recipient)?);
    }

    let mut body = MultiPart::mixed().singlepart(SinglePart::html(mail.html_body.clone()));
    for path in &mail.attachments {
        match tokio::fs::read(path).await {
            Ok(contents) => {
                body = body.singlepart(attachment_part(path, contents)?);
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping unreadable attachment");
            }
        }
    }

    builder
        .multipart(body)
        .map_err(|err| MailError::Message(err.to_string()))
}

fn attachment_part(path: &Path, contents: Vec<u8>) -> Result<SinglePart, MailError> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("attachment")
        .to_string();
    let mime: mime::Mime = mime_guess::from_path(path).first_or_octet_stream();
    let content_type =
        ContentType::parse(mime.essence_str()).map_err(|err| MailError::Message(err.to_string()))?;
    Ok(Attachment::new(filename).body(contents, content_type))
}
