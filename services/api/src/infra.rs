use async_trait::async_trait;
use intake::config::{AppEnvironment, MailConfig};
use intake::error::AppError;
use intake::workflows::intake::{MailError, MailTransport, OutboundMail, SmtpMailTransport};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Stand-in transport for environments without a relay: logs and reports success.
#[derive(Debug, Default, Clone)]
pub(crate) struct LogOnlyMailTransport;

#[async_trait]
impl MailTransport for LogOnlyMailTransport {
    async fn send(&self, mail: &OutboundMail) -> Result<(), MailError> {
        info!(
            recipients = ?mail.recipients,
            subject = %mail.subject,
            attachments = ?mail.attachments,
            "mail relay not configured; notification logged only"
        );
        Ok(())
    }
}

pub(crate) fn build_mail_transport(
    mail: &MailConfig,
    environment: AppEnvironment,
) -> Result<Arc<dyn MailTransport>, AppError> {
    match &mail.smtp {
        Some(smtp) => {
            info!(host = %smtp.host, port = smtp.port, "using SMTP relay for notifications");
            Ok(Arc::new(SmtpMailTransport::new(smtp, &mail.sender)?))
        }
        None => {
            if environment == AppEnvironment::Production {
                warn!("SMTP_HOST is not set; staff notifications will only be logged");
            }
            Ok(Arc::new(LogOnlyMailTransport))
        }
    }
}
