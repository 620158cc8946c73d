use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use super::compose::compose_notification;
use super::dispatch::{DispatchOutcome, MailTransport, NotificationDispatcher};
use super::domain::{FieldRecord, RawSubmission, SubmissionCategory};
use super::export::{ArtifactKind, ExportReport, SubmissionExporter};
use super::normalizer::RecordNormalizer;
use crate::config::{IntakeConfig, MailConfig};

/// Progress of one submission through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Received,
    Normalized,
    Exported,
    Composed,
    Dispatched,
    PartiallyFailed,
}

impl PipelineState {
    pub fn label(self) -> &'static str {
        match self {
            PipelineState::Received => "received",
            PipelineState::Normalized => "normalized",
            PipelineState::Exported => "exported",
            PipelineState::Composed => "composed",
            PipelineState::Dispatched => "dispatched",
            PipelineState::PartiallyFailed => "partially_failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactStatus {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub written: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Operator-facing summary of a processed submission. Never shown to the submitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionOutcome {
    pub category: SubmissionCategory,
    pub base_id: String,
    pub state: PipelineState,
    pub trail: Vec<PipelineState>,
    pub field_count: usize,
    pub artifacts: Vec<ArtifactStatus>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub export_errors: Vec<String>,
    pub subject: String,
    pub attachments: Vec<PathBuf>,
    pub dispatch: DispatchOutcome,
}

impl SubmissionOutcome {
    /// True when every artifact was written and the notification went out.
    pub fn is_clean(&self) -> bool {
        self.state == PipelineState::Dispatched && self.export_errors.is_empty()
    }
}

/// Runs normalize, export, compose, and dispatch for one submission.
///
/// No stage failure stops the run: later stages work with whatever the earlier
/// ones produced, and the outcome records what went wrong.
#[derive(Debug, Clone)]
pub struct SubmissionService {
    normalizer: RecordNormalizer,
    exporter: SubmissionExporter,
    dispatcher: NotificationDispatcher,
}

impl SubmissionService {
    pub fn new(
        normalizer: RecordNormalizer,
        exporter: SubmissionExporter,
        dispatcher: NotificationDispatcher,
    ) -> Self {
        Self {
            normalizer,
            exporter,
            dispatcher,
        }
    }

    pub fn from_config(
        intake: &IntakeConfig,
        mail: &MailConfig,
        transport: Arc<dyn MailTransport>,
    ) -> Self {
        Self::new(
            RecordNormalizer::new(intake.control_field.clone()),
            SubmissionExporter::new(intake.submissions_dir.clone()),
            NotificationDispatcher::new(transport, mail.recipients.clone()),
        )
    }

    pub fn exporter(&self) -> &SubmissionExporter {
        &self.exporter
    }

    pub fn normalizer(&self) -> &RecordNormalizer {
        &self.normalizer
    }

    pub fn dispatcher(&self) -> &NotificationDispatcher {
        &self.dispatcher
    }

    pub async fn process(
        &self,
        category: &SubmissionCategory,
        raw: &RawSubmission,
    ) -> SubmissionOutcome {
        self.process_at(category, raw, Local::now().naive_local())
            .await
    }

    pub async fn process_at(
        &self,
        category: &SubmissionCategory,
        raw: &RawSubmission,
        received_at: NaiveDateTime,
    ) -> SubmissionOutcome {
        let mut trail = vec![PipelineState::Received];

        let record = self.normalizer.normalize(raw);
        trail.push(PipelineState::Normalized);

        let export = self.export_off_thread(&record, category, received_at).await;
        trail.push(PipelineState::Exported);
        for failure in &export.failures {
            let artifact = failure.kind().map_or("directory", ArtifactKind::label);
            metrics::counter!(
                "intake_artifact_failures_total",
                "category" => category.as_str().to_string(),
                "artifact" => artifact
            )
            .increment(1);
        }

        let message = compose_notification(&record, category, &export, received_at.date());
        trail.push(PipelineState::Composed);

        let dispatch = self.dispatcher.dispatch(&message).await;
        let state = if dispatch.is_sent() {
            PipelineState::Dispatched
        } else {
            PipelineState::PartiallyFailed
        };
        trail.push(state);
        metrics::counter!(
            "intake_notifications_total",
            "category" => category.as_str().to_string(),
            "status" => if dispatch.is_sent() { "sent" } else { "failed" }
        )
        .increment(1);

        let artifacts = ArtifactKind::ALL
            .into_iter()
            .map(|kind| ArtifactStatus {
                kind,
                path: export.artifacts.path(kind),
                written: export.is_written(kind),
                error: export
                    .failures
                    .iter()
                    .find(|failure| failure.kind() == Some(kind))
                    .map(ToString::to_string),
            })
            .collect();

        let outcome = SubmissionOutcome {
            category: category.clone(),
            base_id: export.artifacts.base_id().to_string(),
            state,
            trail,
            field_count: record.len(),
            artifacts,
            export_errors: export.failures.iter().map(ToString::to_string).collect(),
            subject: message.subject,
            attachments: message.attachments,
            dispatch,
        };

        metrics::counter!(
            "intake_submissions_total",
            "category" => category.as_str().to_string(),
            "outcome" => if outcome.is_clean() { "clean" } else { state.label() }
        )
        .increment(1);

        if outcome.is_clean() {
            info!(
                category = %category,
                base_id = %outcome.base_id,
                fields = outcome.field_count,
                "submission processed"
            );
        } else {
            warn!(
                category = %category,
                base_id = %outcome.base_id,
                state = state.label(),
                artifacts_complete = export.is_complete(),
                export_errors = outcome.export_errors.len(),
                notification_sent = outcome.dispatch.is_sent(),
                "submission processed with failures"
            );
        }

        outcome
    }
}

impl SubmissionService {
    /// File writes run on the blocking pool so request workers stay free.
    async fn export_off_thread(
        &self,
        record: &FieldRecord,
        category: &SubmissionCategory,
        received_at: NaiveDateTime,
    ) -> ExportReport {
        let exporter = self.exporter.clone();
        let owned_record = record.clone();
        let owned_category = category.clone();

        let handle = tokio::task::spawn_blocking(move || {
            exporter.export(&owned_record, &owned_category, received_at)
        });

        match handle.await {
            Ok(report) => report,
            Err(err) => {
                warn!(category = %category, error = %err, "export task failed");
                self.exporter
                    .interrupted(record, category, received_at, err.to_string())
            }
        }
    }
}
