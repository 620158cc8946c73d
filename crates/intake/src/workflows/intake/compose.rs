use chrono::NaiveDate;
use serde::Serialize;
use std::path::PathBuf;

use super::domain::{FieldRecord, SubmissionCategory};
use super::export::{ArtifactKind, ExportReport};

pub const UNKNOWN_CLIENT: &str = "Unknown Client";

const ATTACHED_KINDS: [ArtifactKind; 2] = [ArtifactKind::StructuredData, ArtifactKind::Tabular];

/// Staff notification for one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationMessage {
    pub subject: String,
    /// The rendered HTML report.
    pub body: String,
    pub attachments: Vec<PathBuf>,
}

/// Best-effort name of the person who submitted the form.
///
/// Uses `full_name`, then `first_name` + `last_name`, then [`UNKNOWN_CLIENT`].
/// Names that are blank after trimming fall through to [`UNKNOWN_CLIENT`] rather
/// than producing an empty name, so a subject line never ends in `- `.
pub fn client_display_name(record: &FieldRecord) -> String {
    if let Some(full_name) = record.get("full_name").map(str::trim) {
        if !full_name.is_empty() {
            return full_name.to_string();
        }
    }

    if let (Some(first), Some(last)) = (record.get("first_name"), record.get("last_name")) {
        let combined = format!("{} {}", first.trim(), last.trim());
        let combined = combined.trim();
        if !combined.is_empty() {
            return combined.to_string();
        }
    }

    UNKNOWN_CLIENT.to_string()
}

pub fn notification_subject(
    record: &FieldRecord,
    category: &SubmissionCategory,
    today: NaiveDate,
) -> String {
    format!(
        "[{}] {} - {}",
        today.format("%Y-%m-%d"),
        category.display_name(),
        client_display_name(record)
    )
}

/// Builds the notification from the record and whatever the exporter managed to write.
///
/// Only the JSON and CSV artifacts are attached, and only when they were written
/// and are still regular files at composition time. The report travels as the body.
pub fn compose_notification(
    record: &FieldRecord,
    category: &SubmissionCategory,
    export: &ExportReport,
    today: NaiveDate,
) -> NotificationMessage {
    let attachments = ATTACHED_KINDS
        .into_iter()
        .filter_map(|kind| export.written_path(kind))
        .filter(|path| path.is_file())
        .collect();

    NotificationMessage {
        subject: notification_subject(record, category, today),
        body: export.report_html.clone(),
        attachments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::intake::domain::RawSubmission;
    use crate::workflows::intake::normalizer::RecordNormalizer;

    fn record_of(fields: &[(&str, &str)]) -> FieldRecord {
        let raw: RawSubmission = fields.iter().copied().collect();
        RecordNormalizer::default().normalize(&raw)
    }

    #[test]
    fn prefers_full_name() {
        let record = record_of(&[
            ("full_name", "Jane Doe"),
            ("first_name", "Ignored"),
            ("last_name", "Name"),
        ]);
        assert_eq!(client_display_name(&record), "Jane Doe");
    }

    #[test]
    fn falls_back_to_first_and_last_name() {
        let record = record_of(&[("first_name", " Jane "), ("last_name", "Doe")]);
        assert_eq!(client_display_name(&record), "Jane Doe");

        let blank_full = record_of(&[("full_name", "  "), ("first_name", "Jane"), ("last_name", "Doe")]);
        assert_eq!(client_display_name(&blank_full), "Jane Doe");
    }

    #[test]
    fn unknown_client_when_names_missing() {
        assert_eq!(client_display_name(&record_of(&[])), UNKNOWN_CLIENT);
        assert_eq!(
            client_display_name(&record_of(&[("first_name", "Jane")])),
            UNKNOWN_CLIENT
        );
        assert_eq!(
            client_display_name(&record_of(&[("first_name", ""), ("last_name", "")])),
            UNKNOWN_CLIENT
        );
    }

    #[test]
    fn subject_combines_date_category_and_client() {
        let record = record_of(&[("first_name", "Jane"), ("last_name", "Doe")]);
        let category = SubmissionCategory::new("auto_accident_wizard").expect("valid category");
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).expect("valid date");

        assert_eq!(
            notification_subject(&record, &category, today),
            "[2026-10-18] Auto Accident Wizard - Jane Doe"
        );
    }
}
