//! Submission pipeline: normalize validated form data, persist it as JSON, CSV,
//! and HTML artifacts, then notify staff with the artifacts attached.

pub mod compose;
pub mod dispatch;
pub mod domain;
pub mod export;
pub mod mailer;
pub mod normalizer;
pub mod report;
pub mod service;

pub use compose::{client_display_name, compose_notification, NotificationMessage, UNKNOWN_CLIENT};
pub use dispatch::{
    DispatchOutcome, MailError, MailTransport, NotificationDispatcher, OutboundMail,
};
pub use domain::{
    readable_label, CategoryError, FieldRecord, FieldValue, RawSubmission, SubmissionCategory,
};
pub use export::{ArtifactKind, ArtifactSet, ExportError, ExportReport, SubmissionExporter};
pub use mailer::SmtpMailTransport;
pub use normalizer::{
    raw_submission_from_json, NormalizationError, PayloadError, RecordNormalizer,
    DEFAULT_CONTROL_FIELD,
};
pub use service::{ArtifactStatus, PipelineState, SubmissionOutcome, SubmissionService};
