use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::domain::{FieldRecord, SubmissionCategory};
use super::report::render_report;

const MAX_NAME_CLAIMS: u32 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    StructuredData,
    Tabular,
    Report,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [Self::StructuredData, Self::Tabular, Self::Report];

    pub fn extension(self) -> &'static str {
        match self {
            Self::StructuredData => "json",
            Self::Tabular => "csv",
            Self::Report => "html",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::StructuredData => "structured-data",
            Self::Tabular => "tabular",
            Self::Report => "report",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The three files belonging to one submission, sharing a base identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSet {
    directory: PathBuf,
    base_id: String,
}

impl ArtifactSet {
    fn new(directory: &Path, base_id: String) -> Self {
        Self {
            directory: directory.to_path_buf(),
            base_id,
        }
    }

    pub fn base_id(&self) -> &str {
        &self.base_id
    }

    pub fn path(&self, kind: ArtifactKind) -> PathBuf {
        self.directory
            .join(format!("{}.{}", self.base_id, kind.extension()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("unable to create submissions directory {}: {source}", path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode structured-data artifact {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode tabular artifact {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("export did not complete: {0}")]
    Interrupted(String),
    #[error("failed to write {kind} artifact {}: {source}", path.display())]
    Io {
        kind: ArtifactKind,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ExportError {
    pub fn kind(&self) -> Option<ArtifactKind> {
        match self {
            ExportError::Directory { .. } | ExportError::Interrupted(_) => None,
            ExportError::Json { .. } => Some(ArtifactKind::StructuredData),
            ExportError::Csv { .. } => Some(ArtifactKind::Tabular),
            ExportError::Io { kind, .. } => Some(*kind),
        }
    }
}

/// What one export run produced. Each artifact succeeds or fails on its own.
#[derive(Debug)]
pub struct ExportReport {
    pub artifacts: ArtifactSet,
    pub written: Vec<ArtifactKind>,
    pub failures: Vec<ExportError>,
    /// Rendered report, available even when writing it to disk failed.
    pub report_html: String,
}

impl ExportReport {
    pub fn is_written(&self, kind: ArtifactKind) -> bool {
        self.written.contains(&kind)
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.written.len() == ArtifactKind::ALL.len()
    }

    pub fn written_path(&self, kind: ArtifactKind) -> Option<PathBuf> {
        self.is_written(kind).then(|| self.artifacts.path(kind))
    }
}

/// Writes submissions as JSON, CSV, and HTML files under one directory.
#[derive(Debug, Clone)]
pub struct SubmissionExporter {
    directory: PathBuf,
}

impl SubmissionExporter {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn export(
        &self,
        record: &FieldRecord,
        category: &SubmissionCategory,
        received_at: NaiveDateTime,
    ) -> ExportReport {
        let report_html = render_report(record, category, received_at);
        let mut failures = Vec::new();

        // create_dir_all tolerates the directory appearing concurrently.
        if let Err(source) = fs::create_dir_all(&self.directory) {
            let err = ExportError::Directory {
                path: self.directory.clone(),
                source,
            };
            warn!(error = %err, "submissions directory unavailable");
            failures.push(err);
        }

        let artifacts = self.claim_base_id(category, received_at);
        let mut written = Vec::with_capacity(ArtifactKind::ALL.len());

        for kind in ArtifactKind::ALL {
            let path = artifacts.path(kind);
            match write_artifact(kind, &path, record, &report_html) {
                Ok(()) => {
                    info!(artifact = %kind, path = %path.display(), "saved submission artifact");
                    written.push(kind);
                }
                Err(err) => {
                    warn!(artifact = %kind, error = %err, "failed to save submission artifact");
                    failures.push(err);
                }
            }
        }

        ExportReport {
            artifacts,
            written,
            failures,
            report_html,
        }
    }

    /// Report for an export that never ran to completion: nothing written, the
    /// rendered report still available for the notification body.
    pub fn interrupted(
        &self,
        record: &FieldRecord,
        category: &SubmissionCategory,
        received_at: NaiveDateTime,
        reason: String,
    ) -> ExportReport {
        ExportReport {
            artifacts: ArtifactSet::new(&self.directory, base_stem(category, received_at)),
            written: Vec::new(),
            failures: vec![ExportError::Interrupted(reason)],
            report_html: render_report(record, category, received_at),
        }
    }

    /// Picks `<category>_<YYYYMMDD_HHMMSS>`, suffixing `_2`, `_3`, ... when a
    /// submission in the same second already owns the name. Ownership is taken by
    /// exclusively creating the report file, which holds across worker processes.
    fn claim_base_id(
        &self,
        category: &SubmissionCategory,
        received_at: NaiveDateTime,
    ) -> ArtifactSet {
        let stem = base_stem(category, received_at);

        for attempt in 1..=MAX_NAME_CLAIMS {
            let base_id = if attempt == 1 {
                stem.clone()
            } else {
                format!("{stem}_{attempt}")
            };
            let candidate = ArtifactSet::new(&self.directory, base_id);

            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(candidate.path(ArtifactKind::Report))
            {
                Ok(_) => return candidate,
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
                // The individual writes will surface this failure.
                Err(_) => return candidate,
            }
        }

        warn!(base_id = %stem, "no free artifact name left; overwriting the first");
        ArtifactSet::new(&self.directory, stem)
    }
}

fn base_stem(category: &SubmissionCategory, received_at: NaiveDateTime) -> String {
    format!(
        "{}_{}",
        category.as_str(),
        received_at.format("%Y%m%d_%H%M%S")
    )
}

fn write_artifact(
    kind: ArtifactKind,
    path: &Path,
    record: &FieldRecord,
    report_html: &str,
) -> Result<(), ExportError> {
    let contents = match kind {
        ArtifactKind::StructuredData => encode_json(record).map_err(|source| ExportError::Json {
            path: path.to_path_buf(),
            source,
        })?,
        ArtifactKind::Tabular => encode_csv(record).map_err(|source| ExportError::Csv {
            path: path.to_path_buf(),
            source,
        })?,
        ArtifactKind::Report => report_html.as_bytes().to_vec(),
    };

    fs::write(path, contents).map_err(|source| ExportError::Io {
        kind,
        path: path.to_path_buf(),
        source,
    })
}

fn encode_json(record: &FieldRecord) -> Result<Vec<u8>, serde_json::Error> {
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    record.serialize(&mut serializer)?;
    buffer.push(b'\n');
    Ok(buffer)
}

fn encode_csv(record: &FieldRecord) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(record.names())?;
    writer.write_record(record.values())?;
    writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))
}
