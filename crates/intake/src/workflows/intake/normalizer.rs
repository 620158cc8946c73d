use chrono::Timelike;
use serde_json::Value;
use tracing::warn;

use super::domain::{FieldRecord, FieldValue, RawSubmission};

/// Field name the form layer uses for its anti-forgery token.
pub const DEFAULT_CONTROL_FIELD: &str = "csrf_token";

const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const DATE_TIME_MICROS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Converts validated form data into a [`FieldRecord`].
#[derive(Debug, Clone)]
pub struct RecordNormalizer {
    control_field: String,
}

impl Default for RecordNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_CONTROL_FIELD)
    }
}

impl RecordNormalizer {
    pub fn new(control_field: impl Into<String>) -> Self {
        Self {
            control_field: control_field.into(),
        }
    }

    pub fn control_field(&self) -> &str {
        &self.control_field
    }

    pub fn normalize(&self, raw: &RawSubmission) -> FieldRecord {
        let entries = raw
            .iter()
            .filter(|(name, _)| *name != self.control_field)
            .map(|(name, value)| (name.to_string(), render_value(value)))
            .collect();
        FieldRecord::from_entries(entries)
    }
}

/// Renders a value the way it appears in every artifact.
pub fn render_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Text(text) => text.clone(),
        FieldValue::Flag(true) => "True".to_string(),
        FieldValue::Flag(false) => "False".to_string(),
        FieldValue::Date(date) => date.format("%Y-%m-%d").to_string(),
        FieldValue::DateTime(moment) if moment.nanosecond() == 0 => {
            moment.format(DATE_TIME_FORMAT).to_string()
        }
        FieldValue::DateTime(moment) => moment.format(DATE_TIME_MICROS_FORMAT).to_string(),
        FieldValue::Absent => String::new(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NormalizationError {
    #[error("field '{field}' holds a nested {kind} that cannot be rendered as text")]
    Unrenderable { field: String, kind: &'static str },
}

/// Failure to accept a submission payload at all.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("submission payload must be a JSON object of fields, got {0}")]
    NotAnObject(&'static str),
    #[error("invalid submission payload: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn field_value_from_json(field: &str, value: Value) -> Result<FieldValue, NormalizationError> {
    match value {
        Value::Null => Ok(FieldValue::Absent),
        Value::Bool(flag) => Ok(FieldValue::Flag(flag)),
        Value::Number(number) => Ok(FieldValue::Text(number.to_string())),
        Value::String(text) => Ok(FieldValue::Text(text)),
        Value::Array(_) => Err(NormalizationError::Unrenderable {
            field: field.to_string(),
            kind: "array",
        }),
        Value::Object(_) => Err(NormalizationError::Unrenderable {
            field: field.to_string(),
            kind: "object",
        }),
    }
}

/// Builds a [`RawSubmission`] from a JSON object, keeping the document's field order.
///
/// Values that cannot be rendered are logged and kept as empty fields so the
/// submission is never dropped.
pub fn raw_submission_from_json(payload: Value) -> Result<RawSubmission, PayloadError> {
    let fields = match payload {
        Value::Object(fields) => fields,
        other => return Err(PayloadError::NotAnObject(json_kind(&other))),
    };

    let mut raw = RawSubmission::new();
    for (name, value) in fields {
        let value = field_value_from_json(&name, value).unwrap_or_else(|err| {
            warn!(error = %err, "substituting empty value for unrenderable field");
            FieldValue::Absent
        });
        raw.insert(name, value);
    }
    Ok(raw)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use serde_json::json;

    fn sample() -> RawSubmission {
        RawSubmission::new()
            .with_field("full_name", "Jane Doe")
            .with_field("csrf_token", "abc123")
            .with_field(
                "date_of_incident",
                NaiveDate::from_ymd_opt(2026, 3, 14).expect("valid date"),
            )
            .with_field("legal_disclaimer_agreement", true)
            .with_field("court_date", Option::<NaiveDate>::None)
            .with_field("county_of_incident", "Los Ángeles")
    }

    #[test]
    fn drops_control_field_and_keeps_order() {
        let record = RecordNormalizer::default().normalize(&sample());
        assert!(!record.contains("csrf_token"));
        let names: Vec<_> = record.names().collect();
        assert_eq!(
            names,
            vec![
                "full_name",
                "date_of_incident",
                "legal_disclaimer_agreement",
                "court_date",
                "county_of_incident",
            ]
        );
    }

    #[test]
    fn renders_values_as_presentable_text() {
        let record = RecordNormalizer::default().normalize(&sample());
        assert_eq!(record.get("date_of_incident"), Some("2026-03-14"));
        assert_eq!(record.get("legal_disclaimer_agreement"), Some("True"));
        assert_eq!(record.get("court_date"), Some(""));
        assert_eq!(record.get("county_of_incident"), Some("Los Ángeles"));
    }

    #[test]
    fn custom_control_field_is_respected() {
        let raw = RawSubmission::new()
            .with_field("_token", "secret")
            .with_field("csrf_token", "kept");
        let record = RecordNormalizer::new("_token").normalize(&raw);
        assert!(!record.contains("_token"));
        assert_eq!(record.get("csrf_token"), Some("kept"));
    }

    #[test]
    fn date_time_values_round_trip() {
        let moment = NaiveDate::from_ymd_opt(2026, 10, 18)
            .and_then(|date| date.and_hms_micro_opt(9, 5, 7, 250))
            .expect("valid timestamp");
        let whole = NaiveDate::from_ymd_opt(2026, 10, 18)
            .and_then(|date| date.and_hms_opt(23, 59, 1))
            .expect("valid timestamp");
        let millis = NaiveDate::from_ymd_opt(2026, 10, 18)
            .and_then(|date| date.and_hms_milli_opt(9, 0, 0, 5))
            .expect("valid timestamp");

        for value in [moment, whole, millis] {
            let rendered = render_value(&FieldValue::DateTime(value));
            let parsed = NaiveDateTime::parse_from_str(&rendered, "%Y-%m-%dT%H:%M:%S%.f")
                .expect("rendered timestamp parses");
            assert_eq!(parsed, value);
        }
        assert_eq!(render_value(&FieldValue::DateTime(whole)), "2026-10-18T23:59:01");
        assert_eq!(
            render_value(&FieldValue::DateTime(millis)),
            "2026-10-18T09:00:00.005000"
        );
        assert_eq!(
            render_value(&FieldValue::DateTime(moment)),
            "2026-10-18T09:05:07.000250"
        );
    }

    #[test]
    fn normalization_is_idempotent() {
        let normalizer = RecordNormalizer::default();
        let once = normalizer.normalize(&sample());
        let twice = normalizer.normalize(&once.to_raw());
        assert_eq!(once, twice);
    }

    #[test]
    fn json_payload_preserves_document_order() {
        let payload: Value = serde_json::from_str(
            r#"{"zip_code": "90210", "accident_type": "Rear-end", "injured": false, "age": 41, "notes": null}"#,
        )
        .expect("valid json");
        let raw = raw_submission_from_json(payload).expect("object payload");
        let record = RecordNormalizer::default().normalize(&raw);

        let names: Vec<_> = record.names().collect();
        assert_eq!(names, vec!["zip_code", "accident_type", "injured", "age", "notes"]);
        assert_eq!(record.get("injured"), Some("False"));
        assert_eq!(record.get("age"), Some("41"));
        assert_eq!(record.get("notes"), Some(""));
    }

    #[test]
    fn nested_json_values_become_empty_fields() {
        let raw = raw_submission_from_json(json!({ "witnesses": ["A", "B"], "email": "a@b.co" }))
            .expect("object payload");
        assert_eq!(raw.get("witnesses"), Some(&FieldValue::Absent));
        assert!(matches!(
            field_value_from_json("meta", json!({ "a": 1 })),
            Err(NormalizationError::Unrenderable { kind: "object", .. })
        ));
    }

    #[test]
    fn non_object_payloads_are_rejected() {
        assert!(matches!(
            raw_submission_from_json(json!(["a"])),
            Err(PayloadError::NotAnObject("an array"))
        ));
    }
}
