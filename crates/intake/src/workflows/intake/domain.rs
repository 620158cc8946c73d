use chrono::{NaiveDate, NaiveDateTime};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::fmt;

/// Label naming the intake form that produced a submission.
///
/// Categories are opaque: unknown labels are accepted as long as they are safe
/// to embed in a file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SubmissionCategory(String);

impl SubmissionCategory {
    pub const GENERAL_CONTACT: &'static str = "general_contact";
    pub const PERSONAL_INJURY: &'static str = "personal_injury";
    pub const CRIMINAL_DEFENSE: &'static str = "criminal_defense";
    pub const AUTO_ACCIDENT_WIZARD: &'static str = "auto_accident_wizard";

    /// Keeps `<label>_<YYYYMMDD_HHMMSS>_<n>.<ext>` well under file name limits.
    pub const MAX_LEN: usize = 64;

    pub fn new(label: impl Into<String>) -> Result<Self, CategoryError> {
        let label = label.into();
        let trimmed = label.trim();
        if trimmed.is_empty() {
            return Err(CategoryError::Empty);
        }
        if trimmed.len() > Self::MAX_LEN {
            return Err(CategoryError::TooLong {
                length: trimmed.len(),
                max: Self::MAX_LEN,
            });
        }

        if let Some(character) = trimmed
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
        {
            return Err(CategoryError::InvalidCharacter {
                label: trimmed.to_string(),
                character,
            });
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human-facing form of the label, e.g. `auto_accident_wizard` -> `Auto Accident Wizard`.
    pub fn display_name(&self) -> String {
        readable_label(&self.0)
    }
}

impl fmt::Display for SubmissionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CategoryError {
    #[error("submission category must not be empty")]
    Empty,
    #[error("submission category is {length} bytes long, at most {max} allowed")]
    TooLong { length: usize, max: usize },
    #[error("submission category '{label}' contains unsupported character '{character}'")]
    InvalidCharacter { label: String, character: char },
}

/// Replaces underscores with spaces and capitalizes the first letter of every word.
pub fn readable_label(raw: &str) -> String {
    let mut label = String::with_capacity(raw.len());
    let mut previous_is_alpha = false;
    for c in raw.chars() {
        let c = if c == '_' { ' ' } else { c };
        if c.is_alphabetic() {
            if previous_is_alpha {
                label.extend(c.to_lowercase());
            } else {
                label.extend(c.to_uppercase());
            }
            previous_is_alpha = true;
        } else {
            label.push(c);
            previous_is_alpha = false;
        }
    }
    label
}

/// A single value as handed over by the form layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Flag(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Absent,
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<NaiveDateTime> for FieldValue {
    fn from(value: NaiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

impl<T> From<Option<T>> for FieldValue
where
    T: Into<FieldValue>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Absent, Into::into)
    }
}

/// Validated form data in declaration order, prior to normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSubmission {
    fields: Vec<(String, FieldValue)>,
}

impl RawSubmission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Sets a field. Re-inserting an existing name replaces the value in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for RawSubmission
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut raw = RawSubmission::new();
        for (name, value) in iter {
            raw.insert(name, value);
        }
        raw
    }
}

/// Normalized submission: every value is presentable text and field order is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldRecord {
    entries: Vec<(String, String)>,
}

impl FieldRecord {
    pub(crate) fn from_entries(entries: Vec<(String, String)>) -> Self {
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Feeds the record back in as text values.
    pub fn to_raw(&self) -> RawSubmission {
        self.iter()
            .map(|(name, value)| (name, FieldValue::from(value)))
            .collect()
    }
}

impl Serialize for FieldRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readable_label_title_cases_words() {
        assert_eq!(readable_label("auto_accident_wizard"), "Auto Accident Wizard");
        assert_eq!(readable_label("zip_code"), "Zip Code");
        assert_eq!(readable_label("EMAIL_address"), "Email Address");
        assert_eq!(readable_label("line2x"), "Line2X");
    }

    #[test]
    fn category_accepts_unknown_labels() {
        let category = SubmissionCategory::new("estate_planning-v2").expect("valid label");
        assert_eq!(category.as_str(), "estate_planning-v2");
        assert_eq!(category.display_name(), "Estate Planning-V2");
    }

    #[test]
    fn category_rejects_path_characters() {
        assert_eq!(SubmissionCategory::new("  "), Err(CategoryError::Empty));
        assert!(matches!(
            SubmissionCategory::new("../etc"),
            Err(CategoryError::InvalidCharacter { character: '.', .. })
        ));
    }

    #[test]
    fn category_length_is_bounded() {
        let longest = "a".repeat(SubmissionCategory::MAX_LEN);
        assert!(SubmissionCategory::new(longest).is_ok());
        assert_eq!(
            SubmissionCategory::new("a".repeat(250)),
            Err(CategoryError::TooLong {
                length: 250,
                max: SubmissionCategory::MAX_LEN
            })
        );
    }

    #[test]
    fn raw_submission_replaces_repeated_fields_in_place() {
        let raw = RawSubmission::new()
            .with_field("first_name", "Jane")
            .with_field("last_name", "Doe")
            .with_field("first_name", "Janet");

        let names: Vec<_> = raw.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["first_name", "last_name"]);
        assert_eq!(raw.get("first_name"), Some(&FieldValue::from("Janet")));
    }

    #[test]
    fn optional_values_map_to_absent() {
        let missing: Option<NaiveDate> = None;
        assert_eq!(FieldValue::from(missing), FieldValue::Absent);
    }
}
