//! Patient record model
//!
//! A [`PatientRecord`] is the single canonical copy of a patient's data. It
//! carries the raw fields plus the anonymized projection derived from them;
//! callers never see the record itself, only a [`RecordView`] selected by
//! [`View`].

use crate::domain::ids::RecordId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw, identifying patient fields
///
/// `Debug` output never includes the values.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFields {
    pub name: String,
    pub contact: String,
    pub diagnosis: String,
}

impl RawFields {
    pub fn new(
        name: impl Into<String>,
        contact: impl Into<String>,
        diagnosis: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            contact: contact.into(),
            diagnosis: diagnosis.into(),
        }
    }
}

impl fmt::Debug for RawFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawFields")
            .field("name", &"[REDACTED]")
            .field("contact", &"[REDACTED]")
            .field("diagnosis", &"[REDACTED]")
            .finish()
    }
}

/// Partial update of raw fields; `None` leaves a field unchanged
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDelta {
    pub name: Option<String>,
    pub contact: Option<String>,
    pub diagnosis: Option<String>,
}

impl RawDelta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_contact(mut self, contact: impl Into<String>) -> Self {
        self.contact = Some(contact.into());
        self
    }

    pub fn with_diagnosis(mut self, diagnosis: impl Into<String>) -> Self {
        self.diagnosis = Some(diagnosis.into());
        self
    }

    /// Returns true when no field would change
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.contact.is_none() && self.diagnosis.is_none()
    }

    /// Names of the fields this delta touches, for audit details
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.name.is_some() {
            fields.push("name");
        }
        if self.contact.is_some() {
            fields.push("contact");
        }
        if self.diagnosis.is_some() {
            fields.push("diagnosis");
        }
        fields
    }

    /// Produces the raw fields that result from applying this delta
    pub fn apply(&self, current: &RawFields) -> RawFields {
        RawFields {
            name: self.name.clone().unwrap_or_else(|| current.name.clone()),
            contact: self
                .contact
                .clone()
                .unwrap_or_else(|| current.contact.clone()),
            diagnosis: self
                .diagnosis
                .clone()
                .unwrap_or_else(|| current.diagnosis.clone()),
        }
    }
}

impl fmt::Debug for RawDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawDelta")
            .field("fields", &self.changed_fields())
            .finish()
    }
}

/// Anonymized projection derived from [`RawFields`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnonymizedFields {
    /// Pseudonym (or sealed value) standing in for the name
    pub name: String,
    /// Display mask of the contact, e.g. `XXX-XXX-4592`
    pub contact: String,
    /// Sealed copy of the contact, recoverable with an unmask grant
    pub sealed_contact: String,
}

/// Canonical stored patient record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: RecordId,
    pub raw: RawFields,
    pub anonymized: AnonymizedFields,
    /// Fingerprint of the anonymizer configuration that produced `anonymized`
    pub fingerprint: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PatientRecord {
    /// Projects the record into the requested view
    pub fn project(&self, view: View) -> RecordView {
        match view {
            View::Raw => RecordView::Raw(RawRecordView {
                id: self.id,
                raw: self.raw.clone(),
                anonymized: self.anonymized.clone(),
                created_at: self.created_at,
                updated_at: self.updated_at,
            }),
            View::Anonymized => RecordView::Anonymized(AnonymizedRecordView {
                id: self.id,
                name: self.anonymized.name.clone(),
                contact: self.anonymized.contact.clone(),
                diagnosis: self.raw.diagnosis.clone(),
                created_at: self.created_at,
                updated_at: self.updated_at,
            }),
        }
    }
}

/// Projection selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Raw,
    Anonymized,
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::Raw => f.write_str("raw"),
            View::Anonymized => f.write_str("anonymized"),
        }
    }
}

/// What a caller receives when reading a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "lowercase")]
pub enum RecordView {
    Raw(RawRecordView),
    Anonymized(AnonymizedRecordView),
}

impl RecordView {
    pub fn id(&self) -> RecordId {
        match self {
            RecordView::Raw(view) => view.id,
            RecordView::Anonymized(view) => view.id,
        }
    }

    /// Returns the anonymized projection, if this is one
    pub fn as_anonymized(&self) -> Option<&AnonymizedRecordView> {
        match self {
            RecordView::Anonymized(view) => Some(view),
            RecordView::Raw(_) => None,
        }
    }

    /// Returns the raw projection, if this is one
    pub fn as_raw(&self) -> Option<&RawRecordView> {
        match self {
            RecordView::Raw(view) => Some(view),
            RecordView::Anonymized(_) => None,
        }
    }
}

/// Full view for callers holding `ReadRaw`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecordView {
    pub id: RecordId,
    pub raw: RawFields,
    pub anonymized: AnonymizedFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Masked view for callers holding `ReadAnonymized`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnonymizedRecordView {
    pub id: RecordId,
    pub name: String,
    pub contact: String,
    pub diagnosis: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> PatientRecord {
        let now = Utc::now();
        PatientRecord {
            id: RecordId::new(),
            raw: RawFields::new("John Doe", "555-111-4592", "Seasonal influenza"),
            anonymized: AnonymizedFields {
                name: "ANON_0123456789abcdef".to_string(),
                contact: "XXX-XXX-4592".to_string(),
                sealed_contact: "v1:AAAA".to_string(),
            },
            fingerprint: "fp".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_raw_fields_debug_is_redacted() {
        let raw = RawFields::new("John Doe", "555-111-4592", "Seasonal influenza");
        let debug = format!("{raw:?}");
        assert!(!debug.contains("John"));
        assert!(!debug.contains("4592"));
        assert!(!debug.contains("influenza"));
    }

    #[test]
    fn test_delta_apply_keeps_untouched_fields() {
        let raw = RawFields::new("John Doe", "555-111-4592", "Seasonal influenza");
        let delta = RawDelta::new().with_contact("555-222-7788");
        let updated = delta.apply(&raw);
        assert_eq!(updated.name, "John Doe");
        assert_eq!(updated.contact, "555-222-7788");
        assert_eq!(updated.diagnosis, "Seasonal influenza");
        assert_eq!(delta.changed_fields(), vec!["contact"]);
    }

    #[test]
    fn test_empty_delta() {
        assert!(RawDelta::new().is_empty());
        assert!(!RawDelta::new().with_name("Jane Roe").is_empty());
    }

    #[test]
    fn test_anonymized_projection_hides_raw_identity() {
        let record = sample_record();
        let view = record.project(View::Anonymized);
        let anonymized = view.as_anonymized().unwrap();
        assert_eq!(anonymized.name, "ANON_0123456789abcdef");
        assert_eq!(anonymized.contact, "XXX-XXX-4592");
        assert_eq!(anonymized.diagnosis, "Seasonal influenza");
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("John"));
        assert!(!json.contains("555-111"));
    }

    #[test]
    fn test_raw_projection_carries_everything() {
        let record = sample_record();
        let view = record.project(View::Raw);
        assert_eq!(view.id(), record.id);
        assert_eq!(view.as_raw().unwrap().raw.name, "John Doe");
        assert!(view.as_anonymized().is_none());
    }
}
