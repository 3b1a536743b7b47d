use super::bool_field;
use super::string_field;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Trust level attached to a displayed metric.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Confidence {
    Safe,
    Conditional,
    Blocked,
}

impl Confidence {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "SAFE" => Some(Confidence::Safe),
            "CONDITIONAL" => Some(Confidence::Conditional),
            "BLOCKED" => Some(Confidence::Blocked),
            _ => None,
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::Safe => write!(f, "SAFE"),
            Confidence::Conditional => write!(f, "CONDITIONAL"),
            Confidence::Blocked => write!(f, "BLOCKED"),
        }
    }
}

/// Whether a record traces to the authoritative store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Provenance {
    Canonical,
    LegacyObserved,
}

impl Provenance {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "CANONICAL" => Some(Provenance::Canonical),
            "LEGACY_OBSERVED" => Some(Provenance::LegacyObserved),
            _ => None,
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Canonical => write!(f, "CANONICAL"),
            Provenance::LegacyObserved => write!(f, "LEGACY_OBSERVED"),
        }
    }
}

const CANONICAL_SOURCE_MARKERS: [&str; 3] = ["ods", "canonical", "primary"];

/// Record metadata as sent by the backend. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordMeta {
    pub provenance: Option<String>,
    pub is_canonical: Option<bool>,
    pub source_system: Option<String>,
    pub observed_via: Option<String>,
    pub confidence: Option<String>,
    pub validation_status: Option<String>,
    pub is_validated: Option<bool>,
}

impl RecordMeta {
    /// Reads a loose JSON object. Fields with the wrong type are treated as
    /// absent; non-objects produce an empty meta.
    pub fn from_json(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::default();
        };
        let observed_via = match object.get("observed_via") {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) => Some(text.clone()),
            Some(other) => Some(other.to_string()),
        };
        Self {
            provenance: string_field(object, "provenance"),
            is_canonical: bool_field(object, "is_canonical"),
            source_system: string_field(object, "source_system"),
            observed_via,
            confidence: string_field(object, "confidence"),
            validation_status: string_field(object, "validation_status"),
            is_validated: bool_field(object, "is_validated"),
        }
    }
}

/// Precedence: explicit `provenance`, then `is_canonical`, then a
/// `source_system` marker, then `observed_via`. Defaults to `LegacyObserved`.
pub fn derive_provenance(meta: &RecordMeta) -> Provenance {
    if let Some(explicit) = meta.provenance.as_deref() {
        return Provenance::parse(explicit).unwrap_or(Provenance::LegacyObserved);
    }
    if let Some(is_canonical) = meta.is_canonical {
        return if is_canonical {
            Provenance::Canonical
        } else {
            Provenance::LegacyObserved
        };
    }
    if let Some(source) = meta.source_system.as_deref() {
        let source = source.to_ascii_lowercase();
        if CANONICAL_SOURCE_MARKERS
            .iter()
            .any(|marker| source.contains(marker))
        {
            return Provenance::Canonical;
        }
    }
    if meta.observed_via.is_some() {
        return Provenance::LegacyObserved;
    }
    Provenance::LegacyObserved
}

/// Precedence: explicit `confidence`, then `validation_status`, then
/// `is_validated`, then a raw legacy `provenance`. Defaults to `Conditional`.
pub fn derive_confidence(meta: &RecordMeta) -> Confidence {
    if let Some(explicit) = meta.confidence.as_deref() {
        return Confidence::parse(explicit).unwrap_or(Confidence::Conditional);
    }
    if let Some(status) = meta.validation_status.as_deref() {
        match status.trim().to_ascii_lowercase().as_str() {
            "validated" => return Confidence::Safe,
            "pending" => return Confidence::Conditional,
            "failed" => return Confidence::Blocked,
            _ => {}
        }
    }
    if let Some(is_validated) = meta.is_validated {
        return if is_validated {
            Confidence::Safe
        } else {
            Confidence::Blocked
        };
    }
    if meta.provenance.as_deref().and_then(Provenance::parse) == Some(Provenance::LegacyObserved)
    {
        return Confidence::Conditional;
    }
    Confidence::Conditional
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct RecordClassification {
    pub provenance: Provenance,
    pub confidence: Confidence,
}

pub fn classify_record(meta: &RecordMeta) -> RecordClassification {
    RecordClassification {
        provenance: derive_provenance(meta),
        confidence: derive_confidence(meta),
    }
}
