//! Total, side-effect free classifiers. Every function has a documented
//! conservative answer for input it does not recognize and never panics.

pub mod confidence;
pub mod governance;
pub mod readiness;

pub use confidence::Confidence;
pub use confidence::Provenance;
pub use confidence::RecordClassification;
pub use confidence::RecordMeta;
pub use confidence::classify_record;
pub use confidence::derive_confidence;
pub use confidence::derive_provenance;
pub use governance::CampaignStatus;
pub use governance::GovernanceState;
pub use governance::classify_governance;
pub use readiness::ReadinessLevel;
pub use readiness::ReadinessPayload;
pub use readiness::compute_readiness_level;

use serde_json::Map;
use serde_json::Value;

/// Non-blank string field, trimmed. Other JSON types count as absent.
pub(crate) fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}

pub(crate) fn bool_field(object: &Map<String, Value>, key: &str) -> Option<bool> {
    object.get(key).and_then(Value::as_bool)
}
