use super::bool_field;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReadinessLevel {
    Ready,
    NotReady,
    Unknown,
}

impl fmt::Display for ReadinessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadinessLevel::Ready => write!(f, "READY"),
            ReadinessLevel::NotReady => write!(f, "NOT_READY"),
            ReadinessLevel::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Backend readiness check results for a campaign.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadinessPayload {
    pub is_ready: Option<bool>,
    pub mailbox_healthy: Option<bool>,
    pub blocking_reasons: Vec<String>,
    pub kill_switch_enabled: Option<bool>,
}

impl ReadinessPayload {
    /// Lenient decode. A bare non-empty string in `blocking_reasons` counts
    /// as a single reason; other wrongly-typed fields are treated as absent.
    pub fn from_json(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let blocking_reasons = match object.get("blocking_reasons") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                })
                .collect(),
            Some(Value::String(text)) if !text.trim().is_empty() => vec![text.clone()],
            _ => Vec::new(),
        };
        Some(Self {
            is_ready: bool_field(object, "is_ready"),
            mailbox_healthy: bool_field(object, "mailbox_healthy"),
            blocking_reasons,
            kill_switch_enabled: bool_field(object, "kill_switch_enabled"),
        })
    }
}

/// Negative signals win over everything; a positive answer needs both
/// `is_ready == true` and a reported mailbox health check.
///
/// Takes no governance input: readiness is computed purely from the payload.
pub fn compute_readiness_level(payload: Option<&ReadinessPayload>) -> ReadinessLevel {
    let Some(payload) = payload else {
        return ReadinessLevel::Unknown;
    };

    if !payload.blocking_reasons.is_empty()
        || payload.kill_switch_enabled == Some(true)
        || payload.is_ready == Some(false)
    {
        return ReadinessLevel::NotReady;
    }

    match (payload.is_ready, payload.mailbox_healthy) {
        (Some(true), Some(_)) => ReadinessLevel::Ready,
        _ => ReadinessLevel::Unknown,
    }
}
