use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Metadata the backend attaches to a duplicate (`duplicateData`).
///
/// Every field is optional. Parsing never fails: malformed input yields the
/// default (all `None`), and a similarity score outside `[0, 1]` is dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DuplicatePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity_score: Option<f64>,
}

impl DuplicatePayload {
    pub fn parse(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return Self::default();
        }
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => Self::from_value(value),
            Err(e) => {
                warn!("Unparsable duplicate payload, using empty metadata: {}", e);
                Self::default()
            }
        }
    }

    pub fn from_value(value: Value) -> Self {
        let Value::Object(map) = value else {
            return Self::default();
        };

        let text = |key: &str| {
            map.get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Self {
            name: text("name"),
            url: text("url"),
            filename: text("filename"),
            similarity_score: map
                .get("similarity_score")
                .and_then(Value::as_f64)
                .filter(|score| score.is_finite() && (0.0..=1.0).contains(score)),
        }
    }
}
