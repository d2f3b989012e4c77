use crate::error::{PayloadError, Result};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};
use tracing::{debug, warn};
use uuid::Uuid;

/// Precedence between the guided-derived properties and the operator's
/// additional JSON when the two share keys.
#[derive(
    Serialize, Deserialize, Display, EnumString, Debug, Clone, Copy, Eq, PartialEq, Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MergePolicy {
    /// Additional properties win on key conflicts.
    Replace,
    /// Additional properties replace the guided output entirely.
    Ignore,
    /// Guided properties win on key conflicts.
    #[default]
    Extend,
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Parse the additional-properties document. Empty text reads as an empty
/// object; anything else must parse as a JSON object or the compile aborts.
pub fn parse_overlay(text: &str) -> Result<Map<String, Value>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Map::new());
    }
    let value: Value = serde_json::from_str(trimmed).map_err(PayloadError::OverlayParse)?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(PayloadError::OverlayNotObject(json_type_name(&other))),
    }
}

/// Combine guided properties with the additional document under the selected
/// policy. Both inputs are left intact; the result is a fresh document.
pub fn merge_payloads(
    props: &Map<String, Value>,
    additional: &Map<String, Value>,
    policy: MergePolicy,
) -> Map<String, Value> {
    debug!("merging payload under {} policy", policy);
    match policy {
        MergePolicy::Replace => {
            let mut merged = props.clone();
            for (key, value) in additional {
                merged.insert(key.clone(), value.clone());
            }
            merged
        }
        MergePolicy::Ignore => additional.clone(),
        MergePolicy::Extend => {
            let mut merged = additional.clone();
            for (key, value) in props {
                merged.insert(key.clone(), value.clone());
            }
            merged
        }
    }
}

/// Make sure the document carries a uuid so the creation result can be
/// correlated with the instance before the backend confirms an identifier.
/// An operator-supplied uuid wins; otherwise the sticky uuid from the
/// previous compile is re-injected, and only when neither exists is a fresh
/// one generated. Returns the uuid in effect.
pub fn ensure_uuid(doc: &mut Map<String, Value>, sticky: Option<Uuid>) -> Uuid {
    if let Some(raw) = doc.get("uuid").and_then(Value::as_str) {
        match Uuid::parse_str(raw) {
            Ok(existing) => return existing,
            Err(err) => {
                warn!("replacing unparsable payload uuid \"{}\": {}", raw, err);
            }
        }
    }

    let uuid = sticky.unwrap_or_else(Uuid::new_v4);
    doc.insert(String::from("uuid"), Value::String(uuid.to_string()));
    uuid
}
