use serde::{Deserialize, Deserializer, Serialize};

use super::enums::RecordStatus;

/// One well-ownership entry in the ledger.
///
/// `None` means the field was not found in the source document; an empty
/// string is a value the reviewer typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WellRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub county: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_description: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_lenient_string"
    )]
    pub decimal_interest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_lenient_status"
    )]
    pub status: Option<RecordStatus>,
}

/// Identity of a logical well entry: (property name, operator, entity, effective date),
/// each trimmed, lowercased and whitespace-collapsed. Missing fields key as "".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey {
    pub property_name: String,
    pub operator: String,
    pub entity: String,
    pub effective_date: String,
}

impl WellRecord {
    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey {
            property_name: key_part(self.property_name.as_deref()),
            operator: key_part(self.operator.as_deref()),
            entity: key_part(self.entity.as_deref()),
            effective_date: key_part(self.effective_date.as_deref()),
        }
    }

    /// Sort key for dashboard snapshots. Dates are compared as plain strings.
    pub fn effective_date_sort_key(&self) -> &str {
        self.effective_date.as_deref().unwrap_or("")
    }
}

fn key_part(value: Option<&str>) -> String {
    value
        .unwrap_or("")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Fields a reviewer may change on a stored record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordUpdate {
    #[serde(default)]
    pub notes: Option<String>,
    /// Raw status text; validated against `RecordStatus` by the store.
    #[serde(default)]
    pub status: Option<String>,
}

impl RecordUpdate {
    pub fn is_empty(&self) -> bool {
        self.notes.is_none() && self.status.is_none()
    }
}

/// Accepts a JSON string or number (legacy snapshots and LLM output store
/// interests as numbers) and keeps the textual form.
fn deserialize_lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

/// Accepts any status text. Display names match case-insensitively and
/// snake_case forms (`title_issue`) are read as their spaced names. Anything
/// else (`in_pay` from older snapshots) becomes `None` with a warning so one
/// stale value never rejects the whole record.
fn deserialize_lenient_status<'de, D>(deserializer: D) -> Result<Option<RecordStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<serde_json::Value>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let text = match &raw {
        serde_json::Value::Null => return Ok(None),
        serde_json::Value::String(s) if s.trim().is_empty() => return Ok(None),
        serde_json::Value::String(s) => s.replace('_', " "),
        other => other.to_string(),
    };
    match text.parse::<RecordStatus>() {
        Ok(status) => Ok(Some(status)),
        Err(_) => {
            tracing::warn!(status = %raw, "Unrecognized record status, leaving it unset");
            Ok(None)
        }
    }
}
