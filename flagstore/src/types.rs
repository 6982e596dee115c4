use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Wire form of a flag, as stored in the cache service and the snapshot file.
/// The flag name is carried by the cache key, not the record.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FlagRecord {
    pub enabled: bool,
    #[serde(default)]
    pub description: String,
    pub updated_at: DateTime<Utc>,
}

impl FlagRecord {
    /// Builds a record stamped with the current time.
    pub fn new<D>(enabled: bool, description: D) -> Self
    where
        D: Into<String>,
    {
        FlagRecord {
            enabled,
            description: description.into(),
            updated_at: Utc::now(),
        }
    }
}

pub type FlagMap = HashMap<String, FlagRecord>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_roundtrip() {
        let record = FlagRecord::new(true, "custom agents");
        let raw = serde_json::to_string(&record).unwrap();
        let decoded: FlagRecord = serde_json::from_str(&raw).unwrap();
        assert_eq!(record, decoded);
    }

    #[test]
    fn missing_description_defaults_to_empty() {
        let raw = r#"{"enabled":false,"updated_at":"2025-08-01T12:00:00Z"}"#;
        let decoded: FlagRecord = serde_json::from_str(raw).unwrap();
        assert!(!decoded.enabled);
        assert_eq!(decoded.description, "");
    }
}
