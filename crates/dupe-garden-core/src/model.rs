use crate::payload::DuplicatePayload;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// The backend service a duplicate was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    Database,
    Storage,
}

impl Service {
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Database => "database",
            Service::Storage => "storage",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Service {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "database" => Ok(Service::Database),
            "storage" => Ok(Service::Storage),
            other => Err(format!("unknown service '{}' (expected database or storage)", other)),
        }
    }
}

/// Content kind of a duplicate. Unknown tags from the backend are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DuplicateKind {
    Text,
    File,
    Other(String),
}

impl DuplicateKind {
    pub fn as_str(&self) -> &str {
        match self {
            DuplicateKind::Text => "text",
            DuplicateKind::File => "file",
            DuplicateKind::Other(s) => s,
        }
    }
}

impl From<String> for DuplicateKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "text" => DuplicateKind::Text,
            "file" => DuplicateKind::File,
            _ => DuplicateKind::Other(s),
        }
    }
}

impl From<DuplicateKind> for String {
    fn from(kind: DuplicateKind) -> Self {
        kind.as_str().to_string()
    }
}

/// Lifecycle tag of a duplicate record. Missing on the wire means active.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecordStatus {
    #[default]
    Active,
    Pending,
    Resolved,
    Ignored,
    Deleted,
    Other(String),
}

impl RecordStatus {
    pub fn as_str(&self) -> &str {
        match self {
            RecordStatus::Active => "active",
            RecordStatus::Pending => "pending",
            RecordStatus::Resolved => "resolved",
            RecordStatus::Ignored => "ignored",
            RecordStatus::Deleted => "deleted",
            RecordStatus::Other(s) => s,
        }
    }
}

impl From<String> for RecordStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "active" => RecordStatus::Active,
            "pending" => RecordStatus::Pending,
            "resolved" => RecordStatus::Resolved,
            "ignored" => RecordStatus::Ignored,
            "deleted" => RecordStatus::Deleted,
            _ => RecordStatus::Other(s),
        }
    }
}

impl From<RecordStatus> for String {
    fn from(status: RecordStatus) -> Self {
        status.as_str().to_string()
    }
}

/// One detected duplicate, as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateRecord {
    #[serde(rename = "$id")]
    pub id: String,
    pub service: Service,
    #[serde(rename = "type")]
    pub kind: DuplicateKind,
    #[serde(default)]
    pub original_id: String,
    pub duplicate_id: String,
    #[serde(
        rename = "duplicateData",
        default,
        deserialize_with = "deserialize_payload",
        serialize_with = "serialize_payload"
    )]
    pub payload: DuplicatePayload,
    #[serde(default)]
    pub status: RecordStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket_id: Option<String>,
}

impl DuplicateRecord {
    /// Parsed display name, falling back to the duplicate's source id.
    pub fn display_name(&self) -> &str {
        self.payload.name.as_deref().unwrap_or(&self.duplicate_id)
    }

    /// Similarity score with a missing score counted as 0.
    pub fn similarity(&self) -> f64 {
        self.payload.similarity_score.unwrap_or(0.0)
    }
}

// The backend ships `duplicateData` as a JSON string; anything unparsable becomes an empty payload.
fn deserialize_payload<'de, D>(deserializer: D) -> Result<DuplicatePayload, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(match raw {
        serde_json::Value::String(s) => DuplicatePayload::parse(&s),
        serde_json::Value::Object(_) => DuplicatePayload::from_value(raw),
        _ => DuplicatePayload::default(),
    })
}

fn serialize_payload<S>(payload: &DuplicatePayload, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let raw = serde_json::to_string(payload).map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&raw)
}

/// A database, storage bucket or collection exposed by a connected project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectResource {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Databases and storage buckets of one project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectResources {
    pub databases: Vec<ProjectResource>,
    pub storages: Vec<ProjectResource>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_deserializes_wire_shape() {
        let raw = r#"{
            "$id": "dup-1",
            "service": "storage",
            "type": "file",
            "originalId": "file-a",
            "duplicateId": "file-b",
            "duplicateData": "{\"name\":\"cat.png\",\"similarity_score\":0.93}",
            "status": "active",
            "bucketId": "bucket-1"
        }"#;
        let record: DuplicateRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.id, "dup-1");
        assert_eq!(record.service, Service::Storage);
        assert_eq!(record.kind, DuplicateKind::File);
        assert_eq!(record.status, RecordStatus::Active);
        assert_eq!(record.display_name(), "cat.png");
        assert_eq!(record.payload.similarity_score, Some(0.93));
        assert_eq!(record.bucket_id.as_deref(), Some("bucket-1"));
        assert_eq!(record.database_id, None);
    }

    #[test]
    fn test_malformed_payload_degrades_to_empty() {
        let raw = r#"{
            "$id": "dup-2",
            "service": "database",
            "type": "text",
            "originalId": "doc-a",
            "duplicateId": "doc-b",
            "duplicateData": "{not json",
            "status": "pending"
        }"#;
        let record: DuplicateRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.payload, DuplicatePayload::default());
        assert_eq!(record.display_name(), "doc-b");
        assert_eq!(record.similarity(), 0.0);
    }

    #[test]
    fn test_missing_status_defaults_to_active() {
        let raw = r#"{"$id":"dup-3","service":"storage","type":"file","duplicateId":"file-c"}"#;
        let record: DuplicateRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.status, RecordStatus::Active);
        assert_eq!(record.original_id, "");
    }

    #[test]
    fn test_unknown_tags_are_preserved() {
        assert_eq!(DuplicateKind::from("image".to_string()).as_str(), "image");
        assert_eq!(RecordStatus::from("archived".to_string()).as_str(), "archived");
        assert_eq!("Storage".parse::<Service>(), Ok(Service::Storage));
        assert!("bucket".parse::<Service>().is_err());
    }
}
