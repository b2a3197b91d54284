use crate::error::Error;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Scan,
    Delete,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Scan => "scan",
            ActivityKind::Delete => "delete",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An audit entry about to be recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewActivity {
    pub user_id: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

/// An audit entry as listed back from a sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(rename = "$id", default)]
    pub id: String,
    pub message: String,
    pub timestamp: String,
    /// Free-form on the wire: other parts of the dashboard log their own types.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub project_id: Option<String>,
}

/// Where audit entries go. Callers treat failures as non-fatal.
#[async_trait]
pub trait ActivitySink: Send + Sync {
    async fn record(&self, activity: &NewActivity) -> Result<(), Error>;
}

/// Drops every activity.
pub struct NullSink;

#[async_trait]
impl ActivitySink for NullSink {
    async fn record(&self, _activity: &NewActivity) -> Result<(), Error> {
        Ok(())
    }
}

/// Sends each activity to every inner sink, even when an earlier one fails.
/// Reports the first failure.
pub struct FanoutSink {
    sinks: Vec<Arc<dyn ActivitySink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn ActivitySink>>) -> Self {
        Self { sinks }
    }
}

#[async_trait]
impl ActivitySink for FanoutSink {
    async fn record(&self, activity: &NewActivity) -> Result<(), Error> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.record(activity).await {
                warn!("Activity sink failed: {}", e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
