use crate::entry::parser::LogEntry;
use serde::{Deserialize, Serialize};

pub const BATCH_CONTEXT: &str = "http://schema.org/";
pub const BATCH_TYPE: &str = "OTTelemetry";

/// JSON-LD envelope handed to the caller after a successful run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryBatch {
    #[serde(rename = "@context")]
    pub context: String,

    #[serde(rename = "@type")]
    pub batch_type: String,

    /// Smallest event timestamp in the batch, epoch milliseconds.
    #[serde(rename = "minTimestamp")]
    pub min_timestamp: i64,

    /// Largest event timestamp in the batch, epoch milliseconds.
    #[serde(rename = "maxTimestamp")]
    pub max_timestamp: i64,

    pub data: Vec<TelemetryRecord>,
}

/// Normalized record shape shared by the JSON envelope and the CSV export.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryRecord {
    pub event_name: String,
    pub event_timestamp: i64,
    pub operation_id: String,
    pub operation_name: String,
    pub msg: String,
}

impl TelemetryRecord {
    fn from_entry(entry: &LogEntry) -> Self {
        Self {
            event_name: entry.event_name.clone(),
            event_timestamp: entry.time_millis(),
            operation_id: entry.operation_id.clone(),
            operation_name: entry.operation_name.clone(),
            msg: entry.msg.clone(),
        }
    }
}

impl TelemetryBatch {
    /// Assemble the envelope from the ready set. An empty ready set means
    /// there is nothing to ship; that is a `None`, not an error.
    pub fn build(entries: &[LogEntry]) -> Option<Self> {
        let min_timestamp = entries.iter().map(LogEntry::time_millis).min()?;
        let max_timestamp = entries.iter().map(LogEntry::time_millis).max()?;

        Some(Self {
            context: BATCH_CONTEXT.to_string(),
            batch_type: BATCH_TYPE.to_string(),
            min_timestamp,
            max_timestamp,
            data: entries.iter().map(TelemetryRecord::from_entry).collect(),
        })
    }
}
