use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed log line: {0}")]
    Json(#[from] serde_json::Error),

    #[error("timestamp out of range: {0}")]
    Timestamp(i64),
}

/// One parsed operation-tracing event. Immutable once parsed.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub time: DateTime<Utc>,
    pub event_name: String,
    pub operation_id: String,
    pub operation_name: String,
    pub hostname: String,
    pub msg: String,
    pub values: [Option<String>; 4],

    /// The original line text. Pending entries are requeued to the log file
    /// via this field, so fields we never model (notably the severity level
    /// the upstream filter keys on) survive a requeue byte-for-byte.
    pub raw: String,
}

impl LogEntry {
    /// Event time as epoch milliseconds, the wire representation used by both
    /// the upstream lines and the batch envelope.
    pub fn time_millis(&self) -> i64 {
        self.time.timestamp_millis()
    }
}

// Wire shape of an upstream line. Everything beyond `time`, `Event_name` and
// `Id_operation` is optional in practice.
#[derive(Debug, Deserialize)]
struct RawEntry {
    time: i64,
    #[serde(rename = "Event_name")]
    event_name: String,
    #[serde(rename = "Id_operation")]
    operation_id: String,
    #[serde(rename = "Operation_name", default)]
    operation_name: String,
    #[serde(default)]
    hostname: String,
    #[serde(default)]
    msg: String,
    #[serde(rename = "Event_value1", default)]
    event_value1: Option<serde_json::Value>,
    #[serde(rename = "Event_value2", default)]
    event_value2: Option<serde_json::Value>,
    #[serde(rename = "Event_value3", default)]
    event_value3: Option<serde_json::Value>,
    #[serde(rename = "Event_value4", default)]
    event_value4: Option<serde_json::Value>,
}

// Event values are usually strings but some producers emit bare numbers.
fn value_string(value: Option<serde_json::Value>) -> Option<String> {
    match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    }
}

/// Parse a single filtered log line into a [`LogEntry`].
pub fn parse_line(line: &str) -> Result<LogEntry, ParseError> {
    let raw: RawEntry = serde_json::from_str(line)?;
    let time = Utc
        .timestamp_millis_opt(raw.time)
        .single()
        .ok_or(ParseError::Timestamp(raw.time))?;

    Ok(LogEntry {
        time,
        event_name: raw.event_name,
        operation_id: raw.operation_id,
        operation_name: raw.operation_name,
        hostname: raw.hostname,
        msg: raw.msg,
        values: [
            value_string(raw.event_value1),
            value_string(raw.event_value2),
            value_string(raw.event_value3),
            value_string(raw.event_value4),
        ],
        raw: line.to_string(),
    })
}

/// Lazily parse a sequence of lines in order. A line that fails structural
/// parsing is dropped with a warning; the rest of the sequence still flows.
pub fn parse_lines<'a, I>(lines: I) -> impl Iterator<Item = LogEntry> + 'a
where
    I: IntoIterator<Item = &'a str>,
    I::IntoIter: 'a,
{
    lines.into_iter().filter_map(|line| match parse_line(line) {
        Ok(entry) => Some(entry),
        Err(e) => {
            tracing::warn!(error = %e, "Dropping malformed log line");
            None
        }
    })
}

/// Severity/category filter applied to raw lines before parsing. A line
/// passes when it carries the configured severity level and does not carry
/// the excluded category tag.
#[derive(Debug, Clone)]
pub struct LineFilter {
    level_needle: String,
    exclude_tag: String,
}

impl LineFilter {
    pub fn new(level: i64, exclude_tag: impl Into<String>) -> Self {
        Self {
            level_needle: format!("\"level\":{}", level),
            exclude_tag: exclude_tag.into(),
        }
    }

    pub fn matches(&self, line: &str) -> bool {
        line.contains(&self.level_needle) && !line.contains(&self.exclude_tag)
    }
}
