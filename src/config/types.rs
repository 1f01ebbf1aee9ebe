use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logs: LogsConfig,
    pub filter: FilterConfig,
    pub aggregation: AggregationConfig,
    pub sink: SinkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogsConfig {
    /// Directory holding the append-only log file and the transient working
    /// file used during a rewrite.
    pub dir: PathBuf,
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Severity level a line must carry to enter a run.
    pub level: i64,

    /// Category tag excluding a line even at the matching level.
    pub exclude_tag: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            level: 15,
            exclude_tag: "level-change".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Entries older than this (relative to the run start) are shipped even
    /// if their operation is still unbalanced.
    #[serde(with = "humantime_serde")]
    pub staleness: Duration,

    /// How often a run fires when the binary runs as a daemon.
    #[serde(with = "humantime_serde")]
    pub interval: Duration,

    /// Operation name marking terminal failures; such entries always ship.
    pub error_operation_name: String,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            staleness: Duration::from_secs(5 * 60),
            interval: Duration::from_secs(60),
            error_operation_name: "Error".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Collector endpoint for the multipart upload. When absent, batches are
    /// aggregated and the log file is still rewritten, but nothing is sent.
    pub url: Option<String>,

    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout: Duration::from_secs(30),
        }
    }
}
