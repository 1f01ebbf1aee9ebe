use async_trait::async_trait;
use chrono::Utc;
use std::fs;
use std::sync::{Arc, Mutex};
use telhub::aggregate::Aggregator;
use telhub::config::Config;
use telhub::sink::{BatchSink, SinkError};
use tempfile::TempDir;

struct RecordingSink {
    deliveries: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingSink {
    fn new() -> Self {
        Self {
            deliveries: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    fn failing() -> Self {
        Self {
            deliveries: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    fn delivered(&self) -> Vec<(String, String)> {
        self.deliveries.lock().unwrap().clone()
    }
}

#[async_trait]
impl BatchSink for RecordingSink {
    async fn deliver(&self, payload: String, filename: &str) -> Result<(), SinkError> {
        if self.fail {
            return Err(SinkError::Collector {
                status: 503,
                message: "unavailable".to_string(),
            });
        }
        self.deliveries
            .lock()
            .unwrap()
            .push((filename.to_string(), payload));
        Ok(())
    }
}

fn config_for(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.logs.dir = dir.path().to_path_buf();
    config
}

fn log_line(time_millis: i64, event: &str, op: &str, op_name: &str) -> String {
    format!(
        r#"{{"level":15,"time":{},"Event_name":"{}","Id_operation":"{}","Operation_name":"{}","hostname":"node-1","msg":"step"}}"#,
        time_millis, event, op, op_name
    )
}

fn write_log(dir: &TempDir, lines: &[String]) {
    let mut content = lines.join("\n");
    content.push('\n');
    fs::write(dir.path().join("active.log"), content).unwrap();
}

fn read_log(dir: &TempDir) -> String {
    fs::read_to_string(dir.path().join("active.log")).unwrap()
}

#[tokio::test]
async fn test_paired_operation_ships_with_min_max_timestamps() {
    let dir = TempDir::new().unwrap();
    let now = Utc::now().timestamp_millis();
    let t0 = now - 2_000;
    let t1 = now - 1_000;
    write_log(
        &dir,
        &[
            log_line(t0, "import-start", "op-1", "import"),
            log_line(t1, "import-end", "op-1", "import"),
        ],
    );

    let sink = Arc::new(RecordingSink::new());
    let mut aggregator = Aggregator::new(&config_for(&dir), Some(sink.clone()));

    let batch = aggregator.run_once().await.unwrap().unwrap();
    assert_eq!(batch.min_timestamp, t0);
    assert_eq!(batch.max_timestamp, t1);
    assert_eq!(batch.data.len(), 2);
    assert_eq!(batch.data[0].event_name, "import-start");
    assert_eq!(batch.data[1].event_name, "import-end");

    // Both entries consumed from the file
    assert_eq!(read_log(&dir), "");

    // The tabular export went to the sink under the fixed filename
    let delivered = sink.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].0, "telhub_logs.csv");
    assert!(delivered[0].1.contains("import-start"));
}

#[tokio::test]
async fn test_unmatched_start_is_requeued() {
    let dir = TempDir::new().unwrap();
    let now = Utc::now().timestamp_millis();
    let start_line = log_line(now - 1_000, "import-start", "op-2", "import");
    write_log(&dir, &[start_line.clone()]);

    let sink = Arc::new(RecordingSink::new());
    let mut aggregator = Aggregator::new(&config_for(&dir), Some(sink.clone()));

    // Nothing ships, nothing is delivered
    assert!(aggregator.run_once().await.unwrap().is_none());
    assert!(sink.delivered().is_empty());

    // The start line was reseeded for the next run
    assert_eq!(read_log(&dir), format!("{}\n", start_line));

    // And the next run sees it again
    assert!(aggregator.run_once().await.unwrap().is_none());
    assert_eq!(read_log(&dir), format!("{}\n", start_line));
}

#[tokio::test]
async fn test_stale_unmatched_start_is_force_flushed() {
    let dir = TempDir::new().unwrap();
    let six_minutes_ago = Utc::now().timestamp_millis() - 6 * 60 * 1000;
    write_log(
        &dir,
        &[log_line(six_minutes_ago, "import-start", "op-3", "import")],
    );

    let mut aggregator = Aggregator::new(&config_for(&dir), None);

    let batch = aggregator.run_once().await.unwrap().unwrap();
    assert_eq!(batch.data.len(), 1);
    assert_eq!(batch.data[0].operation_id, "op-3");
    assert_eq!(read_log(&dir), "");
}

#[tokio::test]
async fn test_error_operation_ships_despite_unmatched_balance() {
    let dir = TempDir::new().unwrap();
    let now = Utc::now().timestamp_millis();
    let start_line = log_line(now - 2_000, "import-start", "op-4", "import");
    write_log(
        &dir,
        &[
            start_line.clone(),
            log_line(now - 1_000, "import-failed", "op-4", "Error"),
        ],
    );

    let mut aggregator = Aggregator::new(&config_for(&dir), None);

    let batch = aggregator.run_once().await.unwrap().unwrap();
    assert_eq!(batch.data.len(), 1);
    assert_eq!(batch.data[0].operation_name, "Error");

    // The unmatched start stays behind
    assert_eq!(read_log(&dir), format!("{}\n", start_line));
}

#[tokio::test]
async fn test_malformed_line_is_skipped_not_fatal() {
    let dir = TempDir::new().unwrap();
    let now = Utc::now().timestamp_millis();
    write_log(
        &dir,
        &[
            log_line(now - 2_000, "import-start", "op-5", "import"),
            // Passes the level filter but is not valid JSON
            r#"{"level":15,"time":broken"#.to_string(),
            log_line(now - 1_000, "import-end", "op-5", "import"),
        ],
    );

    let mut aggregator = Aggregator::new(&config_for(&dir), None);

    let batch = aggregator.run_once().await.unwrap().unwrap();
    assert_eq!(batch.data.len(), 2);
    assert_eq!(read_log(&dir), "");
}

#[tokio::test]
async fn test_missing_log_file_is_idempotent_noop() {
    let dir = TempDir::new().unwrap();
    let mut aggregator = Aggregator::new(&config_for(&dir), None);

    assert!(aggregator.run_once().await.unwrap().is_none());
    assert!(aggregator.run_once().await.unwrap().is_none());

    // No files created, no state mutated
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_lines_below_filter_level_are_ignored() {
    let dir = TempDir::new().unwrap();
    let now = Utc::now().timestamp_millis();
    let debug_line = format!(
        r#"{{"level":30,"time":{},"Event_name":"noise","Id_operation":"op-6","Operation_name":"import"}}"#,
        now
    );
    write_log(&dir, &[debug_line]);

    let mut aggregator = Aggregator::new(&config_for(&dir), None);
    assert!(aggregator.run_once().await.unwrap().is_none());
}

#[tokio::test]
async fn test_delivery_failure_does_not_block_the_cut() {
    let dir = TempDir::new().unwrap();
    let now = Utc::now().timestamp_millis();
    write_log(
        &dir,
        &[
            log_line(now - 2_000, "import-start", "op-7", "import"),
            log_line(now - 1_000, "import-end", "op-7", "import"),
        ],
    );

    let sink = Arc::new(RecordingSink::failing());
    let mut aggregator = Aggregator::new(&config_for(&dir), Some(sink.clone()));

    // The run still succeeds and returns the envelope; the local truncation
    // is not reversed by the delivery failure.
    let batch = aggregator.run_once().await.unwrap().unwrap();
    assert_eq!(batch.data.len(), 2);
    assert_eq!(read_log(&dir), "");
}

#[tokio::test]
async fn test_mixed_operations_split_between_batch_and_requeue() {
    let dir = TempDir::new().unwrap();
    let now = Utc::now().timestamp_millis();
    let open_line = log_line(now - 500, "replicate-start", "op-open", "replicate");
    write_log(
        &dir,
        &[
            log_line(now - 4_000, "import-start", "op-done", "import"),
            open_line.clone(),
            log_line(now - 3_000, "import-end", "op-done", "import"),
        ],
    );

    let mut aggregator = Aggregator::new(&config_for(&dir), None);

    let batch = aggregator.run_once().await.unwrap().unwrap();
    let ids: Vec<_> = batch.data.iter().map(|r| r.operation_id.as_str()).collect();
    assert_eq!(ids, vec!["op-done", "op-done"]);

    assert_eq!(read_log(&dir), format!("{}\n", open_line));
}
