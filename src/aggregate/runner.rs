use crate::aggregate::batch::TelemetryBatch;
use crate::aggregate::export;
use crate::aggregate::reconcile::{reconcile, ReconcilePolicy, Reconciled};
use crate::aggregate::tracker::OperationTracker;
use crate::config::Config;
use crate::entry::parser::{parse_lines, LineFilter};
use crate::sink::BatchSink;
use crate::store::{LogStore, StoreError};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// One-shot aggregation pipeline over the log store.
///
/// `run_once` takes `&mut self`: whoever owns the aggregator owns the log
/// file, so a second run cannot start while a rewrite is in flight.
pub struct Aggregator {
    store: LogStore,
    policy: ReconcilePolicy,
    sink: Option<Arc<dyn BatchSink>>,
}

impl Aggregator {
    pub fn new(config: &Config, sink: Option<Arc<dyn BatchSink>>) -> Self {
        let filter = LineFilter::new(config.filter.level, config.filter.exclude_tag.clone());
        Self {
            store: LogStore::new(&config.logs.dir, filter),
            policy: ReconcilePolicy {
                staleness: config.aggregation.staleness,
                error_operation_name: config.aggregation.error_operation_name.clone(),
            },
            sink,
        }
    }

    /// Run one aggregation pass: snapshot, reconcile, hand off, rewrite.
    ///
    /// Returns the batch envelope, or `None` when there was nothing to ship.
    /// The sink hand-off always happens before the destructive rewrite; a
    /// delivery failure is logged and the batch dropped, while a rewrite
    /// failure propagates without touching further file state.
    pub async fn run_once(&mut self) -> Result<Option<TelemetryBatch>, AggregateError> {
        let run_started = Utc::now();

        let snapshot = match self.store.snapshot()? {
            Some(snapshot) => snapshot,
            None => {
                debug!("No log data to aggregate");
                return Ok(None);
            }
        };
        debug!(lines = snapshot.lines.len(), "Snapshot taken");

        let mut tracker = OperationTracker::new();
        tracker.observe_all(parse_lines(snapshot.lines.iter().map(String::as_str)));

        let Reconciled { ready, pending } = reconcile(tracker, &self.policy, run_started);
        info!(
            ready = ready.len(),
            pending = pending.len(),
            "Reconciled snapshot"
        );

        let batch = TelemetryBatch::build(&ready);
        if batch.is_some() {
            if let Some(sink) = &self.sink {
                let csv = export::to_csv(&ready);
                if let Err(e) = sink.deliver(csv, export::CSV_FILENAME).await {
                    error!(error = %e, "Batch delivery failed, dropping batch");
                }
            }
        }

        // Even with nothing to ship, the cut still runs so pending entries
        // are reseeded and already-consumed noise does not pile up.
        let pending_lines: Vec<String> = pending.into_iter().map(|e| e.raw).collect();
        self.store.commit(&snapshot, &pending_lines)?;

        if let Some(batch) = &batch {
            info!(
                entries = batch.data.len(),
                min_timestamp = batch.min_timestamp,
                max_timestamp = batch.max_timestamp,
                "Aggregation run complete"
            );
        }
        Ok(batch)
    }
}
