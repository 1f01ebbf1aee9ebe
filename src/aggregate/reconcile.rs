use crate::aggregate::tracker::OperationTracker;
use crate::entry::parser::LogEntry;
use chrono::{DateTime, Utc};
use std::time::Duration;

pub const DEFAULT_STALENESS: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_ERROR_OPERATION: &str = "Error";

/// Rules deciding whether a buffered entry ships now or is requeued.
#[derive(Debug, Clone)]
pub struct ReconcilePolicy {
    /// Maximum age, relative to the run start, before an entry is forced
    /// into the ready set regardless of pairing state.
    pub staleness: Duration,

    /// Operation name marking terminal failures; such entries always ship.
    pub error_operation_name: String,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            staleness: DEFAULT_STALENESS,
            error_operation_name: DEFAULT_ERROR_OPERATION.to_string(),
        }
    }
}

/// Outcome of one reconciliation pass. Every buffered entry lands in exactly
/// one of the two sets, in its original relative order.
#[derive(Debug, Default)]
pub struct Reconciled {
    pub ready: Vec<LogEntry>,
    pub pending: Vec<LogEntry>,
}

/// Classify every buffered entry as ready or pending.
///
/// Precedence, evaluated per entry (entries of one operation may split
/// across the two sets):
/// 1. terminal error marker -> ready, bypassing balance checks;
/// 2. older than the staleness threshold -> ready, guarantees progress even
///    if a matching event is lost forever;
/// 3. otherwise ready iff the operation's final balance is zero.
pub fn reconcile(
    tracker: OperationTracker,
    policy: &ReconcilePolicy,
    run_started: DateTime<Utc>,
) -> Reconciled {
    // A staleness window too large to represent just means nothing is stale.
    let cutoff = chrono::Duration::from_std(policy.staleness)
        .ok()
        .and_then(|d| run_started.checked_sub_signed(d));

    let (buffer, operations) = tracker.into_parts();
    let mut out = Reconciled::default();

    for entry in buffer {
        let terminal = entry.operation_name == policy.error_operation_name;
        let stale = cutoff.is_some_and(|c| entry.time <= c);
        let balanced = operations
            .get(&entry.operation_id)
            .map_or(true, |s| s.balance == 0);

        if terminal || stale || balanced {
            out.ready.push(entry);
        } else {
            out.pending.push(entry);
        }
    }

    out
}
