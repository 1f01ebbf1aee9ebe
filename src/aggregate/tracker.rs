use crate::entry::parser::LogEntry;
use std::collections::HashMap;

/// Per-operation tally of unmatched "start" events seen in the current run.
///
/// `events` holds positions in the run's arrival-ordered buffer. The balance
/// is a heuristic: it approximates "is this operation's span fully observed
/// in the current buffer" and cannot distinguish "never started" from
/// "started in a previous run and already shipped".
#[derive(Debug)]
pub struct OperationState {
    pub operation_id: String,
    pub balance: u32,
    pub events: Vec<usize>,
}

/// Tracks open/closed events per logical operation id across one run.
/// All state lives for the duration of a single aggregation pass.
#[derive(Debug, Default)]
pub struct OperationTracker {
    buffer: Vec<LogEntry>,
    operations: HashMap<String, OperationState>,
}

impl OperationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one entry, in file order. An "end" without an open "start" leaves
    /// the balance at zero; the entry is still recorded either way.
    pub fn observe(&mut self, entry: LogEntry) {
        let state = self
            .operations
            .entry(entry.operation_id.clone())
            .or_insert_with(|| OperationState {
                operation_id: entry.operation_id.clone(),
                balance: 0,
                events: Vec::new(),
            });

        if entry.event_name.ends_with("start") {
            state.balance += 1;
        } else if entry.event_name.ends_with("end") && state.balance > 0 {
            state.balance -= 1;
        }

        state.events.push(self.buffer.len());
        self.buffer.push(entry);
    }

    pub fn observe_all(&mut self, entries: impl IntoIterator<Item = LogEntry>) {
        for entry in entries {
            self.observe(entry);
        }
    }

    /// Final tallied balance for an operation id. Unknown ids count as
    /// balanced.
    pub fn balance(&self, operation_id: &str) -> u32 {
        self.operations
            .get(operation_id)
            .map(|s| s.balance)
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn buffer(&self) -> &[LogEntry] {
        &self.buffer
    }

    pub fn into_parts(self) -> (Vec<LogEntry>, HashMap<String, OperationState>) {
        (self.buffer, self.operations)
    }
}
