use crate::entry::parser::LogEntry;
use std::borrow::Cow;

pub const CSV_FILENAME: &str = "telhub_logs.csv";

const HEADER: &str =
    "hostname,Id_operation,Operation_name,Event_name,time,Event_value1,Event_value2,Event_value3,Event_value4";

/// Marker written for absent optional fields so the schema stays fixed-width.
const NULL_FIELD: &str = "null";

/// Project the ready set into the fixed-column tabular export.
pub fn to_csv(entries: &[LogEntry]) -> String {
    let mut out = String::with_capacity(HEADER.len() + 1 + entries.len() * 64);
    out.push_str(HEADER);
    out.push('\n');

    for entry in entries {
        push_row(&mut out, entry);
    }

    out
}

fn push_row(out: &mut String, entry: &LogEntry) {
    let time = entry.time_millis().to_string();
    let fields = [
        escape(&entry.hostname),
        escape(&entry.operation_id),
        escape(&entry.operation_name),
        escape(&entry.event_name),
        Cow::Borrowed(time.as_str()),
        value_field(&entry.values[0]),
        value_field(&entry.values[1]),
        value_field(&entry.values[2]),
        value_field(&entry.values[3]),
    ];

    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(field);
    }
    out.push('\n');
}

fn value_field(value: &Option<String>) -> Cow<'_, str> {
    match value {
        Some(v) => escape(v),
        None => Cow::Borrowed(NULL_FIELD),
    }
}

// RFC 4180 style quoting, applied only when the field needs it.
fn escape(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}
