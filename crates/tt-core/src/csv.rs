//! CSV rendering of time entries.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::entry::Entry;

pub const CSV_HEADER: &str = "ID,User ID,Issue ID,Started At,Ended At,Duration (hours),Description,Tags,Billable,Created At";

fn timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Quotes a field when it contains a delimiter, quote or line break.
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Renders entries as CSV in the order given.
pub fn export_csv<'a>(entries: impl IntoIterator<Item = &'a Entry>) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');

    for entry in entries {
        let fields = [
            entry.id.to_string(),
            escape(entry.user_id.as_str()),
            escape(entry.issue_id.as_str()),
            timestamp(entry.started_at),
            timestamp(entry.ended_at),
            format!("{:.2}", entry.duration_hours()),
            escape(entry.description.as_deref().unwrap_or_default()),
            escape(&entry.tags.join(", ")),
            entry.billable.to_string(),
            timestamp(entry.created_at),
        ];
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}
