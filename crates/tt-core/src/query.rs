//! Filtering, ordering and aggregation over time entries.
//!
//! Filters combine conjunctively. Within the `tags` filter an entry matches
//! when it carries any of the requested tags.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entry::Entry;
use crate::time::{parse_range_end, parse_timestamp, seconds_to_hours};
use crate::types::ValidationError;

/// Filter values exactly as they arrive in a query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterParams {
    pub user_id: Option<String>,
    pub issue_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub billable: Option<String>,
    pub tags: Option<String>,
}

/// A parsed entry filter. `None` fields do not constrain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFilter {
    pub user_id: Option<String>,
    pub issue_id: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub billable: Option<bool>,
    pub tags: Option<HashSet<String>>,
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn parse_bool(field: &'static str, value: &str) -> Result<bool, ValidationError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ValidationError::InvalidBoolean {
            field,
            value: value.to_string(),
        }),
    }
}

/// Splits a comma-separated tag list, dropping blanks.
pub fn parse_tags(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(String::from)
        .collect()
}

impl FilterParams {
    /// Parses the raw values. `now` resolves relative dates like `today`.
    pub fn parse(&self, now: DateTime<Utc>) -> Result<EntryFilter, ValidationError> {
        let start_date = non_empty(self.start_date.as_ref())
            .map(|v| parse_timestamp("start_date", v, now))
            .transpose()?;
        let end_date = non_empty(self.end_date.as_ref())
            .map(|v| parse_range_end("end_date", v, now))
            .transpose()?;
        let billable = non_empty(self.billable.as_ref())
            .map(|v| parse_bool("billable", v))
            .transpose()?;
        let tags = non_empty(self.tags.as_ref())
            .map(parse_tags)
            .filter(|tags| !tags.is_empty());

        Ok(EntryFilter {
            user_id: non_empty(self.user_id.as_ref()).map(String::from),
            issue_id: non_empty(self.issue_id.as_ref()).map(String::from),
            start_date,
            end_date,
            billable,
            tags,
        })
    }
}

impl EntryFilter {
    pub fn matches(&self, entry: &Entry) -> bool {
        self.user_id
            .as_deref()
            .is_none_or(|user| entry.user_id.as_str() == user)
            && self
                .issue_id
                .as_deref()
                .is_none_or(|issue| entry.issue_id.as_str() == issue)
            && self.start_date.is_none_or(|start| entry.started_at >= start)
            && self.end_date.is_none_or(|end| entry.started_at <= end)
            && self.billable.is_none_or(|billable| entry.billable == billable)
            && self
                .tags
                .as_ref()
                .is_none_or(|tags| entry.tags.iter().any(|tag| tags.contains(tag)))
    }
}

/// Returns the matching entries, most recently started first.
///
/// The sort is stable, so entries with equal start times keep their input
/// order.
pub fn list_entries(entries: impl IntoIterator<Item = Entry>, filter: &EntryFilter) -> Vec<Entry> {
    let mut matched: Vec<Entry> = entries
        .into_iter()
        .filter(|entry| filter.matches(entry))
        .collect();
    matched.sort_by(|a, b| b.started_at.cmp(&a.started_at));
    matched
}

/// Totals for one `by_user` / `by_issue` bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupTotals {
    pub total_seconds: i64,
    pub total_hours: f64,
    pub entry_count: usize,
}

/// Aggregate report over a filtered entry set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub total_entries: usize,
    pub total_seconds: i64,
    pub total_hours: f64,
    pub billable_entries: usize,
    pub billable_seconds: i64,
    pub billable_hours: f64,
    pub non_billable_hours: f64,
    pub by_user: BTreeMap<String, GroupTotals>,
    pub by_issue: BTreeMap<String, GroupTotals>,
}

fn add_to_group(groups: &mut BTreeMap<String, GroupTotals>, key: &str, seconds: i64) {
    let group = groups.entry(key.to_string()).or_default();
    group.total_seconds += seconds;
    group.entry_count += 1;
}

fn finish_groups(groups: &mut BTreeMap<String, GroupTotals>) {
    for group in groups.values_mut() {
        group.total_hours = seconds_to_hours(group.total_seconds);
    }
}

/// Summarizes the entries that match `filter`.
///
/// `non_billable_hours` is the difference of the two rounded totals rather
/// than an independent sum, so it always reconciles with the numbers shown
/// next to it.
pub fn summarize<'a>(entries: impl IntoIterator<Item = &'a Entry>, filter: &EntryFilter) -> Summary {
    let mut summary = Summary::default();

    for entry in entries.into_iter().filter(|entry| filter.matches(entry)) {
        summary.total_entries += 1;
        summary.total_seconds += entry.duration_seconds;
        if entry.billable {
            summary.billable_entries += 1;
            summary.billable_seconds += entry.duration_seconds;
        }
        add_to_group(&mut summary.by_user, entry.user_id.as_str(), entry.duration_seconds);
        add_to_group(&mut summary.by_issue, entry.issue_id.as_str(), entry.duration_seconds);
    }

    summary.total_hours = seconds_to_hours(summary.total_seconds);
    summary.billable_hours = seconds_to_hours(summary.billable_seconds);
    summary.non_billable_hours = summary.total_hours - summary.billable_hours;
    finish_groups(&mut summary.by_user);
    finish_groups(&mut summary.by_issue);

    tracing::debug!(
        entries = summary.total_entries,
        total_seconds = summary.total_seconds,
        "summarized entries"
    );
    summary
}
