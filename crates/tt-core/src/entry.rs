//! Completed time entries and the arithmetic that keeps them consistent.
//!
//! An entry's `duration_seconds` is always `ended_at - started_at` truncated
//! to whole seconds; `duration_hours` is derived from it on output and never
//! stored.

use chrono::{DateTime, Duration, Utc};
use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::time::seconds_to_hours;
use crate::types::{EntryId, IssueId, UserId, ValidationError};

/// Tag appended to entries produced by a webhook auto-stop.
pub const AUTO_STOPPED_TAG: &str = "auto-stopped";

/// A finalized record of time spent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub id: EntryId,
    pub user_id: UserId,
    pub issue_id: IssueId,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_seconds: i64,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub billable: bool,
    pub created_at: DateTime<Utc>,
}

impl Entry {
    pub fn duration_hours(&self) -> f64 {
        seconds_to_hours(self.duration_seconds)
    }
}

impl Serialize for Entry {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Entry", 11)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("user_id", &self.user_id)?;
        state.serialize_field("issue_id", &self.issue_id)?;
        state.serialize_field("started_at", &self.started_at)?;
        state.serialize_field("ended_at", &self.ended_at)?;
        state.serialize_field("duration_seconds", &self.duration_seconds)?;
        state.serialize_field("duration_hours", &self.duration_hours())?;
        state.serialize_field("description", &self.description)?;
        state.serialize_field("tags", &self.tags)?;
        state.serialize_field("billable", &self.billable)?;
        state.serialize_field("created_at", &self.created_at)?;
        state.end()
    }
}

/// An entry that has not been assigned an ID yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    pub user_id: UserId,
    pub issue_id: IssueId,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub billable: bool,
    pub created_at: DateTime<Utc>,
}

impl NewEntry {
    /// Attaches the store-assigned ID and computes the duration.
    pub fn into_entry(self, id: EntryId) -> Entry {
        Entry {
            id,
            user_id: self.user_id,
            issue_id: self.issue_id,
            duration_seconds: span_seconds(self.started_at, self.ended_at),
            started_at: self.started_at,
            ended_at: self.ended_at,
            description: self.description,
            tags: self.tags,
            billable: self.billable,
            created_at: self.created_at,
        }
    }
}

/// Whole seconds between two instants, truncated toward zero.
pub fn span_seconds(started_at: DateTime<Utc>, ended_at: DateTime<Utc>) -> i64 {
    (ended_at - started_at).num_seconds()
}

fn offset(started_at: DateTime<Utc>, seconds: i64) -> Result<DateTime<Utc>, ValidationError> {
    if seconds < 0 {
        return Err(ValidationError::NegativeDuration { seconds });
    }
    Duration::try_seconds(seconds)
        .and_then(|delta| started_at.checked_add_signed(delta))
        .ok_or(ValidationError::DurationOutOfRange { seconds })
}

/// Resolves the end of a manually created entry.
///
/// An explicit `ended_at` wins over `duration_seconds`; with neither the
/// entry is rejected.
pub fn resolve_end(
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    duration_seconds: Option<i64>,
) -> Result<DateTime<Utc>, ValidationError> {
    let ended_at = match (ended_at, duration_seconds) {
        (Some(ended_at), _) => ended_at,
        (None, Some(seconds)) => offset(started_at, seconds)?,
        (None, None) => return Err(ValidationError::MissingEnd),
    };
    let seconds = span_seconds(started_at, ended_at);
    if ended_at < started_at {
        return Err(ValidationError::NegativeDuration { seconds });
    }
    Ok(ended_at)
}

/// A partial update to an existing entry. Absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryPatch {
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i64>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub billable: Option<bool>,
}

impl EntryPatch {
    /// Returns the patched entry without touching the original.
    ///
    /// Order: `started_at`, then `duration_seconds` moves `ended_at` to
    /// `started_at + duration_seconds`, then an explicit `ended_at` is
    /// written, then the duration is recomputed from the final times. IDs,
    /// owner, issue and `created_at` never change.
    pub fn apply(&self, entry: &Entry) -> Result<Entry, ValidationError> {
        let mut updated = entry.clone();

        if let Some(started_at) = self.started_at {
            updated.started_at = started_at;
        }
        if let Some(seconds) = self.duration_seconds {
            updated.ended_at = offset(updated.started_at, seconds)?;
        }
        if let Some(ended_at) = self.ended_at {
            updated.ended_at = ended_at;
        }

        let seconds = span_seconds(updated.started_at, updated.ended_at);
        if updated.ended_at < updated.started_at {
            return Err(ValidationError::NegativeDuration { seconds });
        }
        updated.duration_seconds = seconds;

        if let Some(description) = &self.description {
            updated.description = Some(description.clone());
        }
        if let Some(tags) = &self.tags {
            updated.tags.clone_from(tags);
        }
        if let Some(billable) = self.billable {
            updated.billable = billable;
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 10, hour, minute, 0).unwrap()
    }

    fn entry() -> Entry {
        NewEntry {
            user_id: UserId::new("alice").unwrap(),
            issue_id: IssueId::new("PROJ-1").unwrap(),
            started_at: at(9, 0),
            ended_at: at(10, 0),
            description: None,
            tags: vec!["development".to_string()],
            billable: true,
            created_at: at(10, 0),
        }
        .into_entry(EntryId::new(1))
    }

    #[test]
    #[expect(clippy::float_cmp, reason = "rounded values are exact")]
    fn into_entry_computes_duration() {
        let entry = entry();
        assert_eq!(entry.duration_seconds, 3600);
        assert_eq!(entry.duration_hours(), 1.0);
    }

    #[test]
    fn span_truncates_toward_zero() {
        let start = at(9, 0);
        let end = start + Duration::milliseconds(59_999);
        assert_eq!(span_seconds(start, end), 59);
    }

    #[test]
    fn resolve_end_from_duration() {
        assert_eq!(resolve_end(at(9, 0), None, Some(3600)).unwrap(), at(10, 0));
    }

    #[test]
    fn resolve_end_prefers_explicit_end() {
        assert_eq!(
            resolve_end(at(9, 0), Some(at(9, 30)), Some(3600)).unwrap(),
            at(9, 30)
        );
    }

    #[test]
    fn resolve_end_rejects_missing_and_negative() {
        assert_eq!(
            resolve_end(at(9, 0), None, None).unwrap_err(),
            ValidationError::MissingEnd
        );
        assert_eq!(
            resolve_end(at(9, 0), Some(at(8, 0)), None).unwrap_err(),
            ValidationError::NegativeDuration { seconds: -3600 }
        );
        assert_eq!(
            resolve_end(at(9, 0), None, Some(-1)).unwrap_err(),
            ValidationError::NegativeDuration { seconds: -1 }
        );
        assert!(matches!(
            resolve_end(at(9, 0), None, Some(i64::MAX)),
            Err(ValidationError::DurationOutOfRange { .. })
        ));
    }

    #[test]
    fn patch_duration_moves_end() {
        let patch = EntryPatch {
            duration_seconds: Some(1800),
            ..EntryPatch::default()
        };
        let updated = patch.apply(&entry()).unwrap();
        assert_eq!(updated.ended_at, at(9, 30));
        assert_eq!(updated.duration_seconds, 1800);
    }

    #[test]
    fn patch_start_recomputes_duration() {
        let patch = EntryPatch {
            started_at: Some(at(9, 45)),
            ..EntryPatch::default()
        };
        let updated = patch.apply(&entry()).unwrap();
        assert_eq!(updated.ended_at, at(10, 0));
        assert_eq!(updated.duration_seconds, 900);
    }

    #[test]
    fn later_end_patch_composes_with_earlier_duration_patch() {
        let first = EntryPatch {
            duration_seconds: Some(600),
            ..EntryPatch::default()
        }
        .apply(&entry())
        .unwrap();
        let second = EntryPatch {
            ended_at: Some(at(11, 0)),
            ..EntryPatch::default()
        }
        .apply(&first)
        .unwrap();
        assert_eq!(second.duration_seconds, 7200);
    }

    #[test]
    fn explicit_end_wins_over_duration_in_one_patch() {
        let patch = EntryPatch {
            duration_seconds: Some(600),
            ended_at: Some(at(11, 0)),
            ..EntryPatch::default()
        };
        let updated = patch.apply(&entry()).unwrap();
        assert_eq!(updated.ended_at, at(11, 0));
        assert_eq!(updated.duration_seconds, 7200);
    }

    #[test]
    fn negative_duration_is_rejected_even_when_end_is_given() {
        let patch = EntryPatch {
            duration_seconds: Some(-60),
            ended_at: Some(at(11, 0)),
            ..EntryPatch::default()
        };
        assert!(patch.apply(&entry()).is_err());
    }

    #[test]
    fn patch_rejects_negative_span_without_mutating() {
        let original = entry();
        let patch = EntryPatch {
            ended_at: Some(at(8, 0)),
            billable: Some(false),
            ..EntryPatch::default()
        };
        assert!(patch.apply(&original).is_err());
        assert!(original.billable);
        assert_eq!(original.ended_at, at(10, 0));
    }

    #[test]
    fn patch_updates_metadata_only() {
        let patch = EntryPatch {
            description: Some("code review".to_string()),
            tags: Some(vec!["review".to_string()]),
            billable: Some(false),
            ..EntryPatch::default()
        };
        let original = entry();
        let updated = patch.apply(&original).unwrap();
        assert_eq!(updated.description.as_deref(), Some("code review"));
        assert_eq!(updated.tags, vec!["review"]);
        assert!(!updated.billable);
        assert_eq!(updated.id, original.id);
        assert_eq!(updated.created_at, original.created_at);
        assert_eq!(updated.duration_seconds, original.duration_seconds);
    }

    #[test]
    fn entry_serializes_derived_hours() {
        let json = serde_json::to_value(entry()).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["duration_seconds"], 3600);
        assert_eq!(json["duration_hours"], 1.0);
        assert_eq!(json["ended_at"], "2025-11-10T10:00:00Z");
        assert!(json["description"].is_null());
    }
}
