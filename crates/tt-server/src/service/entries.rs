//! Manual entries and queries over recorded time.

use std::sync::Arc;

use serde::Deserialize;
use tt_core::time::parse_timestamp;
use tt_core::{
    Clock, Entry, EntryFilter, EntryId, EntryPatch, FilterParams, IssueId, NewEntry, Summary,
    UserId, export_csv, list_entries, resolve_end, summarize,
};
use tt_store::TimeStore;

use super::{ServiceError, required};

/// Request to record time directly, without a timer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateEntry {
    pub user_id: Option<String>,
    pub issue_id: Option<String>,
    pub started_at: Option<String>,
    pub ended_at: Option<String>,
    pub duration_seconds: Option<i64>,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub billable: Option<bool>,
}

/// Fields that may change on an existing entry. Absent fields are kept.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEntry {
    pub started_at: Option<String>,
    pub ended_at: Option<String>,
    pub duration_seconds: Option<i64>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub billable: Option<bool>,
}

/// Entry CRUD plus list, summary and CSV export.
#[derive(Clone)]
pub struct EntryService {
    store: Arc<TimeStore>,
    clock: Arc<dyn Clock>,
}

impl EntryService {
    pub fn new(store: Arc<TimeStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn create(&self, request: CreateEntry) -> Result<Entry, ServiceError> {
        let now = self.clock.now();
        let user_id = UserId::new(required(request.user_id, "user_id")?)?;
        let issue_id = IssueId::new(required(request.issue_id, "issue_id")?)?;
        let started_at = parse_timestamp(
            "started_at",
            &required(request.started_at, "started_at")?,
            now,
        )?;
        let ended_at = request
            .ended_at
            .map(|value| parse_timestamp("ended_at", &value, now))
            .transpose()?;
        let ended_at = resolve_end(started_at, ended_at, request.duration_seconds)?;

        let entry = self.store.append_entry(NewEntry {
            user_id,
            issue_id,
            started_at,
            ended_at,
            description: request.description,
            tags: request.tags,
            billable: request.billable.unwrap_or(true),
            created_at: now,
        });
        tracing::info!(id = %entry.id, user_id = %entry.user_id, "entry created");
        Ok(entry)
    }

    pub fn get(&self, id: EntryId) -> Result<Entry, ServiceError> {
        Ok(self.store.get_entry(id)?)
    }

    pub fn update(&self, id: EntryId, request: UpdateEntry) -> Result<Entry, ServiceError> {
        let now = self.clock.now();
        let patch = EntryPatch {
            started_at: request
                .started_at
                .map(|value| parse_timestamp("started_at", &value, now))
                .transpose()?,
            ended_at: request
                .ended_at
                .map(|value| parse_timestamp("ended_at", &value, now))
                .transpose()?,
            duration_seconds: request.duration_seconds,
            description: request.description,
            tags: request.tags,
            billable: request.billable,
        };
        let entry = self.store.update_entry(id, &patch)?;
        tracing::info!(id = %entry.id, "entry updated");
        Ok(entry)
    }

    pub fn delete(&self, id: EntryId) -> Result<Entry, ServiceError> {
        let entry = self.store.delete_entry(id)?;
        tracing::info!(id = %entry.id, "entry deleted");
        Ok(entry)
    }

    fn filter(&self, params: &FilterParams) -> Result<EntryFilter, ServiceError> {
        Ok(params.parse(self.clock.now())?)
    }

    /// Matching entries, most recently started first.
    pub fn list(&self, params: &FilterParams) -> Result<Vec<Entry>, ServiceError> {
        let filter = self.filter(params)?;
        Ok(list_entries(self.store.list_entries(), &filter))
    }

    pub fn summarize(&self, params: &FilterParams) -> Result<Summary, ServiceError> {
        let filter = self.filter(params)?;
        Ok(summarize(&self.store.list_entries(), &filter))
    }

    /// CSV of the same rows [`list`](Self::list) returns.
    pub fn export_csv(&self, params: &FilterParams) -> Result<String, ServiceError> {
        let entries = self.list(params)?;
        tracing::debug!(rows = entries.len(), "exporting csv");
        Ok(export_csv(&entries))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use tt_core::{CSV_HEADER, ManualClock, ValidationError};

    use super::*;

    fn setup() -> (EntryService, Arc<TimeStore>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 11, 10, 18, 0, 0).unwrap(),
        ));
        let store = Arc::new(TimeStore::new());
        (EntryService::new(Arc::clone(&store), clock), store)
    }

    fn create(started_at: &str, seconds: i64, tags: &[&str], billable: bool) -> CreateEntry {
        CreateEntry {
            user_id: Some("alice".into()),
            issue_id: Some("PROJ-1".into()),
            started_at: Some(started_at.into()),
            duration_seconds: Some(seconds),
            tags: tags.iter().map(ToString::to_string).collect(),
            billable: Some(billable),
            ..CreateEntry::default()
        }
    }

    #[test]
    fn create_with_duration_sets_end() {
        let (service, _) = setup();
        let entry = service
            .create(create("2025-11-10T12:00:00Z", 3600, &[], true))
            .unwrap();
        assert_eq!(entry.id, EntryId::new(1));
        assert_eq!(entry.ended_at, entry.started_at + Duration::hours(1));
        assert_eq!(entry.created_at, Utc.with_ymd_and_hms(2025, 11, 10, 18, 0, 0).unwrap());
    }

    #[test]
    fn create_with_end_computes_duration() {
        let (service, _) = setup();
        let entry = service
            .create(CreateEntry {
                user_id: Some("alice".into()),
                issue_id: Some("PROJ-1".into()),
                started_at: Some("2025-11-10T12:00:00Z".into()),
                ended_at: Some("2025-11-10T12:45:30Z".into()),
                ..CreateEntry::default()
            })
            .unwrap();
        assert_eq!(entry.duration_seconds, 2730);
        assert!(entry.billable);
    }

    #[test]
    fn create_rejects_invalid_input_without_side_effects() {
        let (service, store) = setup();

        let missing_start = CreateEntry {
            started_at: None,
            ..create("2025-11-10T12:00:00Z", 60, &[], true)
        };
        assert_eq!(
            service.create(missing_start).unwrap_err(),
            ServiceError::Validation(ValidationError::Missing {
                field: "started_at"
            })
        );

        let missing_end = CreateEntry {
            duration_seconds: None,
            ..create("2025-11-10T12:00:00Z", 60, &[], true)
        };
        assert_eq!(
            service.create(missing_end).unwrap_err(),
            ServiceError::Validation(ValidationError::MissingEnd)
        );

        let negative = CreateEntry {
            ended_at: Some("2025-11-10T11:00:00Z".into()),
            ..create("2025-11-10T12:00:00Z", 60, &[], true)
        };
        assert!(matches!(
            service.create(negative),
            Err(ServiceError::Validation(ValidationError::NegativeDuration { .. }))
        ));

        let garbage = create("soon-ish", 60, &[], true);
        assert!(matches!(
            service.create(garbage),
            Err(ServiceError::Validation(ValidationError::InvalidTimestamp { .. }))
        ));

        assert_eq!(store.entry_count(), 0);
    }

    #[test]
    fn update_and_delete_round_trip() {
        let (service, _) = setup();
        let entry = service
            .create(create("2025-11-10T12:00:00Z", 3600, &[], true))
            .unwrap();

        let updated = service
            .update(
                entry.id,
                UpdateEntry {
                    duration_seconds: Some(1800),
                    description: Some("shorter".into()),
                    ..UpdateEntry::default()
                },
            )
            .unwrap();
        assert_eq!(updated.duration_seconds, 1800);
        assert_eq!(updated.ended_at, entry.started_at + Duration::minutes(30));

        service.delete(entry.id).unwrap();
        assert!(matches!(service.get(entry.id), Err(ServiceError::NotFound(_))));
        assert!(matches!(service.delete(entry.id), Err(ServiceError::NotFound(_))));
    }

    #[test]
    fn update_unknown_entry_is_not_found() {
        let (service, _) = setup();
        assert!(matches!(
            service.update(EntryId::new(42), UpdateEntry::default()),
            Err(ServiceError::NotFound(_))
        ));
    }

    #[test]
    #[expect(clippy::float_cmp, reason = "rounded values are exact")]
    fn summary_matches_reference_figures() {
        let (service, _) = setup();
        service
            .create(create("2025-11-10T08:00:00Z", 3600, &[], true))
            .unwrap();
        service
            .create(create("2025-11-10T10:00:00Z", 7200, &[], false))
            .unwrap();
        service
            .create(create("2025-11-10T13:00:00Z", 1800, &[], true))
            .unwrap();

        let summary = service.summarize(&FilterParams::default()).unwrap();
        assert_eq!(summary.total_entries, 3);
        assert_eq!(summary.total_hours, 3.5);
        assert_eq!(summary.billable_hours, 1.5);
        assert_eq!(summary.non_billable_hours, 2.0);
    }

    #[test]
    fn list_and_export_share_filter_and_order() {
        let (service, _) = setup();
        service
            .create(create("2025-11-10T08:00:00Z", 60, &["meeting"], true))
            .unwrap();
        service
            .create(create("2025-11-10T09:00:00Z", 60, &["development"], true))
            .unwrap();
        service
            .create(create("2025-11-10T10:00:00Z", 60, &["meeting"], true))
            .unwrap();

        let params = FilterParams {
            tags: Some("meeting".into()),
            ..FilterParams::default()
        };
        let ids: Vec<u64> = service
            .list(&params)
            .unwrap()
            .iter()
            .map(|e| e.id.value())
            .collect();
        assert_eq!(ids, vec![3, 1]);

        let csv = service.export_csv(&params).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], CSV_HEADER);
        assert!(lines[1].starts_with("3,"));
        assert!(lines[2].starts_with("1,"));
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn bad_filter_is_validation_error() {
        let (service, _) = setup();
        let params = FilterParams {
            billable: Some("sometimes".into()),
            ..FilterParams::default()
        };
        assert!(matches!(
            service.list(&params),
            Err(ServiceError::Validation(_))
        ));
    }
}
