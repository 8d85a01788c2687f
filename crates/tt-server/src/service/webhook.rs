//! Auto-stopping timers when their issue is closed.

use std::sync::Arc;

use serde::Deserialize;
use tt_core::{AUTO_STOPPED_TAG, IssueId};
use tt_store::TimeStore;

use super::{ServiceError, TimerService, required};

/// Description given to auto-stopped entries whose timer had none.
pub const AUTO_STOP_DESCRIPTION: &str = "Auto-stopped on issue closure";

const CLOSING_STATUSES: [&str; 2] = ["closed", "done"];

/// Payload of an issue-transition event from the issue tracker.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssueTransition {
    pub issue_id: Option<String>,
    pub to_status: Option<String>,
}

/// Reacts to issue transitions.
#[derive(Clone)]
pub struct WebhookHandler {
    store: Arc<TimeStore>,
    timers: TimerService,
}

impl WebhookHandler {
    pub fn new(store: Arc<TimeStore>, timers: TimerService) -> Self {
        Self { store, timers }
    }

    /// Stops every timer on the issue when it moves to a closing status.
    ///
    /// Returns how many timers were stopped. Timers started after the scan
    /// begins are not affected.
    pub fn handle_issue_transition(&self, event: IssueTransition) -> Result<usize, ServiceError> {
        let issue_id = IssueId::new(required(event.issue_id, "issue_id")?)?;
        let to_status = required(event.to_status, "to_status")?;

        let status = to_status.trim().to_ascii_lowercase();
        if !CLOSING_STATUSES.contains(&status.as_str()) {
            tracing::debug!(issue_id = %issue_id, to_status, "transition ignored");
            return Ok(0);
        }

        let mut stopped = 0;
        for timer in self
            .store
            .list_active_timers()
            .into_iter()
            .filter(|timer| timer.issue_id == issue_id)
        {
            if let Some(entry) = self.timers.auto_stop(
                &timer.user_id,
                &issue_id,
                AUTO_STOP_DESCRIPTION,
                AUTO_STOPPED_TAG,
            ) {
                tracing::info!(
                    id = %entry.id,
                    user_id = %entry.user_id,
                    issue_id = %issue_id,
                    "timer auto-stopped"
                );
                stopped += 1;
            }
        }
        Ok(stopped)
    }
}
