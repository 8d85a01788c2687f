//! Starting and stopping per-user timers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tt_core::{ActiveTimer, Clock, Entry, IssueId, NewEntry, Timer, UserId};
use tt_store::{StoreError, TimeStore};

use super::{ServiceError, required};

/// Request to start a timer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartTimer {
    pub user_id: Option<String>,
    pub issue_id: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Request to stop a timer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StopTimer {
    pub user_id: Option<String>,
    /// Replaces the description given at start.
    pub description: Option<String>,
    /// Defaults to true.
    pub billable: Option<bool>,
}

/// How a timer is being closed.
struct Closing {
    ended_at: DateTime<Utc>,
    description: Option<String>,
    extra_tag: Option<&'static str>,
    billable: bool,
}

impl Closing {
    fn entry_for(self, timer: &Timer) -> NewEntry {
        // A timer read under the lock may have been started after `now` was
        // sampled; never produce a negative span.
        let ended_at = self.ended_at.max(timer.started_at);
        let mut tags = timer.tags.clone();
        if let Some(tag) = self.extra_tag {
            tags.push(tag.to_string());
        }
        NewEntry {
            user_id: timer.user_id.clone(),
            issue_id: timer.issue_id.clone(),
            started_at: timer.started_at,
            ended_at,
            description: self.description.or_else(|| timer.description.clone()),
            tags,
            billable: self.billable,
            created_at: self.ended_at,
        }
    }
}

/// Timer operations.
#[derive(Clone)]
pub struct TimerService {
    store: Arc<TimeStore>,
    clock: Arc<dyn Clock>,
}

impl TimerService {
    pub fn new(store: Arc<TimeStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Starts a timer for the user. Fails if one is already running.
    pub fn start(&self, request: StartTimer) -> Result<ActiveTimer, ServiceError> {
        let user_id = UserId::new(required(request.user_id, "user_id")?)?;
        let issue_id = IssueId::new(required(request.issue_id, "issue_id")?)?;

        let timer = Timer {
            user_id,
            issue_id,
            started_at: self.clock.now(),
            description: request.description,
            tags: request.tags,
        };
        let view = timer.at(timer.started_at);
        self.store.put_active_timer(timer)?;

        tracing::info!(
            user_id = %view.timer.user_id,
            issue_id = %view.timer.issue_id,
            "timer started"
        );
        Ok(view)
    }

    /// Stops the user's timer and records it as an entry.
    pub fn stop(&self, request: StopTimer) -> Result<Entry, ServiceError> {
        let user_id = UserId::new(required(request.user_id, "user_id")?)?;
        let closing = Closing {
            ended_at: self.clock.now(),
            description: request.description,
            extra_tag: None,
            billable: request.billable.unwrap_or(true),
        };

        let entry = self
            .store
            .finish_timer(&user_id, |timer| Some(closing.entry_for(timer)))?
            .ok_or(StoreError::TimerNotFound { user_id })?;

        tracing::info!(
            id = %entry.id,
            user_id = %entry.user_id,
            issue_id = %entry.issue_id,
            duration_seconds = entry.duration_seconds,
            "timer stopped"
        );
        Ok(entry)
    }

    /// The user's running timer with elapsed time as of now.
    pub fn get_active(&self, user_id: &str) -> Result<ActiveTimer, ServiceError> {
        let user_id = UserId::new(user_id)?;
        Ok(self.store.active_timer_at(&user_id, self.clock.now())?)
    }

    /// Stops the user's timer if it is still running on `issue_id`.
    ///
    /// Returns `None` when the timer was already stopped, or replaced by one
    /// on a different issue, since the caller looked.
    pub(crate) fn auto_stop(
        &self,
        user_id: &UserId,
        issue_id: &IssueId,
        fallback_description: &str,
        tag: &'static str,
    ) -> Option<Entry> {
        let now = self.clock.now();
        let result = self.store.finish_timer(user_id, |timer| {
            if &timer.issue_id != issue_id {
                return None;
            }
            let closing = Closing {
                ended_at: now,
                description: Some(
                    timer
                        .description
                        .clone()
                        .unwrap_or_else(|| fallback_description.to_string()),
                ),
                extra_tag: Some(tag),
                billable: true,
            };
            Some(closing.entry_for(timer))
        });

        match result {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!(user_id = %user_id, error = %err, "timer gone before auto-stop");
                None
            }
        }
    }
}
