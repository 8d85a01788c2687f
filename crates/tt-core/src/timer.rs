//! Running timers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::time::seconds_to_hours;
use crate::types::{IssueId, UserId};

/// An in-flight tracking session for one user on one issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timer {
    pub user_id: UserId,
    pub issue_id: IssueId,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Timer {
    /// Whole seconds elapsed at `now`, never negative.
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> i64 {
        (now - self.started_at).num_seconds().max(0)
    }

    /// Snapshot of this timer with elapsed time computed at `now`.
    pub fn at(&self, now: DateTime<Utc>) -> ActiveTimer {
        let elapsed_seconds = self.elapsed_seconds(now);
        ActiveTimer {
            timer: self.clone(),
            elapsed_seconds,
            elapsed_hours: seconds_to_hours(elapsed_seconds),
        }
    }
}

/// A timer as reported to callers. Elapsed time is never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveTimer {
    #[serde(flatten)]
    pub timer: Timer,
    pub elapsed_seconds: i64,
    pub elapsed_hours: f64,
}
