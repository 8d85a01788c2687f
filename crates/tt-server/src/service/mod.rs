//! Transport-agnostic operations over the shared store.
//!
//! Each service is cheap to clone: it holds `Arc`s to the one
//! [`TimeStore`](tt_store::TimeStore) and [`Clock`](tt_core::Clock) the
//! process shares.

mod entries;
mod timer;
mod webhook;

use thiserror::Error;
use tt_core::ValidationError;
use tt_store::StoreError;

pub use entries::{CreateEntry, EntryService, UpdateEntry};
pub use timer::{StartTimer, StopTimer, TimerService};
pub use webhook::{AUTO_STOP_DESCRIPTION, IssueTransition, WebhookHandler};

/// Errors surfaced to callers of the services.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Missing or malformed input. Nothing was changed.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The request collides with existing state. Nothing was changed.
    #[error("{0}")]
    Conflict(String),
    /// The referenced timer or entry does not exist.
    #[error("{0}")]
    NotFound(String),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ActiveTimerExists { .. } => Self::Conflict(err.to_string()),
            StoreError::TimerNotFound { .. } | StoreError::EntryNotFound { .. } => {
                Self::NotFound(err.to_string())
            }
            StoreError::Invalid(err) => Self::Validation(err),
        }
    }
}

/// Unwraps a required request field.
fn required(value: Option<String>, field: &'static str) -> Result<String, ValidationError> {
    value.ok_or(ValidationError::Missing { field })
}
