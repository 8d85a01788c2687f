//! Core domain logic for the time tracker.
//!
//! This crate contains the transport-agnostic pieces of the service:
//! - Timers and entries, and the arithmetic that keeps entry durations consistent
//! - Clock abstraction for deterministic tests
//! - Query engine: filtering, ordering and summary aggregation
//! - CSV export

mod clock;
mod csv;
mod entry;
pub mod query;
pub mod time;
mod timer;
mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use csv::{CSV_HEADER, export_csv};
pub use entry::{AUTO_STOPPED_TAG, Entry, EntryPatch, NewEntry, resolve_end, span_seconds};
pub use query::{EntryFilter, FilterParams, GroupTotals, Summary, list_entries, summarize};
pub use timer::{ActiveTimer, Timer};
pub use types::{EntryId, IssueId, UserId, ValidationError};
