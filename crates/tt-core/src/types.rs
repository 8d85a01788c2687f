//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types and inbound values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// A required value was not supplied.
    #[error("{field} is required")]
    Missing { field: &'static str },

    /// Neither an end time nor a duration was supplied.
    #[error("either ended_at or duration_seconds is required")]
    MissingEnd,

    /// The entry would end before it starts.
    #[error("duration cannot be negative, got {seconds}s")]
    NegativeDuration { seconds: i64 },

    /// The duration does not fit in the representable time range.
    #[error("duration out of range: {seconds}s")]
    DurationOutOfRange { seconds: i64 },

    /// The value could not be parsed as a timestamp.
    #[error("invalid timestamp for {field}: {value}")]
    InvalidTimestamp { field: &'static str, value: String },

    /// The value could not be parsed as a boolean.
    #[error("invalid boolean for {field}: {value}")]
    InvalidBoolean { field: &'static str, value: String },
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated user identifier.
    ///
    /// User IDs key the active-timer table, so at most one timer exists per ID.
    UserId, "user_id"
);

define_string_id!(
    /// A validated issue identifier.
    ///
    /// Issue IDs are opaque keys from the external issue tracker
    /// (e.g., "PROJ-123").
    IssueId, "issue_id"
);

/// Identifier of a stored time entry.
///
/// Assigned by the store from a counter starting at 1 that is never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(u64);

impl EntryId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EntryId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}
