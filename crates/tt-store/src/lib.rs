//! Storage layer for the time tracker.
//!
//! Holds active timers (keyed by user) and completed entries (keyed by an
//! auto-incrementing id) in memory.
//!
//! # Thread Safety
//!
//! [`TimeStore`] is `Send + Sync` and meant to be shared behind an `Arc`.
//! Every mutation runs under a single write lock, so:
//! - the one-timer-per-user check and insert happen together
//! - removing a timer and recording its entry happen together
//! - the id counter increment and the insert happen together
//!
//! Reads take the read lock and return owned snapshots.
//!
//! # Ids
//!
//! Entry ids start at 1 and only ever increase. Deleting entry 3 and
//! creating another yields id 4.

use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tt_core::{ActiveTimer, Entry, EntryId, EntryPatch, NewEntry, Timer, UserId, ValidationError};

/// Store errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The user already has a running timer.
    #[error("user {user_id} already has an active timer")]
    ActiveTimerExists { user_id: UserId },
    /// The user has no running timer.
    #[error("no active timer for user {user_id}")]
    TimerNotFound { user_id: UserId },
    /// No entry has this id.
    #[error("entry {id} not found")]
    EntryNotFound { id: EntryId },
    /// An update would leave the entry inconsistent.
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

#[derive(Debug, Default)]
struct Inner {
    timers: HashMap<UserId, Timer>,
    entries: BTreeMap<EntryId, Entry>,
    last_id: u64,
}

impl Inner {
    fn append(&mut self, entry: NewEntry) -> Entry {
        self.last_id += 1;
        let entry = entry.into_entry(EntryId::new(self.last_id));
        self.entries.insert(entry.id, entry.clone());
        entry
    }
}

/// In-memory store for timers and entries.
///
/// See the [module documentation](self) for the locking discipline.
#[derive(Debug, Default)]
pub struct TimeStore {
    inner: RwLock<Inner>,
}

impl TimeStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Mutations validate before writing, so a poisoned lock still guards
    // consistent state.
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ========== Timers ==========

    /// Registers a running timer. Fails if the user already has one.
    pub fn put_active_timer(&self, timer: Timer) -> Result<(), StoreError> {
        let mut inner = self.write();
        if inner.timers.contains_key(&timer.user_id) {
            return Err(StoreError::ActiveTimerExists {
                user_id: timer.user_id,
            });
        }
        tracing::debug!(user_id = %timer.user_id, issue_id = %timer.issue_id, "timer stored");
        inner.timers.insert(timer.user_id.clone(), timer);
        Ok(())
    }

    /// Removes and returns the user's timer.
    pub fn take_active_timer(&self, user_id: &UserId) -> Result<Timer, StoreError> {
        self.write()
            .timers
            .remove(user_id)
            .ok_or_else(|| StoreError::TimerNotFound {
                user_id: user_id.clone(),
            })
    }

    pub fn peek_active_timer(&self, user_id: &UserId) -> Result<Timer, StoreError> {
        self.read()
            .timers
            .get(user_id)
            .cloned()
            .ok_or_else(|| StoreError::TimerNotFound {
                user_id: user_id.clone(),
            })
    }

    /// Snapshot of all running timers, ordered by user.
    pub fn list_active_timers(&self) -> Vec<Timer> {
        let mut timers: Vec<Timer> = self.read().timers.values().cloned().collect();
        timers.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        timers
    }

    /// Stops the user's timer and records the entry built from it.
    ///
    /// `finish` sees the timer while the write lock is held. Returning `None`
    /// leaves the timer running and yields `Ok(None)`; returning an entry
    /// removes the timer and appends the entry in the same critical section.
    pub fn finish_timer<F>(&self, user_id: &UserId, finish: F) -> Result<Option<Entry>, StoreError>
    where
        F: FnOnce(&Timer) -> Option<NewEntry>,
    {
        let mut inner = self.write();
        let timer = inner
            .timers
            .get(user_id)
            .ok_or_else(|| StoreError::TimerNotFound {
                user_id: user_id.clone(),
            })?;
        let Some(new_entry) = finish(timer) else {
            return Ok(None);
        };
        inner.timers.remove(user_id);
        Ok(Some(inner.append(new_entry)))
    }

    /// Snapshot of a running timer with elapsed time, if any.
    pub fn active_timer_at(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<ActiveTimer, StoreError> {
        self.peek_active_timer(user_id).map(|timer| timer.at(now))
    }

    pub fn active_timer_count(&self) -> usize {
        self.read().timers.len()
    }

    // ========== Entries ==========

    /// Assigns the next id and stores the entry.
    pub fn append_entry(&self, entry: NewEntry) -> Entry {
        let entry = self.write().append(entry);
        tracing::debug!(id = %entry.id, "entry stored");
        entry
    }

    pub fn get_entry(&self, id: EntryId) -> Result<Entry, StoreError> {
        self.read()
            .entries
            .get(&id)
            .cloned()
            .ok_or(StoreError::EntryNotFound { id })
    }

    /// Applies a patch atomically. A rejected patch leaves the entry as it was.
    pub fn update_entry(&self, id: EntryId, patch: &EntryPatch) -> Result<Entry, StoreError> {
        let mut inner = self.write();
        let current = inner
            .entries
            .get(&id)
            .ok_or(StoreError::EntryNotFound { id })?;
        let updated = patch.apply(current)?;
        inner.entries.insert(id, updated.clone());
        Ok(updated)
    }

    pub fn delete_entry(&self, id: EntryId) -> Result<Entry, StoreError> {
        self.write()
            .entries
            .remove(&id)
            .ok_or(StoreError::EntryNotFound { id })
    }

    /// Snapshot of all entries in id (insertion) order.
    pub fn list_entries(&self) -> Vec<Entry> {
        self.read().entries.values().cloned().collect()
    }

    pub fn entry_count(&self) -> usize {
        self.read().entries.len()
    }

    /// Drops all timers and entries and restarts ids at 1.
    #[cfg(any(test, feature = "testing"))]
    pub fn reset(&self) {
        *self.write() = Inner::default();
    }
}
