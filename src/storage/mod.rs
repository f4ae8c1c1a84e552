pub mod kv;
pub mod memory;

pub use kv::FileStorage;
pub use memory::MemoryStorage;

use crate::error::{Error, Result};
use crate::state::{Application, Visibility};
use std::collections::HashMap;

/// Storage abstraction for application records.
///
/// Implementations must preserve:
/// - Conditional writes: `compare_and_swap` replaces a record only if its
///   stored `version` is still the one the caller read
/// - All-or-nothing writes: a failed write leaves the previous record intact
/// - One open application per owner, checked in the same critical section
///   as the insert
/// - Jurisdiction filtering inside `scan`, before any caller-side filtering
pub trait ApplicationStore: Send + Sync {
    /// Store a new application.
    ///
    /// Fails with `Error::Storage` if the id is taken, and with
    /// `Error::AlreadySubmitted` if the owner already has an application that
    /// is not rejected.
    fn insert(&self, app: Application) -> Result<()>;

    /// Load an application by id.
    fn get(&self, application_id: &str) -> Result<Option<Application>>;

    /// Replace the stored record with `next` if its version still equals
    /// `expected_version`.
    ///
    /// Returns `Ok(false)` without writing when the record changed since it
    /// was read.
    fn compare_and_swap(&self, expected_version: u64, next: &Application) -> Result<bool>;

    /// All applications matching the visibility predicate.
    fn scan(&self, visibility: &Visibility) -> Result<Vec<Application>>;
}

/// Uniqueness rules every `insert` enforces while holding its write lock.
pub(crate) fn check_insert(records: &HashMap<String, Application>, app: &Application) -> Result<()> {
    if records.contains_key(&app.application_id) {
        return Err(Error::Storage(format!(
            "Application {} already exists",
            app.application_id
        )));
    }
    if records
        .values()
        .any(|existing| existing.user_id == app.user_id && existing.is_open())
    {
        return Err(Error::AlreadySubmitted(app.user_id.clone()));
    }
    Ok(())
}
