//! Reconciler trait for declarative resources
//!
//! A [`Reconciler`] converges one resource kind. Each call processes a
//! single record to completion and returns; the reconciler itself keeps no
//! state between calls, so one instance can serve many records from many
//! threads.

use crate::diff::ChangeSet;
use crate::types::{Outcome, ResourceState};
use std::fmt;

/// A locally declared configuration record
pub trait Record: Clone + Send + Sync + fmt::Debug {
    /// Composite identifier of the remote resource, if it exists
    fn id(&self) -> Option<&str>;

    /// Store the composite identifier assigned on create or import
    fn set_id(&mut self, id: String);

    /// Forget the remote resource (it was deleted or drifted away)
    fn clear_id(&mut self);

    /// Stable, human-readable address of the record in the store
    ///
    /// Examples:
    /// - "flow.company.team/hello"
    /// - "role.admins"
    fn address(&self) -> String;

    /// Whether the record is known to exist remotely
    fn state(&self) -> ResourceState {
        if self.id().is_some_and(|id| !id.is_empty()) {
            ResourceState::Present
        } else {
            ResourceState::Absent
        }
    }
}

/// Lifecycle operations for one resource kind
///
/// State machine per record: `Absent --create--> Present`,
/// `Present --read--> Present | Absent` (drift), `Present --update--> Present`,
/// `Present --delete--> Absent`.
pub trait Reconciler: Send + Sync {
    /// The record type this reconciler converges
    type Record: Record;
    /// Error type surfaced to the caller
    type Error: std::error::Error + Send + Sync + 'static;

    /// Resource kind, e.g. "flow" or "role"
    fn kind(&self) -> &'static str;

    /// Create the remote resource and write computed fields back
    fn create(&self, record: &mut Self::Record) -> Result<Outcome, Self::Error>;

    /// Refresh the record from the remote resource
    ///
    /// A missing remote resource is not an error: the identifier is
    /// cleared and [`ResourceState::Absent`] is returned.
    fn read(&self, record: &mut Self::Record) -> Result<ResourceState, Self::Error>;

    /// Replace the remote resource when `changes` touch an updatable field
    ///
    /// Otherwise this degrades to [`Reconciler::read`] and no write is issued.
    /// A remote resource that is gone, before or during the write, yields
    /// [`Outcome::Drifted`] with the identifier cleared.
    fn update(&self, record: &mut Self::Record, changes: &ChangeSet)
    -> Result<Outcome, Self::Error>;

    /// Delete the remote resource and clear the identifier
    ///
    /// Deleting a resource that is already gone succeeds.
    fn delete(&self, record: &mut Self::Record) -> Result<Outcome, Self::Error>;

    /// Adopt an existing remote resource from a caller-supplied identifier
    ///
    /// Returns `None` if no such resource exists.
    fn import(&self, id: &str) -> Result<Option<Self::Record>, Self::Error>;
}

/// Run `op` against a copy of `record`, committing the copy only on success
///
/// A failed call leaves the caller's record exactly as it was.
pub fn staged<R, T, E, F>(record: &mut R, op: F) -> Result<T, E>
where
    R: Clone,
    F: FnOnce(&mut R) -> Result<T, E>,
{
    let mut draft = record.clone();
    let value = op(&mut draft)?;
    *record = draft;
    Ok(value)
}
