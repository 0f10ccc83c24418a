//! Reconcilers for Kestra resource kinds.
//!
//! Every call works on a staged copy of the record and commits it only when
//! the call succeeds, so a failed request never leaves a half-written record.

pub mod flow;
pub mod role;

pub use flow::FlowReconciler;
pub use role::RoleReconciler;

use crate::error::{Error, Result};
use declarative::{Outcome, ResourceState, id};

/// Decode a caller-supplied identifier, reporting failures as input errors.
fn decode_import(id: &str, arity: usize) -> Result<Vec<String>> {
    id::decode(id, arity).map_err(Error::InvalidImportId)
}

/// Outcome of an update that degraded to a read.
fn refresh_outcome(state: ResourceState) -> Outcome {
    match state {
        ResourceState::Present => Outcome::Unchanged,
        ResourceState::Absent => Outcome::Drifted,
    }
}

/// Treat "not found" as success for deletes.
fn ignore_not_found(result: Result<serde_json::Value>) -> Result<()> {
    match result {
        Ok(_) => Ok(()),
        Err(e) if e.is_not_found() => {
            log::debug!("Already deleted: {e}");
            Ok(())
        }
        Err(e) => Err(e),
    }
}
