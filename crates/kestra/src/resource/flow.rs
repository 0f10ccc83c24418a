//! Flow reconciler.

use super::{ignore_not_found, refresh_outcome};
use crate::backend::{Backend, Method};
use crate::error::{Error, Result};
use crate::mapper::flow as mapper;
use crate::types::{FlowRecord, RepresentationMode};
use declarative::{ChangeSet, Outcome, Reconciler, Record, ResourceState, id, staged};
use std::sync::Arc;

/// Collection path for flows. Flows are not tenant-scoped.
const FLOWS: &str = "/api/v1/flows";

fn flow_path(namespace: &str, flow_id: &str) -> String {
    format!("{FLOWS}/{namespace}/{flow_id}")
}

/// Decode the stored composite id of a flow.
fn stored_key(record: &FlowRecord) -> Result<(String, String)> {
    Ok(id::decode_pair(record.id.as_deref().unwrap_or_default())?)
}

/// Converges flows.
pub struct FlowReconciler {
    backend: Arc<dyn Backend>,
}

impl FlowReconciler {
    /// Create a flow reconciler over `backend`.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Import a flow, reading it back in the given representation mode.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidImportId` if `id` is not `<namespace>/<flow_id>`.
    pub fn import_as(&self, id: &str, mode: RepresentationMode) -> Result<Option<FlowRecord>> {
        let (namespace, flow_id) = id::decode_pair(id).map_err(Error::InvalidImportId)?;
        let mut record = FlowRecord::new(namespace, flow_id, String::new()).with_mode(mode);
        record.set_id(id.to_string());

        match self.read(&mut record)? {
            ResourceState::Present => {
                log::info!("Imported {}", record.address());
                Ok(Some(record))
            }
            ResourceState::Absent => Ok(None),
        }
    }

    fn fetch(&self, draft: &mut FlowRecord) -> Result<ResourceState> {
        if draft.state().is_absent() {
            return Ok(ResourceState::Absent);
        }

        let (namespace, flow_id) = stored_key(draft)?;
        let path = match draft.mode {
            RepresentationMode::Source => format!("{}?source=true", flow_path(&namespace, &flow_id)),
            RepresentationMode::Structured => flow_path(&namespace, &flow_id),
        };

        let response = match draft.mode {
            RepresentationMode::Source => self.backend.source_request(Method::Get, &path, None),
            RepresentationMode::Structured => self.backend.request(Method::Get, &path, None),
        };
        match response {
            Ok(response) => {
                mapper::from_remote(draft, &response)?;
                Ok(ResourceState::Present)
            }
            Err(e) if e.is_not_found() => {
                log::warn!("{} was deleted outside of kestractl", draft.address());
                draft.clear_id();
                draft.revision = None;
                Ok(ResourceState::Absent)
            }
            Err(e) => Err(e),
        }
    }
}

impl Reconciler for FlowReconciler {
    type Record = FlowRecord;
    type Error = Error;

    fn kind(&self) -> &'static str {
        "flow"
    }

    fn create(&self, record: &mut FlowRecord) -> Result<Outcome> {
        staged(record, |draft| {
            let payload = mapper::to_remote(draft)?;
            let response = payload.send(self.backend.as_ref(), Method::Post, FLOWS)?;
            mapper::from_remote(draft, &response)?;
            log::info!(
                "Created {} ({} mode, revision {})",
                draft.address(),
                draft.mode,
                draft.revision.unwrap_or_default()
            );
            Ok(Outcome::Created)
        })
    }

    fn read(&self, record: &mut FlowRecord) -> Result<ResourceState> {
        staged(record, |draft| self.fetch(draft))
    }

    fn update(&self, record: &mut FlowRecord, changes: &ChangeSet) -> Result<Outcome> {
        if changes.touches(&["namespace", "flow_id"]) {
            return Err(Error::validation(format!(
                "{} cannot change namespace or id in place; delete and recreate it",
                record.address()
            )));
        }
        if !changes.touches(FlowRecord::UPDATABLE) {
            log::debug!("No content change for {}, refreshing only", record.address());
            return self.read(record).map(refresh_outcome);
        }

        staged(record, |draft| {
            let (namespace, flow_id) = stored_key(draft)?;
            let payload = mapper::to_remote(draft)?;
            let path = flow_path(&namespace, &flow_id);
            let response = match payload.send(self.backend.as_ref(), Method::Put, &path) {
                Ok(response) => response,
                Err(e) if e.is_not_found() => {
                    log::warn!("{} was deleted outside of kestractl", draft.address());
                    draft.clear_id();
                    draft.revision = None;
                    return Ok(Outcome::Drifted);
                }
                Err(e) => return Err(e),
            };
            mapper::from_remote(draft, &response)?;
            log::info!(
                "Updated {} to revision {} ({changes})",
                draft.address(),
                draft.revision.unwrap_or_default()
            );
            Ok(Outcome::Updated)
        })
    }

    fn delete(&self, record: &mut FlowRecord) -> Result<Outcome> {
        staged(record, |draft| {
            if draft.state().is_present() {
                let (namespace, flow_id) = stored_key(draft)?;
                ignore_not_found(self.backend.request(
                    Method::Delete,
                    &flow_path(&namespace, &flow_id),
                    None,
                ))?;
                log::info!("Deleted {}", draft.address());
            }
            draft.clear_id();
            draft.revision = None;
            Ok(Outcome::Removed)
        })
    }

    fn import(&self, id: &str) -> Result<Option<FlowRecord>> {
        self.import_as(id, RepresentationMode::Source)
    }
}
