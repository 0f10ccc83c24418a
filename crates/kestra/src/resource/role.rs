//! Role reconciler.
//!
//! Roles live under the tenant-scoped API root. The tenant is taken from the
//! backend once, when the reconciler is built.

use super::{decode_import, ignore_not_found, refresh_outcome};
use crate::backend::{Backend, Method, api_root};
use crate::error::{Error, Result};
use crate::mapper::role as mapper;
use crate::types::RoleRecord;
use declarative::{ChangeSet, Outcome, Reconciler, Record, ResourceState, id, staged};
use std::sync::Arc;

/// Converges roles.
pub struct RoleReconciler {
    backend: Arc<dyn Backend>,
    tenant: Option<String>,
    roles: String,
}

impl RoleReconciler {
    /// Create a role reconciler over `backend`, scoped to its tenant.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        let tenant = backend.tenant_id().map(str::to_string);
        let roles = format!("{}/roles", api_root(tenant.as_deref()));
        Self {
            backend,
            tenant,
            roles,
        }
    }

    /// Tenant every role path is scoped to.
    #[must_use]
    pub fn tenant(&self) -> Option<&str> {
        self.tenant.as_deref()
    }

    fn role_path(&self, record: &RoleRecord) -> Result<String> {
        let parts = id::decode(record.id.as_deref().unwrap_or_default(), 1)?;
        Ok(format!("{}/{}", self.roles, parts[0]))
    }

    fn fetch(&self, draft: &mut RoleRecord) -> Result<ResourceState> {
        if draft.state().is_absent() {
            return Ok(ResourceState::Absent);
        }

        let path = self.role_path(draft)?;
        match self.backend.request(Method::Get, &path, None) {
            Ok(response) => {
                mapper::from_remote(draft, &response, self.tenant())?;
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

impl Reconciler for RoleReconciler {
    type Record = RoleRecord;
    type Error = Error;

    fn kind(&self) -> &'static str {
        "role"
    }

    fn create(&self, record: &mut RoleRecord) -> Result<Outcome> {
        staged(record, |draft| {
            let payload = mapper::to_remote(draft)?;
            let response = payload.send(self.backend.as_ref(), Method::Post, &self.roles)?;
            mapper::from_remote(draft, &response, self.tenant())?;
            log::info!(
                "Created {} as {}",
                draft.address(),
                draft.id.as_deref().unwrap_or_default()
            );
            Ok(Outcome::Created)
        })
    }

    fn read(&self, record: &mut RoleRecord) -> Result<ResourceState> {
        staged(record, |draft| self.fetch(draft))
    }

    fn update(&self, record: &mut RoleRecord, changes: &ChangeSet) -> Result<Outcome> {
        if !changes.touches(RoleRecord::UPDATABLE) {
            log::debug!("No change for {}, refreshing only", record.address());
            return self.read(record).map(refresh_outcome);
        }

        staged(record, |draft| {
            let payload = mapper::to_remote(draft)?;
            let path = self.role_path(draft)?;
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
            mapper::from_remote(draft, &response, self.tenant())?;
            log::info!(
                "Updated {} to revision {} ({changes})",
                draft.address(),
                draft.revision.unwrap_or_default()
            );
            Ok(Outcome::Updated)
        })
    }

    fn delete(&self, record: &mut RoleRecord) -> Result<Outcome> {
        staged(record, |draft| {
            if draft.state().is_present() {
                let path = self.role_path(draft)?;
                ignore_not_found(self.backend.request(Method::Delete, &path, None))?;
                log::info!("Deleted {}", draft.address());
            }
            draft.clear_id();
            draft.revision = None;
            Ok(Outcome::Removed)
        })
    }

    fn import(&self, id: &str) -> Result<Option<RoleRecord>> {
        decode_import(id, 1)?;
        let mut record = RoleRecord::default();
        record.set_id(id.to_string());

        match self.read(&mut record)? {
            ResourceState::Present => {
                log::info!("Imported {}", record.address());
                Ok(Some(record))
            }
            ResourceState::Absent => Ok(None),
        }
    }
}
