//! # kestra
//!
//! Reconcile Kestra flows and roles against the control-plane API.
//!
//! This crate provides:
//! - Local records for flows and roles, with change detection
//! - Attribute mapping between records and wire documents
//! - Reconcilers that create, read, update, delete and import resources
//! - An HTTP backend and an in-memory mock server for tests
//!
//! ## Example
//!
//! ```no_run
//! use declarative::Reconciler;
//! use kestra::{Client, FlowRecord};
//!
//! let client = Client::connect("http://localhost:8080", None, None);
//!
//! let mut flow = FlowRecord::new(
//!     "company.team",
//!     "hello",
//!     "id: hello\nnamespace: company.team\ntasks: []\n",
//! );
//! client.flows().create(&mut flow).expect("create failed");
//!
//! println!("{} is at revision {:?}", flow.id.unwrap(), flow.revision);
//! ```
//!
//! ## Representation modes
//!
//! | Mode         | Sent as              | Written back                 |
//! |--------------|----------------------|------------------------------|
//! | `source`     | YAML text, verbatim  | server copy of the source    |
//! | `structured` | JSON document        | canonical YAML of the document |

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod mapper;
pub mod resource;
pub mod types;

pub use error::{Error, ErrorCategory, Result};
pub use resource::{FlowReconciler, RoleReconciler};
pub use types::{FlowRecord, PermissionGrant, RepresentationMode, RoleRecord};

pub use backend::MockBackend;
use backend::Backend;
use backend::http::HttpBackend;
use std::sync::Arc;
use std::time::Duration;

/// Entry point holding the backend shared by all reconcilers.
///
/// # Example
///
/// ```
/// use declarative::Reconciler;
/// use kestra::{Client, MockBackend, PermissionGrant, RoleRecord};
///
/// let client = Client::with_backend(MockBackend::with_tenant("main"));
///
/// let mut role = RoleRecord::new("viewers").grant(PermissionGrant::new("FLOW", ["READ"]));
/// client.roles().create(&mut role).unwrap();
/// assert_eq!(role.revision, Some(1));
/// ```
#[derive(Clone)]
pub struct Client {
    backend: Arc<dyn Backend>,
}

impl Client {
    /// Create a client for the server at `url`.
    #[must_use]
    pub fn connect(url: &str, tenant: Option<String>, timeout: Option<Duration>) -> Self {
        let mut backend = HttpBackend::new(url).with_tenant(tenant);
        if let Some(timeout) = timeout {
            backend = backend.with_timeout(timeout);
        }
        log::debug!(
            "Using Kestra server at {} (tenant: {})",
            backend.base_url(),
            backend.tenant_id().unwrap_or("none")
        );
        Self::with_backend(backend)
    }

    /// Create a client with a custom backend (useful for testing).
    #[must_use]
    pub fn with_backend(backend: impl Backend + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    /// Tenant the client is scoped to.
    #[must_use]
    pub fn tenant_id(&self) -> Option<&str> {
        self.backend.tenant_id()
    }

    /// Reconciler for flows.
    #[must_use]
    pub fn flows(&self) -> FlowReconciler {
        FlowReconciler::new(Arc::clone(&self.backend))
    }

    /// Reconciler for roles.
    #[must_use]
    pub fn roles(&self) -> RoleReconciler {
        RoleReconciler::new(Arc::clone(&self.backend))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::Reconciler;

    #[test]
    fn test_client_connect() {
        let client = Client::connect("http://localhost:8080", Some("main".into()), None);
        assert_eq!(client.tenant_id(), Some("main"));
        assert_eq!(client.roles().tenant(), Some("main"));
    }

    #[test]
    fn test_client_shares_backend() {
        let mock = MockBackend::new();
        let client = Client::with_backend(mock.clone());

        let mut flow = FlowRecord::new(
            "company.team",
            "hello",
            "id: hello\nnamespace: company.team\ntasks: []\n",
        );
        client.flows().create(&mut flow).unwrap();
        let mut role = RoleRecord::new("viewers");
        client.roles().create(&mut role).unwrap();

        assert_eq!(mock.writes(), 2);
        assert_eq!(client.flows().kind(), "flow");
        assert_eq!(client.roles().kind(), "role");
    }
}
