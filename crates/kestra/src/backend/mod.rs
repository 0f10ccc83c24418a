//! Remote-access backends for the Kestra API.
//!
//! This module provides the [`Backend`] trait, the collaborator every
//! reconciler talks to. The production implementation is
//! [`http::HttpBackend`]; [`MockBackend`] is an in-memory stand-in for a
//! Kestra server.
//!
//! Backends do not retry. A failed request is reported once, with its HTTP
//! status preserved in the error.
//!
//! # Testing
//!
//! ```
//! use kestra::backend::{Backend, Method, MockBackend};
//!
//! let mock = MockBackend::new();
//! let created = mock
//!     .source_request(Method::Post, "/api/v1/flows", Some("id: hello\nnamespace: company.team\n"))
//!     .unwrap();
//! assert_eq!(created["revision"], 1);
//! assert_eq!(mock.writes(), 1);
//! ```

pub mod http;
pub mod mock;

pub use mock::{Call, MockBackend};

use crate::error::Result;
use serde_json::Value;
use std::fmt;

/// HTTP method of a remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Fetch a resource.
    Get,
    /// Create a resource.
    Post,
    /// Replace a resource.
    Put,
    /// Delete a resource.
    Delete,
}

impl Method {
    /// Method name as sent on the wire.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }

    /// Whether the method changes server state.
    #[must_use]
    pub fn is_write(&self) -> bool {
        !matches!(self, Self::Get)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Remote-access collaborator.
///
/// Paths are absolute API paths such as `/api/v1/flows`. Both methods
/// return the decoded JSON response, or `Value::Null` for an empty body.
pub trait Backend: Send + Sync {
    /// Send a request with an optional JSON body.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` for a 404 answer and `Error::Remote` with
    /// the status code for any other failure.
    fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value>;

    /// Send a request whose body is a raw YAML source document.
    fn source_request(&self, method: Method, path: &str, source: Option<&str>) -> Result<Value>;

    /// Tenant scope of this backend, if any.
    fn tenant_id(&self) -> Option<&str> {
        None
    }
}

/// Root of the versioned API, scoped to a tenant when one is given.
///
/// # Example
///
/// ```
/// use kestra::backend::api_root;
///
/// assert_eq!(api_root(None), "/api/v1");
/// assert_eq!(api_root(Some("main")), "/api/v1/main");
/// ```
pub fn api_root(tenant: Option<&str>) -> String {
    match tenant {
        Some(t) if !t.is_empty() => format!("/api/v1/{t}"),
        _ => "/api/v1".to_string(),
    }
}
