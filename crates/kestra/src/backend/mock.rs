//! In-memory Kestra server for testing without network access.
//!
//! The mock understands the handful of flow and role endpoints the
//! reconcilers use, assigns role ids and revisions the way the server does,
//! and records every call so tests can assert which requests were made.

use crate::backend::{Backend, Method, api_root};
use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A request received by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    /// HTTP method.
    pub method: Method,
    /// Full request path, including the query string.
    pub path: String,
    /// Whether the call came through `source_request`.
    pub source: bool,
}

#[derive(Debug, Clone)]
struct StoredFlow {
    source: String,
    document: Map<String, Value>,
    revision: i64,
}

#[derive(Debug, Clone)]
struct StoredRole {
    document: Map<String, Value>,
    revision: i64,
}

#[derive(Debug, Default)]
struct State {
    flows: BTreeMap<(String, String), StoredFlow>,
    roles: BTreeMap<String, StoredRole>,
    next_role: u64,
    calls: Vec<Call>,
    failures: VecDeque<u16>,
}

#[derive(Clone, Copy)]
enum Body<'a> {
    Empty,
    Json(&'a Value),
    Source(&'a str),
}

/// Mock backend holding flows and roles in memory.
///
/// Clones share the same server state.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<State>>,
    tenant: Option<String>,
}

impl MockBackend {
    /// Create a new empty mock server without a tenant.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new empty mock server scoped to a tenant.
    #[must_use]
    pub fn with_tenant(tenant: impl Into<String>) -> Self {
        Self {
            tenant: Some(tenant.into()),
            ..Self::default()
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// All calls received so far, oldest first.
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Number of state-changing calls received so far.
    pub fn writes(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.method.is_write())
            .count()
    }

    /// Forget the recorded calls.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Make the next call fail with the given HTTP status.
    pub fn fail_next(&self, status: u16) {
        self.lock().failures.push_back(status);
    }

    /// Current revision of a stored flow.
    pub fn flow_revision(&self, namespace: &str, flow_id: &str) -> Option<i64> {
        self.lock()
            .flows
            .get(&(namespace.to_string(), flow_id.to_string()))
            .map(|f| f.revision)
    }

    /// Current source of a stored flow.
    pub fn flow_source(&self, namespace: &str, flow_id: &str) -> Option<String> {
        self.lock()
            .flows
            .get(&(namespace.to_string(), flow_id.to_string()))
            .map(|f| f.source.clone())
    }

    /// Delete a flow behind the reconciler's back.
    pub fn remove_flow(&self, namespace: &str, flow_id: &str) -> bool {
        self.lock()
            .flows
            .remove(&(namespace.to_string(), flow_id.to_string()))
            .is_some()
    }

    /// Delete a role behind the reconciler's back.
    pub fn remove_role(&self, role_id: &str) -> bool {
        self.lock().roles.remove(role_id).is_some()
    }

    /// Current server document of a stored role.
    pub fn role(&self, role_id: &str) -> Option<Value> {
        self.lock()
            .roles
            .get(role_id)
            .map(|r| role_response(role_id, r))
    }

    fn handle(&self, method: Method, path: &str, body: Body<'_>, source: bool) -> Result<Value> {
        let mut state = self.lock();
        state.calls.push(Call {
            method,
            path: path.to_string(),
            source,
        });

        if let Some(status) = state.failures.pop_front() {
            return Err(Error::from_status(path, status, format!("HTTP {status}")));
        }

        let (route, query) = path.split_once('?').unwrap_or((path, ""));
        let with_source = query.split('&').any(|q| q == "source=true");

        if let Some(rest) = route.strip_prefix("/api/v1/flows") {
            return handle_flows(&mut state, method, path, rest, body, with_source);
        }

        let roles_root = format!("{}/roles", api_root(self.tenant.as_deref()));
        if let Some(rest) = route.strip_prefix(roles_root.as_str()) {
            return handle_roles(&mut state, method, path, rest, body);
        }

        Err(Error::from_status(path, 404, "no such endpoint"))
    }
}

impl Backend for MockBackend {
    fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        self.handle(method, path, body.map_or(Body::Empty, Body::Json), false)
    }

    fn source_request(&self, method: Method, path: &str, source: Option<&str>) -> Result<Value> {
        self.handle(method, path, source.map_or(Body::Empty, Body::Source), true)
    }

    fn tenant_id(&self) -> Option<&str> {
        self.tenant.as_deref()
    }
}

fn unprocessable(path: &str, message: impl Into<String>) -> Error {
    Error::from_status(path, 422, message)
}

/// Parse a request body into a flow document and its source text.
fn flow_from_body(path: &str, body: Body<'_>) -> Result<(Map<String, Value>, String)> {
    let (document, source) = match body {
        Body::Json(value) => {
            let source = serde_yaml::to_string(value)
                .map_err(|e| unprocessable(path, e.to_string()))?;
            (value.clone(), source)
        }
        Body::Source(text) => {
            let value: Value =
                serde_yaml::from_str(text).map_err(|e| unprocessable(path, e.to_string()))?;
            (value, text.to_string())
        }
        Body::Empty => return Err(unprocessable(path, "missing flow body")),
    };

    match document {
        Value::Object(map) => Ok((map, source)),
        _ => Err(unprocessable(path, "flow must be a mapping")),
    }
}

fn flow_key(path: &str, document: &Map<String, Value>) -> Result<(String, String)> {
    let field = |name: &str| {
        document
            .get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .ok_or_else(|| unprocessable(path, format!("flow is missing '{name}'")))
    };
    Ok((field("namespace")?, field("id")?))
}

fn flow_response(flow: &StoredFlow, include_source: bool) -> Value {
    let mut document = flow.document.clone();
    document.insert("revision".into(), Value::from(flow.revision));
    document.insert("deleted".into(), Value::Bool(false));
    if include_source {
        document.insert("source".into(), Value::String(flow.source.clone()));
    }
    Value::Object(document)
}

fn handle_flows(
    state: &mut State,
    method: Method,
    path: &str,
    rest: &str,
    body: Body<'_>,
    with_source: bool,
) -> Result<Value> {
    let include_source = with_source || matches!(body, Body::Source(_));
    let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();

    match (method, segments.as_slice()) {
        (Method::Post, []) => {
            let (document, source) = flow_from_body(path, body)?;
            let key = flow_key(path, &document)?;
            if state.flows.contains_key(&key) {
                return Err(unprocessable(
                    path,
                    format!("flow {}/{} already exists", key.0, key.1),
                ));
            }
            let flow = StoredFlow {
                source,
                document,
                revision: 1,
            };
            let response = flow_response(&flow, include_source);
            state.flows.insert(key, flow);
            Ok(response)
        }
        (Method::Get, [namespace, flow_id]) => state
            .flows
            .get(&(namespace.to_string(), flow_id.to_string()))
            .map(|flow| flow_response(flow, include_source))
            .ok_or_else(|| Error::from_status(path, 404, "flow not found")),
        (Method::Put, [namespace, flow_id]) => {
            let key = (namespace.to_string(), flow_id.to_string());
            let (document, source) = flow_from_body(path, body)?;
            if flow_key(path, &document)? != key {
                return Err(unprocessable(path, "flow id and namespace cannot change"));
            }
            let flow = state
                .flows
                .get_mut(&key)
                .ok_or_else(|| Error::from_status(path, 404, "flow not found"))?;
            flow.document = document;
            flow.source = source;
            flow.revision += 1;
            Ok(flow_response(flow, include_source))
        }
        (Method::Delete, [namespace, flow_id]) => state
            .flows
            .remove(&(namespace.to_string(), flow_id.to_string()))
            .map(|_| Value::Null)
            .ok_or_else(|| Error::from_status(path, 404, "flow not found")),
        _ => Err(Error::from_status(path, 404, "no such endpoint")),
    }
}

fn role_response(id: &str, role: &StoredRole) -> Value {
    let mut document = role.document.clone();
    document.insert("id".into(), Value::String(id.to_string()));
    document.insert("revision".into(), Value::from(role.revision));
    Value::Object(document)
}

fn role_from_body(path: &str, body: Body<'_>) -> Result<Map<String, Value>> {
    match body {
        Body::Json(Value::Object(map)) => {
            let mut document = map.clone();
            document.remove("id");
            document.remove("revision");
            Ok(document)
        }
        _ => Err(unprocessable(path, "role must be a JSON object")),
    }
}

fn handle_roles(
    state: &mut State,
    method: Method,
    path: &str,
    rest: &str,
    body: Body<'_>,
) -> Result<Value> {
    let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();

    match (method, segments.as_slice()) {
        (Method::Post, []) => {
            let document = role_from_body(path, body)?;
            state.next_role += 1;
            let id = format!("role-{}", state.next_role);
            let role = StoredRole {
                document,
                revision: 1,
            };
            let response = role_response(&id, &role);
            state.roles.insert(id, role);
            Ok(response)
        }
        (Method::Get, [id]) => state
            .roles
            .get(*id)
            .map(|role| role_response(id, role))
            .ok_or_else(|| Error::from_status(path, 404, "role not found")),
        (Method::Put, [id]) => {
            let document = role_from_body(path, body)?;
            let role = state
                .roles
                .get_mut(*id)
                .ok_or_else(|| Error::from_status(path, 404, "role not found"))?;
            role.document = document;
            role.revision += 1;
            Ok(role_response(id, role))
        }
        (Method::Delete, [id]) => state
            .roles
            .remove(*id)
            .map(|_| Value::Null)
            .ok_or_else(|| Error::from_status(path, 404, "role not found")),
        _ => Err(Error::from_status(path, 404, "no such endpoint")),
    }
}
