//! HTTP backend talking to a Kestra server.
//!
//! Requests are blocking and single-shot. Non-2xx answers are not turned
//! into transport errors by the agent: the status and the server's message
//! are kept so the reconciler can tell "not found" from other failures and
//! report the rest verbatim.

use crate::backend::{Backend, Method};
use crate::error::{Error, Result};
use serde_json::Value;
use std::time::Duration;

const JSON: &str = "application/json";
const YAML: &str = "application/x-yaml";
const USER_AGENT: &str = concat!("kestractl/", env!("CARGO_PKG_VERSION"));

/// HTTP backend for a Kestra server.
///
/// # Example
///
/// ```no_run
/// use kestra::backend::http::HttpBackend;
/// use kestra::backend::{Backend, Method};
///
/// let backend = HttpBackend::new("http://localhost:8080").with_tenant(Some("main".into()));
/// let flow = backend
///     .request(Method::Get, "/api/v1/flows/company.team/hello", None)
///     .unwrap();
/// println!("revision {}", flow["revision"]);
/// ```
pub struct HttpBackend {
    /// HTTP agent for requests.
    agent: ureq::Agent,
    /// Server base URL, without a trailing slash.
    base_url: String,
    /// Tenant scope.
    tenant: Option<String>,
}

enum Payload<'a> {
    Empty,
    Json(&'a Value),
    Source(&'a str),
}

impl HttpBackend {
    /// Create a backend for the server at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            agent: build_agent(None),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tenant: None,
        }
    }

    /// Scope every tenant-aware path to `tenant`.
    #[must_use]
    pub fn with_tenant(mut self, tenant: Option<String>) -> Self {
        self.tenant = tenant.filter(|t| !t.is_empty());
        self
    }

    /// Bound every request by `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(Some(timeout));
        self
    }

    /// Get the server base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the full URL for an API path.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn send(&self, method: Method, path: &str, payload: Payload<'_>) -> Result<Value> {
        let url = self.url(path);
        log::debug!("{method} {url}");

        let result = match method {
            Method::Get => self
                .agent
                .get(&url)
                .header("Accept", JSON)
                .header("User-Agent", USER_AGENT)
                .call(),
            Method::Delete => self
                .agent
                .delete(&url)
                .header("Accept", JSON)
                .header("User-Agent", USER_AGENT)
                .call(),
            Method::Post => send_with_body(self.agent.post(&url), payload),
            Method::Put => send_with_body(self.agent.put(&url), payload),
        };

        let mut response = result?;
        let status = response.status().as_u16();
        let text = response.body_mut().read_to_string()?;

        if !(200..300).contains(&status) {
            log::debug!("{method} {url} answered {status}");
            return Err(Error::from_status(path, status, error_message(status, &text)));
        }

        decode_body(&text)
    }
}

impl Backend for HttpBackend {
    fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        self.send(method, path, body.map_or(Payload::Empty, Payload::Json))
    }

    fn source_request(&self, method: Method, path: &str, source: Option<&str>) -> Result<Value> {
        self.send(method, path, source.map_or(Payload::Empty, Payload::Source))
    }

    fn tenant_id(&self) -> Option<&str> {
        self.tenant.as_deref()
    }
}

fn build_agent(timeout: Option<Duration>) -> ureq::Agent {
    ureq::Agent::config_builder()
        .http_status_as_error(false)
        .timeout_global(timeout)
        .build()
        .into()
}

fn send_with_body(
    builder: ureq::RequestBuilder<ureq::typestate::WithBody>,
    payload: Payload<'_>,
) -> std::result::Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    let builder = builder
        .header("Accept", JSON)
        .header("User-Agent", USER_AGENT);
    match payload {
        Payload::Empty => builder.send_empty(),
        Payload::Json(value) => builder.send_json(value),
        Payload::Source(source) => builder.header("Content-Type", YAML).send(source),
    }
}

/// Decode a response body; an empty body is `Null`.
fn decode_body(text: &str) -> Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(text)?)
}

/// Extract the server's error message, falling back to the raw body.
fn error_message(status: u16, text: &str) -> String {
    let message = serde_json::from_str::<Value>(text)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| text.trim().to_string());

    if message.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {message}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_strips_trailing_slash() {
        let backend = HttpBackend::new("http://localhost:8080/");
        assert_eq!(backend.base_url(), "http://localhost:8080");
        assert_eq!(
            backend.url("/api/v1/flows"),
            "http://localhost:8080/api/v1/flows"
        );
    }

    #[test]
    fn test_tenant() {
        let backend = HttpBackend::new("http://localhost:8080");
        assert_eq!(backend.tenant_id(), None);

        let backend = backend.with_tenant(Some("main".into()));
        assert_eq!(backend.tenant_id(), Some("main"));

        let backend = backend.with_tenant(Some(String::new()));
        assert_eq!(backend.tenant_id(), None);
    }

    #[test]
    fn test_with_timeout_keeps_settings() {
        let backend = HttpBackend::new("http://kestra:8080")
            .with_tenant(Some("main".into()))
            .with_timeout(Duration::from_secs(5));
        assert_eq!(backend.base_url(), "http://kestra:8080");
        assert_eq!(backend.tenant_id(), Some("main"));
    }

    #[test]
    fn test_decode_body() {
        assert_eq!(decode_body("").unwrap(), Value::Null);
        assert_eq!(decode_body("  \n").unwrap(), Value::Null);
        assert_eq!(decode_body(r#"{"revision": 3}"#).unwrap()["revision"], 3);
        assert!(decode_body("<html>").is_err());
    }

    #[test]
    fn test_error_message() {
        assert_eq!(
            error_message(422, r#"{"message": "Invalid entity: flow.id"}"#),
            "HTTP 422: Invalid entity: flow.id"
        );
        assert_eq!(error_message(502, "Bad Gateway"), "HTTP 502: Bad Gateway");
        assert_eq!(error_message(500, ""), "HTTP 500");
    }
}
