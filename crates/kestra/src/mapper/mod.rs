//! Attribute mapping between local records and wire documents.
//!
//! `to_remote` turns a record into the payload of a create or replace call;
//! `from_remote` writes a server response back into the record. The flow
//! pipeline is chosen by the record's [`RepresentationMode`] with an
//! explicit `match`, never by dynamic dispatch.
//!
//! [`RepresentationMode`]: crate::types::RepresentationMode

pub mod flow;
pub mod role;

use crate::backend::{Backend, Method};
use crate::error::{Error, Result};
use serde_json::{Map, Value};

/// Body of a create or replace call.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Raw YAML source, sent as-is.
    Source(String),
    /// Structured JSON document.
    Document(Value),
}

impl Payload {
    /// Send this payload with the matching backend call.
    pub fn send<B: Backend + ?Sized>(&self, backend: &B, method: Method, path: &str) -> Result<Value> {
        match self {
            Self::Source(source) => backend.source_request(method, path, Some(source)),
            Self::Document(document) => backend.request(method, path, Some(document)),
        }
    }

    /// Whether this is a raw source payload.
    #[must_use]
    pub fn is_source(&self) -> bool {
        matches!(self, Self::Source(_))
    }
}

/// Borrow a response as a JSON object.
fn object<'a>(response: &'a Value, what: &str) -> Result<&'a Map<String, Value>> {
    response
        .as_object()
        .ok_or_else(|| Error::InvalidResponse(format!("expected a {what} object, got {response}")))
}

/// A non-empty string field.
fn string_field(document: &Map<String, Value>, field: &str) -> Option<String> {
    document
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn revision(document: &Map<String, Value>) -> Option<i64> {
    document.get("revision").and_then(Value::as_i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use serde_json::json;

    #[test]
    fn test_payload_dispatch() {
        let mock = MockBackend::new();

        let source = Payload::Source("id: a\nnamespace: n\n".into());
        assert!(source.is_source());
        let created = source.send(&mock, Method::Post, "/api/v1/flows").unwrap();
        assert_eq!(created["source"], "id: a\nnamespace: n\n");

        let document = Payload::Document(json!({"id": "b", "namespace": "n"}));
        assert!(!document.is_source());
        let created = document.send(&mock, Method::Post, "/api/v1/flows").unwrap();
        assert!(created.get("source").is_none());
        assert_eq!(mock.writes(), 2);
    }

    #[test]
    fn test_object_rejects_non_objects() {
        let err = object(&json!([1, 2]), "flow").unwrap_err();
        assert!(matches!(err, Error::InvalidResponse(_)));
        assert!(object(&json!({}), "flow").is_ok());
    }

    #[test]
    fn test_string_field_skips_empty() {
        let document = json!({"a": "x", "b": "", "c": 3});
        let document = document.as_object().unwrap();
        assert_eq!(string_field(document, "a").as_deref(), Some("x"));
        assert_eq!(string_field(document, "b"), None);
        assert_eq!(string_field(document, "c"), None);
        assert_eq!(string_field(document, "d"), None);
    }
}
