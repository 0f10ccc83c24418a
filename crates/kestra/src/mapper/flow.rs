//! Flow mapping.
//!
//! In source mode the YAML travels verbatim and the server's copy of the
//! source is written back, comments included. In structured mode the YAML
//! is decomposed into a JSON document and the content written back is the
//! server's canonical form, re-emitted as YAML.

use super::{Payload, object, revision, string_field};
use crate::error::{Error, Result};
use crate::types::{FlowRecord, RepresentationMode};
use declarative::id;
use serde_json::{Map, Value};

/// Fields the server adds to a flow that are not part of its definition.
pub const SERVER_ONLY_FIELDS: &[&str] = &["revision", "deleted", "source", "tenantId", "updated"];

/// Build the create/replace payload for a flow.
///
/// # Errors
///
/// Returns `Error::Validation` if namespace, flow id or content is empty,
/// if content is not a mapping, or if it declares another id or namespace.
/// Source content must declare both. Returns `Error::Yaml` if content does
/// not parse.
pub fn to_remote(record: &FlowRecord) -> Result<Payload> {
    validate(record)?;
    match record.mode {
        RepresentationMode::Source => {
            check_addressing(record, &parse_mapping(record)?, true)?;
            Ok(Payload::Source(record.content.clone()))
        }
        RepresentationMode::Structured => structured_document(record).map(Payload::Document),
    }
}

/// Structured content as it would be sent, re-emitted as YAML.
///
/// Content that leaves id or namespace implicit compares equal to the
/// server's copy, which carries both.
pub(crate) fn addressed_content(record: &FlowRecord) -> Result<String> {
    Ok(serde_yaml::to_string(&structured_document(record)?)?)
}

/// Write a flow response back into the record.
///
/// Sets namespace, flow id, revision, content and the composite id.
pub fn from_remote(record: &mut FlowRecord, response: &Value) -> Result<()> {
    let document = object(response, "flow")?;

    let (namespace, flow_id) = match record.mode {
        RepresentationMode::Source => {
            if let Some(source) = document.get("source").and_then(Value::as_str) {
                record.content = source.to_string();
            } else {
                log::debug!("No source in response for {}, keeping local content", record.flow_id);
            }
            match (string_field(document, "namespace"), string_field(document, "id")) {
                (Some(namespace), Some(flow_id)) => (namespace, flow_id),
                _ => addressing_from_source(&record.content)?,
            }
        }
        RepresentationMode::Structured => {
            let namespace = string_field(document, "namespace")
                .ok_or_else(|| Error::InvalidResponse("flow response has no namespace".into()))?;
            let flow_id = string_field(document, "id")
                .ok_or_else(|| Error::InvalidResponse("flow response has no id".into()))?;
            record.content = canonical_content(document)?;
            (namespace, flow_id)
        }
    };

    record.revision = revision(document);
    record.id = Some(id::compose(&[namespace.as_str(), flow_id.as_str()])?);
    record.namespace = namespace;
    record.flow_id = flow_id;
    Ok(())
}

fn validate(record: &FlowRecord) -> Result<()> {
    if record.namespace.is_empty() {
        return Err(Error::validation("flow namespace must not be empty"));
    }
    if record.flow_id.is_empty() {
        return Err(Error::validation("flow id must not be empty"));
    }
    if record.content.trim().is_empty() {
        return Err(Error::validation(format!(
            "flow {}/{} has no content",
            record.namespace, record.flow_id
        )));
    }
    Ok(())
}

fn parse_mapping(record: &FlowRecord) -> Result<Map<String, Value>> {
    match serde_yaml::from_str::<Value>(&record.content)? {
        Value::Object(document) => Ok(document),
        _ => Err(Error::validation(format!(
            "flow {}/{} content must be a YAML mapping",
            record.namespace, record.flow_id
        ))),
    }
}

/// Fails if the document names a flow other than the record's.
fn check_addressing(
    record: &FlowRecord,
    document: &Map<String, Value>,
    required: bool,
) -> Result<()> {
    for (field, expected) in [("id", &record.flow_id), ("namespace", &record.namespace)] {
        match document.get(field) {
            Some(Value::String(declared)) if declared == expected => {}
            None | Some(Value::Null) if !required => {}
            None | Some(Value::Null) => {
                return Err(Error::validation(format!(
                    "flow {}/{} source must declare {field} \"{expected}\"",
                    record.namespace, record.flow_id
                )));
            }
            Some(declared) => {
                return Err(Error::validation(format!(
                    "flow content declares {field} {declared}, expected \"{expected}\""
                )));
            }
        }
    }
    Ok(())
}

/// Parse content into a document whose id and namespace are the record's.
fn structured_document(record: &FlowRecord) -> Result<Value> {
    let mut document = parse_mapping(record)?;
    check_addressing(record, &document, false)?;
    for (field, value) in [("id", &record.flow_id), ("namespace", &record.namespace)] {
        document.insert(field.to_string(), Value::String(value.clone()));
    }
    Ok(Value::Object(document))
}

/// Re-emit a server document as YAML, minus server-only fields.
fn canonical_content(document: &Map<String, Value>) -> Result<String> {
    let mut content = document.clone();
    for field in SERVER_ONLY_FIELDS {
        content.remove(*field);
    }
    Ok(serde_yaml::to_string(&Value::Object(content))?)
}

/// Namespace and flow id declared in a YAML source.
fn addressing_from_source(source: &str) -> Result<(String, String)> {
    let parsed: Value = serde_yaml::from_str(source)?;
    let document = object(&parsed, "flow source")?;
    match (string_field(document, "namespace"), string_field(document, "id")) {
        (Some(namespace), Some(flow_id)) => Ok((namespace, flow_id)),
        _ => Err(Error::InvalidResponse(
            "flow source declares no namespace and id".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::equivalence;
    use serde_json::json;

    const SOURCE: &str = "# Say hello\nid: hello\nnamespace: company.team\n\ntasks:\n  - id: log\n    type: io.kestra.plugin.core.log.Log\n    message: hi\n";

    fn structured(content: &str) -> FlowRecord {
        FlowRecord::new("company.team", "hello", content).with_mode(RepresentationMode::Structured)
    }

    #[test]
    fn test_source_passthrough() {
        let record = FlowRecord::new("company.team", "hello", SOURCE);
        assert_eq!(to_remote(&record).unwrap(), Payload::Source(SOURCE.to_string()));
    }

    #[test]
    fn test_empty_fields_rejected() {
        let err = to_remote(&FlowRecord::new("", "hello", SOURCE)).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = to_remote(&FlowRecord::new("company.team", "", SOURCE)).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = to_remote(&FlowRecord::new("company.team", "hello", "  \n")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_source_must_name_its_flow() {
        let record = FlowRecord::new("company.team", "hello", "id: other\nnamespace: company.team\n");
        match to_remote(&record).unwrap_err() {
            Error::Validation(message) => assert!(message.contains("other")),
            other => panic!("Expected Error::Validation, got {other:?}"),
        }

        let record = FlowRecord::new("company.team", "hello", "id: hello\ntasks: []\n");
        match to_remote(&record).unwrap_err() {
            Error::Validation(message) => assert!(message.contains("namespace")),
            other => panic!("Expected Error::Validation, got {other:?}"),
        }

        let record = FlowRecord::new("company.team", "hello", "- id: hello\n");
        assert!(matches!(to_remote(&record).unwrap_err(), Error::Validation(_)));

        let record = FlowRecord::new("company.team", "hello", "id: [unclosed\n");
        assert!(matches!(to_remote(&record).unwrap_err(), Error::Yaml(_)));
    }

    #[test]
    fn test_addressed_content_fills_in_addressing() {
        let implicit = addressed_content(&structured("tasks: []\n")).unwrap();
        let explicit =
            addressed_content(&structured("namespace: company.team\nid: hello\ntasks: []\n")).unwrap();
        assert!(equivalence::equivalent(&implicit, &explicit));
        assert!(implicit.contains("company.team"));
    }

    #[test]
    fn test_structured_forces_addressing() {
        let record = structured("tasks: []\n");
        let Payload::Document(document) = to_remote(&record).unwrap() else {
            panic!("Expected a structured payload");
        };
        assert_eq!(document["id"], "hello");
        assert_eq!(document["namespace"], "company.team");
        assert_eq!(document["tasks"], json!([]));
    }

    #[test]
    fn test_structured_conflicting_addressing() {
        let record = structured("id: other\nnamespace: company.team\n");
        let err = to_remote(&record).unwrap_err();
        match err {
            Error::Validation(message) => assert!(message.contains("other")),
            other => panic!("Expected Error::Validation, got {other:?}"),
        }
    }

    #[test]
    fn test_structured_requires_mapping() {
        let err = to_remote(&structured("- a\n- b\n")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = to_remote(&structured("id: [unclosed\n")).unwrap_err();
        assert!(matches!(err, Error::Yaml(_)));
    }

    #[test]
    fn test_structured_round_trip() {
        let record = structured(SOURCE);
        let Payload::Document(document) = to_remote(&record).unwrap() else {
            panic!("Expected a structured payload");
        };

        let mut restored = structured("");
        restored.namespace = String::new();
        restored.flow_id = String::new();
        from_remote(&mut restored, &document).unwrap();

        assert_eq!(restored.namespace, record.namespace);
        assert_eq!(restored.flow_id, record.flow_id);
        assert_eq!(restored.mode, record.mode);
        assert!(equivalence::equivalent(&restored.content, &record.content));
        assert_eq!(restored.id.as_deref(), Some("company.team/hello"));
    }

    #[test]
    fn test_structured_strips_server_fields() {
        let response = json!({
            "id": "hello",
            "namespace": "company.team",
            "revision": 4,
            "deleted": false,
            "tenantId": "main",
            "updated": "2026-01-01T00:00:00Z",
            "labels": {"team": "data"},
            "tasks": []
        });
        let mut record = structured("tasks: []\n");
        from_remote(&mut record, &response).unwrap();

        assert_eq!(record.revision, Some(4));
        assert!(!record.content.contains("revision"));
        assert!(!record.content.contains("tenantId"));
        assert!(!record.content.contains("deleted"));
        assert!(record.content.contains("labels"));
    }

    #[test]
    fn test_source_from_remote_keeps_comments() {
        let response = json!({
            "id": "hello",
            "namespace": "company.team",
            "revision": 2,
            "source": SOURCE
        });
        let mut record = FlowRecord::new("company.team", "hello", "id: hello\n");
        from_remote(&mut record, &response).unwrap();

        assert_eq!(record.content, SOURCE);
        assert_eq!(record.revision, Some(2));
        assert_eq!(record.id.as_deref(), Some("company.team/hello"));
    }

    #[test]
    fn test_source_addressing_falls_back_to_source() {
        let response = json!({"revision": 1, "source": SOURCE});
        let mut record = FlowRecord::new("", "", "");
        from_remote(&mut record, &response).unwrap();

        assert_eq!(record.namespace, "company.team");
        assert_eq!(record.flow_id, "hello");
        assert_eq!(record.id.as_deref(), Some("company.team/hello"));
    }

    #[test]
    fn test_from_remote_rejects_non_object() {
        let mut record = FlowRecord::new("company.team", "hello", SOURCE);
        let before = record.clone();
        assert!(from_remote(&mut record, &Value::Null).is_err());
        assert_eq!(record, before);
    }
}
