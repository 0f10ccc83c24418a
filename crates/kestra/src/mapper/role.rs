//! Role mapping.

use super::{Payload, object, revision, string_field};
use crate::error::{Error, Result};
use crate::types::{PermissionGrant, RoleRecord, sorted_grants};
use declarative::id;
use serde_json::{Map, Value, json};
use std::collections::BTreeSet;

/// Check a role before anything is sent.
///
/// # Errors
///
/// Returns `Error::Validation` for an empty name, an empty permission
/// type, or a permission type granted twice.
pub fn validate(record: &RoleRecord) -> Result<()> {
    if record.name.trim().is_empty() {
        return Err(Error::validation("role name must not be empty"));
    }

    let mut seen = BTreeSet::new();
    for grant in &record.permissions {
        if grant.category.trim().is_empty() {
            return Err(Error::validation(format!(
                "role {} has a permission with an empty type",
                record.name
            )));
        }
        if !seen.insert(grant.category.as_str()) {
            return Err(Error::validation(format!(
                "role {} grants permission type {} more than once",
                record.name, grant.category
            )));
        }
    }
    Ok(())
}

/// Build the create/replace payload for a role.
pub fn to_remote(record: &RoleRecord) -> Result<Payload> {
    validate(record)?;

    let mut document = Map::new();
    document.insert("name".into(), Value::String(record.name.clone()));
    if let Some(description) = &record.description {
        document.insert("description".into(), Value::String(description.clone()));
    }
    if let Some(namespace) = &record.namespace {
        document.insert("namespace".into(), Value::String(namespace.clone()));
    }
    document.insert("isDefault".into(), Value::Bool(record.is_default));
    document.insert(
        "permissions".into(),
        Value::Array(
            record
                .permissions
                .iter()
                .map(|g| json!({"type": g.category, "permissions": g.permissions}))
                .collect(),
        ),
    );

    Ok(Payload::Document(Value::Object(document)))
}

/// Write a role response back into the record.
///
/// The tenant is not part of the response; the caller supplies the scope
/// the request was made in.
pub fn from_remote(record: &mut RoleRecord, response: &Value, tenant: Option<&str>) -> Result<()> {
    let document = object(response, "role")?;
    let role_id = string_field(document, "id")
        .ok_or_else(|| Error::InvalidResponse("role response has no id".into()))?;

    let permissions = match document.get("permissions") {
        None | Some(Value::Null) => Vec::new(),
        Some(value) => serde_json::from_value::<Vec<PermissionGrant>>(value.clone())?,
    };

    record.id = Some(id::compose(&[role_id.as_str()])?);
    if let Some(name) = string_field(document, "name") {
        record.name = name;
    }
    record.description = string_field(document, "description");
    record.namespace = string_field(document, "namespace");
    record.is_default = document
        .get("isDefault")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    record.permissions = sorted_grants(&permissions);
    record.revision = revision(document);
    record.tenant_id = tenant.map(str::to_string);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operators() -> RoleRecord {
        let mut record = RoleRecord::new("operators")
            .grant(PermissionGrant::new("NAMESPACE", ["READ"]))
            .grant(PermissionGrant::new("FLOW", ["READ", "EXECUTE"]));
        record.description = Some("Runs flows".into());
        record.namespace = Some("company.team".into());
        record
    }

    #[test]
    fn test_to_remote_shape() {
        let Payload::Document(document) = to_remote(&operators()).unwrap() else {
            panic!("Expected a structured payload");
        };
        assert_eq!(document["name"], "operators");
        assert_eq!(document["description"], "Runs flows");
        assert_eq!(document["namespace"], "company.team");
        assert_eq!(document["isDefault"], false);
        assert_eq!(document["permissions"][1]["type"], "FLOW");
        assert_eq!(
            document["permissions"][1]["permissions"],
            json!(["READ", "EXECUTE"])
        );
        assert!(document.get("id").is_none());
    }

    #[test]
    fn test_optional_fields_omitted() {
        let Payload::Document(document) = to_remote(&RoleRecord::new("viewers")).unwrap() else {
            panic!("Expected a structured payload");
        };
        assert!(document.get("description").is_none());
        assert!(document.get("namespace").is_none());
        assert_eq!(document["permissions"], json!([]));
    }

    #[test]
    fn test_validation() {
        let err = validate(&RoleRecord::new(" ")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let empty_type = RoleRecord::new("x").grant(PermissionGrant::new("", ["READ"]));
        assert!(matches!(validate(&empty_type), Err(Error::Validation(_))));

        let duplicate = RoleRecord::new("x")
            .grant(PermissionGrant::new("flow", ["read"]))
            .grant(PermissionGrant::new("flow", ["execute"]));
        match validate(&duplicate) {
            Err(Error::Validation(message)) => assert!(message.contains("flow")),
            other => panic!("Expected Error::Validation, got {other:?}"),
        }
    }

    #[test]
    fn test_round_trip() {
        let record = operators();
        let Payload::Document(mut document) = to_remote(&record).unwrap() else {
            panic!("Expected a structured payload");
        };
        document["id"] = json!("role-1");
        document["revision"] = json!(1);
        document["unknown"] = json!("ignored");

        let mut restored = RoleRecord::default();
        from_remote(&mut restored, &document, Some("main")).unwrap();

        assert_eq!(restored.id.as_deref(), Some("role-1"));
        assert_eq!(restored.name, record.name);
        assert_eq!(restored.description, record.description);
        assert_eq!(restored.namespace, record.namespace);
        assert_eq!(restored.is_default, record.is_default);
        assert_eq!(restored.permissions, sorted_grants(&record.permissions));
        assert_eq!(restored.revision, Some(1));
        assert_eq!(restored.tenant_id.as_deref(), Some("main"));
        assert!(record.changes_from(&restored).is_empty());
    }

    #[test]
    fn test_from_remote_requires_id() {
        let mut record = RoleRecord::new("operators");
        let err = from_remote(&mut record, &json!({"name": "operators"}), None).unwrap_err();
        assert!(matches!(err, Error::InvalidResponse(_)));
        assert!(record.id.is_none());
    }

    #[test]
    fn test_from_remote_rejects_slash_in_id() {
        let mut record = RoleRecord::new("operators");
        let err = from_remote(&mut record, &json!({"id": "a/b"}), None).unwrap_err();
        assert!(matches!(err, Error::Identifier(_)));
    }
}
