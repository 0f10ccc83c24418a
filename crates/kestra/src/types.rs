//! Local configuration records.
//!
//! A record is the desired state of one Kestra resource as declared by the
//! user, plus the computed fields (identifier, revision, tenant) that the
//! reconcilers write back after talking to the server.

use crate::mapper;
use declarative::{ChangeSet, Record, equivalence};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a flow is sent to and read back from the server.
///
/// # Example
///
/// ```
/// use kestra::RepresentationMode;
///
/// assert_eq!(RepresentationMode::from_keep_original_source(true), RepresentationMode::Source);
/// assert_eq!(RepresentationMode::default(), RepresentationMode::Source);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepresentationMode {
    /// The YAML source is sent verbatim, keeping comments and indentation.
    #[default]
    Source,
    /// The YAML is decomposed into a JSON document; the server's canonical
    /// form is written back.
    Structured,
}

impl RepresentationMode {
    /// Map the `keep_original_source` flag to a mode.
    #[must_use]
    pub fn from_keep_original_source(keep: bool) -> Self {
        if keep { Self::Source } else { Self::Structured }
    }

    /// Get the mode name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Structured => "structured",
        }
    }
}

impl fmt::Display for RepresentationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A flow, addressed by namespace and flow id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowRecord {
    /// Composite identifier `<namespace>/<flow_id>`, set once the flow exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// The flow namespace.
    pub namespace: String,
    /// The flow id.
    pub flow_id: String,
    /// Server-assigned revision (computed).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<i64>,
    /// Representation mode.
    #[serde(default)]
    pub mode: RepresentationMode,
    /// The flow content as YAML.
    pub content: String,
}

impl FlowRecord {
    /// Fields whose change requires a remote write.
    pub const UPDATABLE: &'static [&'static str] = &["content"];

    /// Create a new source-mode flow record.
    pub fn new(
        namespace: impl Into<String>,
        flow_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            namespace: namespace.into(),
            flow_id: flow_id.into(),
            revision: None,
            mode: RepresentationMode::Source,
            content: content.into(),
        }
    }

    /// Set the representation mode.
    pub fn with_mode(mut self, mode: RepresentationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Compute what changed between a previously stored version and this one.
    ///
    /// Content is compared semantically: a reformatted document is not a
    /// change. Structured content is compared with its id and namespace
    /// filled in. Switching the mode always counts as a content change.
    pub fn changes_from(&self, previous: &FlowRecord) -> ChangeSet {
        let mode_changed = self.mode != previous.mode;
        ChangeSet::from_flags(&[
            ("namespace", self.namespace != previous.namespace),
            ("flow_id", self.flow_id != previous.flow_id),
            ("mode", mode_changed),
            ("content", mode_changed || self.content_differs(previous)),
        ])
    }

    fn content_differs(&self, previous: &FlowRecord) -> bool {
        if self.mode == RepresentationMode::Structured
            && let (Ok(declared), Ok(stored)) = (
                mapper::flow::addressed_content(self),
                mapper::flow::addressed_content(previous),
            )
        {
            return !equivalence::equivalent(&declared, &stored);
        }
        !equivalence::equivalent(&self.content, &previous.content)
    }
}

impl Record for FlowRecord {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }

    fn clear_id(&mut self) {
        self.id = None;
    }

    fn address(&self) -> String {
        format!("flow.{}/{}", self.namespace, self.flow_id)
    }
}

/// A permission grant: a category and the permissions it allows.
///
/// On the wire and in manifests the category is called `type`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionGrant {
    /// Permission category, e.g. "FLOW".
    #[serde(rename = "type", alias = "category")]
    pub category: String,
    /// Ordered permissions, e.g. ["READ", "EXECUTE"].
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl PermissionGrant {
    /// Create a grant.
    pub fn new<I, S>(category: impl Into<String>, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            category: category.into(),
            permissions: permissions.into_iter().map(Into::into).collect(),
        }
    }
}

/// Grants in canonical order (sorted by category).
pub fn sorted_grants(grants: &[PermissionGrant]) -> Vec<PermissionGrant> {
    let mut sorted = grants.to_vec();
    sorted.sort_by(|a, b| a.category.cmp(&b.category));
    sorted
}

/// A role, addressed by its server-assigned id within a tenant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    /// Server-assigned role id, set once the role exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Tenant the role lives in (computed).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    /// Local handle the role is addressed by; the name when unset.
    ///
    /// Never sent to the server. A stable key lets the name change in place.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// The linked namespace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// The role name.
    pub name: String,
    /// The role description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the role is given to new users by default.
    #[serde(default)]
    pub is_default: bool,
    /// Permission grants, unique by category.
    #[serde(default)]
    pub permissions: Vec<PermissionGrant>,
    /// Server-assigned revision (computed).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<i64>,
}

impl RoleRecord {
    /// Fields whose change requires a remote write.
    pub const UPDATABLE: &'static [&'static str] =
        &["namespace", "name", "description", "permissions", "is_default"];

    /// Create a new role record.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Address the role by `key` instead of its name.
    pub fn keyed(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Add a permission grant.
    pub fn grant(mut self, grant: PermissionGrant) -> Self {
        self.permissions.push(grant);
        self
    }

    /// Compute what changed between a previously stored version and this one.
    ///
    /// Grants are compared as a set keyed by category.
    pub fn changes_from(&self, previous: &RoleRecord) -> ChangeSet {
        ChangeSet::from_flags(&[
            ("namespace", self.namespace != previous.namespace),
            ("name", self.name != previous.name),
            ("description", self.description != previous.description),
            (
                "permissions",
                sorted_grants(&self.permissions) != sorted_grants(&previous.permissions),
            ),
            ("is_default", self.is_default != previous.is_default),
        ])
    }
}

impl Record for RoleRecord {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }

    fn clear_id(&mut self) {
        self.id = None;
    }

    fn address(&self) -> String {
        format!("role.{}", self.key.as_deref().unwrap_or(&self.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTENT: &str = "id: hello\nnamespace: company.team\ntasks:\n  - id: log\n    type: io.kestra.plugin.core.log.Log\n    message: hi\n";

    #[test]
    fn test_mode_from_flag() {
        assert_eq!(
            RepresentationMode::from_keep_original_source(true),
            RepresentationMode::Source
        );
        assert_eq!(
            RepresentationMode::from_keep_original_source(false),
            RepresentationMode::Structured
        );
        assert_eq!(RepresentationMode::Structured.to_string(), "structured");
    }

    #[test]
    fn test_flow_address() {
        let flow = FlowRecord::new("company.team", "hello", CONTENT);
        assert_eq!(flow.address(), "flow.company.team/hello");
        assert!(flow.state().is_absent());
    }

    #[test]
    fn test_flow_reformatting_is_not_a_change() {
        let previous = FlowRecord::new("company.team", "hello", CONTENT);
        let desired = FlowRecord::new(
            "company.team",
            "hello",
            "namespace: company.team\nid: hello\ntasks:\n    - id: log\n      type: io.kestra.plugin.core.log.Log\n      message: 'hi'\n",
        );
        assert!(desired.changes_from(&previous).is_empty());
    }

    #[test]
    fn test_structured_implicit_addressing_is_not_a_change() {
        let previous = FlowRecord::new(
            "company.team",
            "hello",
            "id: hello\nnamespace: company.team\ntasks: []\n",
        )
        .with_mode(RepresentationMode::Structured);
        let desired = FlowRecord::new("company.team", "hello", "tasks: []\n")
            .with_mode(RepresentationMode::Structured);
        assert!(desired.changes_from(&previous).is_empty());

        let changed = FlowRecord::new("company.team", "hello", "tasks: [{id: a}]\n")
            .with_mode(RepresentationMode::Structured);
        assert!(changed.changes_from(&previous).contains("content"));
    }

    #[test]
    fn test_flow_content_change() {
        let previous = FlowRecord::new("company.team", "hello", CONTENT);
        let desired = FlowRecord::new("company.team", "hello", CONTENT.replace("hi", "bye"));
        let changes = desired.changes_from(&previous);
        assert!(changes.touches(FlowRecord::UPDATABLE));
    }

    #[test]
    fn test_flow_mode_change_forces_content() {
        let previous = FlowRecord::new("company.team", "hello", CONTENT);
        let desired = previous.clone().with_mode(RepresentationMode::Structured);
        let changes = desired.changes_from(&previous);
        assert!(changes.contains("mode"));
        assert!(changes.contains("content"));
    }

    #[test]
    fn test_role_permissions_compared_as_set() {
        let previous = RoleRecord::new("operators")
            .grant(PermissionGrant::new("FLOW", ["READ", "EXECUTE"]))
            .grant(PermissionGrant::new("NAMESPACE", ["READ"]));
        let desired = RoleRecord::new("operators")
            .grant(PermissionGrant::new("NAMESPACE", ["READ"]))
            .grant(PermissionGrant::new("FLOW", ["READ", "EXECUTE"]));
        assert!(desired.changes_from(&previous).is_empty());
    }

    #[test]
    fn test_role_permission_order_within_grant_matters() {
        let previous =
            RoleRecord::new("operators").grant(PermissionGrant::new("FLOW", ["READ", "EXECUTE"]));
        let desired =
            RoleRecord::new("operators").grant(PermissionGrant::new("FLOW", ["EXECUTE", "READ"]));
        assert!(desired.changes_from(&previous).contains("permissions"));
    }

    #[test]
    fn test_role_description_change() {
        let previous = RoleRecord::new("operators");
        let mut desired = RoleRecord::new("operators");
        desired.description = Some("Runs flows".into());
        let changes = desired.changes_from(&previous);
        assert!(changes.touches(RoleRecord::UPDATABLE));
        assert!(!changes.contains("name"));
    }

    #[test]
    fn test_role_key_addresses_record() {
        assert_eq!(RoleRecord::new("operators").address(), "role.operators");

        let previous = RoleRecord::new("operators").keyed("ops");
        let renamed = RoleRecord::new("operators-team").keyed("ops");
        assert_eq!(renamed.address(), previous.address());
        assert!(renamed.changes_from(&previous).contains("name"));

        let json = serde_json::to_value(RoleRecord::new("operators")).unwrap();
        assert!(json.get("key").is_none());
    }

    #[test]
    fn test_permission_grant_serde_uses_type() {
        let grant = PermissionGrant::new("FLOW", ["READ"]);
        let json = serde_json::to_value(&grant).unwrap();
        assert_eq!(json["type"], "FLOW");
        assert_eq!(json["permissions"][0], "READ");

        let parsed: PermissionGrant =
            serde_json::from_str(r#"{"category": "NAMESPACE", "permissions": []}"#).unwrap();
        assert_eq!(parsed.category, "NAMESPACE");
    }
}
