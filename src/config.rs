//! Manifest loading
//!
//! A manifest is a TOML file declaring the Kestra server to talk to and the
//! flows and roles that should exist on it:
//!
//! ```toml
//! [provider]
//! url = "http://localhost:8080"
//! tenant_id = "main"
//!
//! [[flow]]
//! namespace = "company.team"
//! flow_id = "hello"
//! content_file = "flows/hello.yml"
//!
//! [[role]]
//! name = "operators"
//! permissions = [{ type = "FLOW", permissions = ["READ", "EXECUTE"] }]
//! ```

use anyhow::{Context, Result};
use declarative::Record;
use kestra::{FlowRecord, PermissionGrant, RepresentationMode, RoleRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::paths;

/// Default manifest file name
pub const DEFAULT_MANIFEST: &str = "kestra.toml";

/// Environment variable overriding the server URL
pub const ENV_URL: &str = "KESTRA_URL";

/// Environment variable overriding the tenant
pub const ENV_TENANT_ID: &str = "KESTRA_TENANT_ID";

/// Errors in a manifest's declarations
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("flow {0} declares both content and content_file")]
    ConflictingContent(String),

    #[error("flow {0} declares neither content nor content_file")]
    MissingContent(String),

    #[error("{0} is declared more than once")]
    DuplicateAddress(String),

    #[error("no Kestra server URL; set [provider].url or KESTRA_URL")]
    MissingUrl,
}

/// Top-level manifest
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Server connection settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Declared flows
    #[serde(default, rename = "flow")]
    pub flows: Vec<FlowDecl>,

    /// Declared roles
    #[serde(default, rename = "role")]
    pub roles: Vec<RoleDecl>,
}

/// `[provider]` table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    pub url: Option<String>,
    pub tenant_id: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// `[[flow]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlowDecl {
    pub namespace: String,
    pub flow_id: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub content_file: Option<String>,
    #[serde(default = "default_keep_original_source")]
    pub keep_original_source: bool,
}

fn default_keep_original_source() -> bool {
    true
}

/// `[[role]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleDecl {
    pub name: String,
    /// Handle the role is tracked by; renaming keeps it in place
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub permissions: Vec<PermissionGrant>,
}

/// Records declared by a manifest, in declaration order
#[derive(Debug, Clone, Default)]
pub struct Desired {
    pub flows: Vec<FlowRecord>,
    pub roles: Vec<RoleRecord>,
}

/// Resolved connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub url: String,
    pub tenant_id: Option<String>,
    pub timeout: Option<Duration>,
}

impl Manifest {
    /// Load a manifest from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read manifest {}", path.display()))?;
        let manifest = Self::parse(&content)
            .with_context(|| format!("Invalid manifest {}", path.display()))?;
        log::debug!(
            "Loaded {} flow(s) and {} role(s) from {}",
            manifest.flows.len(),
            manifest.roles.len(),
            path.display()
        );
        Ok(manifest)
    }

    /// Parse a manifest from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Turn declarations into records; `content_file` is read relative to `base`
    pub fn desired(&self, base: &Path) -> Result<Desired> {
        let mut seen = BTreeSet::new();
        let mut desired = Desired::default();

        for decl in &self.flows {
            let record = decl.to_record(base)?;
            if !seen.insert(record.address()) {
                return Err(ManifestError::DuplicateAddress(record.address()).into());
            }
            desired.flows.push(record);
        }

        for decl in &self.roles {
            let record = decl.to_record();
            if !seen.insert(record.address()) {
                return Err(ManifestError::DuplicateAddress(record.address()).into());
            }
            desired.roles.push(record);
        }

        Ok(desired)
    }

    /// Resolve connection settings, letting the environment override the file
    pub fn settings(&self) -> Result<Settings> {
        self.settings_with(|key| std::env::var(key).ok())
    }

    fn settings_with<F>(&self, env: F) -> Result<Settings>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |value: Option<String>| value.filter(|v| !v.is_empty());

        let url = non_empty(env(ENV_URL))
            .or_else(|| non_empty(self.provider.url.clone()))
            .ok_or(ManifestError::MissingUrl)?;
        let tenant_id =
            non_empty(env(ENV_TENANT_ID)).or_else(|| non_empty(self.provider.tenant_id.clone()));

        Ok(Settings {
            url,
            tenant_id,
            timeout: self.provider.timeout_secs.map(Duration::from_secs),
        })
    }
}

impl FlowDecl {
    fn address(&self) -> String {
        format!("flow.{}/{}", self.namespace, self.flow_id)
    }

    fn to_record(&self, base: &Path) -> Result<FlowRecord> {
        let content = match (&self.content, &self.content_file) {
            (Some(_), Some(_)) => return Err(ManifestError::ConflictingContent(self.address()).into()),
            (None, None) => return Err(ManifestError::MissingContent(self.address()).into()),
            (Some(content), None) => content.clone(),
            (None, Some(file)) => {
                let path: PathBuf = paths::resolve_relative(base, file);
                fs::read_to_string(&path).with_context(|| {
                    format!("Could not read content of {} from {}", self.address(), path.display())
                })?
            }
        };

        Ok(FlowRecord::new(&self.namespace, &self.flow_id, content).with_mode(
            RepresentationMode::from_keep_original_source(self.keep_original_source),
        ))
    }
}

impl RoleDecl {
    fn to_record(&self) -> RoleRecord {
        RoleRecord {
            name: self.name.clone(),
            key: filled(self.key.as_deref()),
            description: filled(self.description.as_deref()),
            namespace: filled(self.namespace.as_deref()),
            is_default: self.is_default,
            permissions: self.permissions.clone(),
            ..RoleRecord::default()
        }
    }
}

/// Empty strings count as unset
fn filled(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

/// Directory a manifest's relative paths are resolved against
pub fn manifest_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
