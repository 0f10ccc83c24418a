use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use declarative::Record;
use kestra::{FlowRecord, RoleRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

// ============================================================================
// State Structures
// ============================================================================

/// Last-applied records, keyed by address
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct KestraState {
    /// Flows, keyed by `flow.<namespace>/<flow_id>`
    #[serde(default)]
    pub flows: BTreeMap<String, FlowRecord>,

    /// Roles, keyed by `role.<name>`
    #[serde(default)]
    pub roles: BTreeMap<String, RoleRecord>,

    /// Last time the state was updated
    pub last_updated: DateTime<Utc>,
}

impl KestraState {
    /// Load state from `path`, or return an empty state if the file doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("State file {} does not exist, using empty state", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;
        let state: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        log::debug!("Loaded state from {}", path.display());
        Ok(state)
    }

    /// Stamp `last_updated` and write the state to `path`
    pub fn save_to(&mut self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }

        self.last_updated = Utc::now();
        let content =
            serde_json::to_string_pretty(&self).context("Failed to serialize state to JSON")?;

        // Write then rename so a crash never leaves a truncated state file.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content)
            .with_context(|| format!("Failed to write state file: {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("Failed to replace state file: {}", path.display()))?;

        log::debug!("Saved state to {}", path.display());
        Ok(())
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.flows.len() + self.roles.len()
    }

    /// Check if no records are stored
    pub fn is_empty(&self) -> bool {
        self.flows.is_empty() && self.roles.is_empty()
    }

    // ========================================================================
    // Record Helpers
    // ========================================================================

    /// Store a flow if it exists remotely, forget it otherwise
    pub fn put_flow(&mut self, record: FlowRecord) {
        let address = record.address();
        if record.state().is_present() {
            self.flows.insert(address, record);
        } else {
            self.flows.remove(&address);
        }
    }

    /// Store a role if it exists remotely, forget it otherwise
    pub fn put_role(&mut self, record: RoleRecord) {
        let address = record.address();
        if record.state().is_present() {
            self.roles.insert(address, record);
        } else {
            self.roles.remove(&address);
        }
    }
}

impl Default for KestraState {
    fn default() -> Self {
        Self {
            flows: BTreeMap::new(),
            roles: BTreeMap::new(),
            last_updated: Utc::now(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
