//! Core types for reconciliation

use serde::{Deserialize, Serialize};

/// Observed state of a resource instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceState {
    /// Resource exists on the remote side
    Present,
    /// Resource does not exist (never created, deleted, or drifted away)
    Absent,
}

impl ResourceState {
    /// Check if state represents presence
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present)
    }

    /// Check if state represents absence
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

/// Result of a single reconciliation call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Resource was created
    Created,
    /// Resource was replaced with the desired content
    Updated,
    /// Nothing relevant changed; the record was refreshed without a write
    Unchanged,
    /// Record was refreshed from the remote side
    Refreshed,
    /// Resource was deleted
    Removed,
    /// Resource disappeared out of band; the local identifier was cleared
    Drifted,
}

impl Outcome {
    /// Check if the outcome involved a remote write
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Created | Self::Updated | Self::Removed)
    }
}

/// Result of running a reconciliation task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyResult {
    /// Task completed with an outcome
    Done(Outcome),
    /// Task failed
    Failed { error: String },
    /// Task was skipped
    Skipped { reason: String },
}

impl ApplyResult {
    /// Check if the result represents success (no failure)
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    /// Check if the result represents a remote write
    pub fn is_change(&self) -> bool {
        matches!(self, Self::Done(outcome) if outcome.is_write())
    }
}

/// Summary of execution results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
    pub unchanged: usize,
    pub drifted: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl ExecuteSummary {
    /// Total number of remote writes made
    pub fn total_changes(&self) -> usize {
        self.created + self.updated + self.removed
    }

    /// Check if execution was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of tasks processed
    pub fn total(&self) -> usize {
        self.total_changes() + self.unchanged + self.drifted + self.skipped + self.failed
    }

    /// Merge another summary into this one
    pub fn merge(&mut self, other: &ExecuteSummary) {
        self.created += other.created;
        self.updated += other.updated;
        self.removed += other.removed;
        self.unchanged += other.unchanged;
        self.drifted += other.drifted;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, result: &ApplyResult) {
        match result {
            ApplyResult::Done(Outcome::Created) => self.created += 1,
            ApplyResult::Done(Outcome::Updated) => self.updated += 1,
            ApplyResult::Done(Outcome::Removed) => self.removed += 1,
            ApplyResult::Done(Outcome::Unchanged | Outcome::Refreshed) => self.unchanged += 1,
            ApplyResult::Done(Outcome::Drifted) => self.drifted += 1,
            ApplyResult::Failed { .. } => self.failed += 1,
            ApplyResult::Skipped { .. } => self.skipped += 1,
        }
    }
}

/// Options for execution
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Number of records reconciled in parallel
    pub jobs: usize,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            jobs: 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_is_write() {
        assert!(Outcome::Created.is_write());
        assert!(Outcome::Updated.is_write());
        assert!(Outcome::Removed.is_write());
        assert!(!Outcome::Unchanged.is_write());
        assert!(!Outcome::Refreshed.is_write());
        assert!(!Outcome::Drifted.is_write());
    }

    #[test]
    fn test_summary_add_and_merge() {
        let mut summary = ExecuteSummary::default();
        summary.add_result(&ApplyResult::Done(Outcome::Created));
        summary.add_result(&ApplyResult::Done(Outcome::Unchanged));
        summary.add_result(&ApplyResult::Failed {
            error: "boom".into(),
        });

        assert_eq!(summary.total_changes(), 1);
        assert_eq!(summary.total(), 3);
        assert!(!summary.is_success());

        let mut other = ExecuteSummary::default();
        other.add_result(&ApplyResult::Done(Outcome::Drifted));
        summary.merge(&other);
        assert_eq!(summary.drifted, 1);
        assert_eq!(summary.total(), 4);
    }

    #[test]
    fn test_resource_state() {
        assert!(ResourceState::Present.is_present());
        assert!(ResourceState::Absent.is_absent());
    }
}
