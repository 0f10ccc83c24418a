//! # Declarative
//!
//! Reconciliation primitives for declaratively managed remote resources.
//!
//! This crate provides the resource-kind agnostic pieces of a reconciler:
//! comparing what a user declared against what a remote API holds, and
//! converging the two with the smallest correct remote operation.
//!
//! ## Core Concepts
//!
//! - **Record**: A locally declared resource instance, owned by a record store
//! - **Reconciler**: Create/read/update/delete/import for one resource kind
//! - **ChangeSet**: The previous-vs-desired diff the store hands to `update`
//! - **Composite identifier**: Several addressing keys packed into one string
//! - **Equivalence**: YAML documents compared by meaning, not formatting
//! - **Executor**: Runs one task per record with bounded parallelism
//!
//! ## Example
//!
//! ```
//! use declarative::{equivalence, id, ChangeSet};
//!
//! let flow_id = id::compose(&["company.team", "hello"]).unwrap();
//! assert_eq!(flow_id, "company.team/hello");
//! assert_eq!(id::decode(&flow_id, 2).unwrap(), ["company.team", "hello"]);
//!
//! // Reformatting is not a change
//! let changed = !equivalence::equivalent("id: hello\n", "id:   'hello'\n");
//! let changes = ChangeSet::from_flags(&[("content", changed)]);
//! assert!(changes.is_empty());
//! ```
//!
//! ## Callback Traits
//!
//! - [`ProgressCallback`]: Receives progress updates
//! - [`ConfirmCallback`]: Handles user confirmations
//!
//! This allows the crate to be used without hard dependencies on a
//! specific UI framework.

pub mod context;
pub mod diff;
pub mod equivalence;
pub mod executor;
pub mod id;
pub mod planner;
pub mod resource;
pub mod types;

// Re-export main types at crate root
pub use context::{AutoConfirm, AutoDecline, ConfirmCallback, NoProgress, ProgressCallback};
pub use diff::ChangeSet;
pub use equivalence::Comparison;
pub use executor::{BoxedTask, Task, execute};
pub use id::IdError;
pub use planner::ExecutionPlan;
pub use resource::{Reconciler, Record, staged};
pub use types::{ApplyResult, ExecuteOptions, ExecuteSummary, Outcome, ResourceState};
