//! Reconciliation engine for kestractl
//!
//! The engine orchestrates:
//! 1. Planning - Compare declared records with the last-applied state
//! 2. Diffing - Show what would change
//! 3. Executing - Drive each record through its reconciler and record the results

pub mod differ;
pub mod executor;
pub mod planner;

pub use executor::Batch;
pub use planner::Plan;
