//! Change sets between a previous and a desired record
//!
//! The record store owns both versions of a record, so it is the one that
//! knows which fields changed. It hands that knowledge to a reconciler as a
//! [`ChangeSet`]; reconcilers never infer it themselves.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Set of field names that differ between a previous and a desired record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    fields: BTreeSet<String>,
}

impl ChangeSet {
    /// An empty change set
    pub fn none() -> Self {
        Self::default()
    }

    /// A change set with the given fields marked as changed
    pub fn of<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Build a change set from `(field, changed)` pairs
    pub fn from_flags(flags: &[(&str, bool)]) -> Self {
        Self::of(
            flags
                .iter()
                .filter(|(_, changed)| *changed)
                .map(|(field, _)| *field),
        )
    }

    /// Mark a field as changed
    pub fn insert(&mut self, field: impl Into<String>) {
        self.fields.insert(field.into());
    }

    /// Check if a specific field changed
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains(field)
    }

    /// Check if any of the given fields changed
    pub fn touches(&self, fields: &[&str]) -> bool {
        fields.iter().any(|f| self.contains(f))
    }

    /// Check if nothing changed
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Changed field names in sorted order
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }
}

impl fmt::Display for ChangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "(no changes)");
        }
        write!(f, "{}", self.fields().collect::<Vec<_>>().join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_is_empty() {
        let changes = ChangeSet::none();
        assert!(changes.is_empty());
        assert!(!changes.touches(&["content"]));
    }

    #[test]
    fn test_touches() {
        let changes = ChangeSet::of(["description"]);
        assert!(changes.touches(&["name", "description"]));
        assert!(!changes.touches(&["content"]));
        assert!(changes.contains("description"));
    }

    #[test]
    fn test_from_flags() {
        let changes = ChangeSet::from_flags(&[("name", false), ("content", true)]);
        assert!(changes.contains("content"));
        assert!(!changes.contains("name"));
    }

    #[test]
    fn test_insert_and_display() {
        let mut changes = ChangeSet::none();
        assert_eq!(changes.to_string(), "(no changes)");
        changes.insert("permissions");
        changes.insert("is_default");
        assert_eq!(changes.to_string(), "is_default, permissions");
    }
}
