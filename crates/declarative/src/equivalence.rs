//! Semantic equivalence of YAML source documents
//!
//! The control plane may hand back a document that was reformatted on the
//! server: different indentation, re-ordered keys, other quoting. Such a
//! document is still "the same" as the one the user wrote, and must not
//! show up as a change.
//!
//! Both documents are parsed into [`serde_yaml::Value`] trees and compared
//! structurally:
//! - mappings: keys as an unordered set, values recursively
//! - sequences: element-wise, order matters
//! - numbers: by value, so `1` and `1.0` are equal
//! - strings: verbatim

use serde_yaml::{Mapping, Number, Value};
use std::fmt;

/// Which side of a comparison a problem came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The locally authored document
    Local,
    /// The document returned by the remote API
    Remote,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Local => write!(f, "local"),
            Side::Remote => write!(f, "remote"),
        }
    }
}

/// Result of comparing two documents
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparison {
    /// Both documents parse to the same content
    Equivalent,
    /// Both documents parse, but their content differs
    Different,
    /// One of the documents could not be parsed
    Unparseable { side: Side, message: String },
}

impl Comparison {
    /// Check if the documents were found equivalent
    pub fn is_equivalent(&self) -> bool {
        matches!(self, Self::Equivalent)
    }
}

/// Compare two YAML documents for semantic equivalence
pub fn compare(local: &str, remote: &str) -> Comparison {
    let local_value = match serde_yaml::from_str::<Value>(local) {
        Ok(v) => v,
        Err(e) => {
            return Comparison::Unparseable {
                side: Side::Local,
                message: e.to_string(),
            };
        }
    };
    let remote_value = match serde_yaml::from_str::<Value>(remote) {
        Ok(v) => v,
        Err(e) => {
            return Comparison::Unparseable {
                side: Side::Remote,
                message: e.to_string(),
            };
        }
    };

    if values_equivalent(&local_value, &remote_value) {
        Comparison::Equivalent
    } else {
        Comparison::Different
    }
}

/// Check if two YAML documents are semantically equivalent
///
/// A document that fails to parse is never equivalent to anything; the
/// parse error is logged as a warning and the pair is treated as changed.
pub fn equivalent(local: &str, remote: &str) -> bool {
    match compare(local, remote) {
        Comparison::Equivalent => true,
        Comparison::Different => false,
        Comparison::Unparseable { side, message } => {
            log::warn!("Cannot parse {side} document, treating it as changed: {message}");
            false
        }
    }
}

/// Structural comparison of two parsed values
pub fn values_equivalent(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Sequence(x), Value::Sequence(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| values_equivalent(l, r))
        }
        (Value::Mapping(x), Value::Mapping(y)) => mappings_equivalent(x, y),
        (Value::Tagged(x), Value::Tagged(y)) => {
            x.tag == y.tag && values_equivalent(&x.value, &y.value)
        }
        _ => false,
    }
}

fn mappings_equivalent(a: &Mapping, b: &Mapping) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.iter().all(|(key, value)| {
        // Fast path for the common case of a plain string key
        if let Some(other) = b.get(key) {
            return values_equivalent(value, other);
        }
        b.iter()
            .any(|(k, v)| values_equivalent(key, k) && values_equivalent(value, v))
    })
}

fn numbers_equal(a: &Number, b: &Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y || (x.is_nan() && y.is_nan()),
        _ => false,
    }
}
