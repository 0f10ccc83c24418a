//! Composite identifiers
//!
//! Resources scoped by more than one key (e.g. a flow living in a namespace)
//! are persisted by the record store under a single opaque string. This
//! module composes that string from its components and decodes it back.
//!
//! The encoding is a plain join on [`SEPARATOR`], which is not allowed
//! inside any component. There are no counters or random parts, so an
//! identifier written by one process decodes identically in another.

use thiserror::Error;

/// Separator placed between identifier components
pub const SEPARATOR: char = '/';

/// Errors produced by the identifier codec
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// A component cannot be encoded
    #[error("invalid identifier component #{index} {component:?}: {reason}")]
    InvalidComponent {
        index: usize,
        component: String,
        reason: &'static str,
    },

    /// An identifier does not have the expected shape
    #[error("malformed identifier {id:?}: expected {expected} component(s) separated by '/'")]
    MalformedIdentifier { id: String, expected: usize },
}

/// Compose an identifier from its ordered components
///
/// Fails if a component is empty or contains the separator.
pub fn compose<S: AsRef<str>>(components: &[S]) -> Result<String, IdError> {
    for (index, component) in components.iter().enumerate() {
        let component = component.as_ref();
        if component.is_empty() {
            return Err(IdError::InvalidComponent {
                index,
                component: String::new(),
                reason: "component is empty",
            });
        }
        if component.contains(SEPARATOR) {
            return Err(IdError::InvalidComponent {
                index,
                component: component.to_string(),
                reason: "component contains the separator",
            });
        }
    }

    let separator = SEPARATOR.to_string();
    Ok(components
        .iter()
        .map(|c| c.as_ref())
        .collect::<Vec<&str>>()
        .join(separator.as_str()))
}

/// Decode an identifier into exactly `arity` components
pub fn decode(id: &str, arity: usize) -> Result<Vec<String>, IdError> {
    let malformed = || IdError::MalformedIdentifier {
        id: id.to_string(),
        expected: arity,
    };

    if arity == 0 {
        return Err(malformed());
    }

    let parts: Vec<&str> = id.split(SEPARATOR).collect();
    if parts.len() != arity || parts.iter().any(|p| p.is_empty()) {
        return Err(malformed());
    }

    Ok(parts.into_iter().map(str::to_string).collect())
}

/// Decode a two-component identifier into a pair
pub fn decode_pair(id: &str) -> Result<(String, String), IdError> {
    let mut parts = decode(id, 2)?.into_iter();
    match (parts.next(), parts.next()) {
        (Some(first), Some(second)) => Ok((first, second)),
        _ => Err(IdError::MalformedIdentifier {
            id: id.to_string(),
            expected: 2,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_joins_components() {
        assert_eq!(compose(&["company.team", "hello"]).unwrap(), "company.team/hello");
        assert_eq!(compose(&["role-id"]).unwrap(), "role-id");
    }

    #[test]
    fn test_round_trip() {
        let cases: &[&[&str]] = &[
            &["company.team", "hello_world"],
            &["a", "b", "c"],
            &["single"],
            &["io.kestra-tests", "flow-1.2"],
            &["x", "y"],
            &[".", "-"],
            &["équipe.données", "flüsse"],
            &["名前空間", "フロー"],
            &["a.b.c.d", "_", "-.-"],
        ];

        for &components in cases {
            let id = compose(components).unwrap();
            let decoded = decode(&id, components.len()).unwrap();
            assert_eq!(decoded, components.to_vec());
            assert_eq!(compose(decoded.as_slice()).unwrap(), id);
        }
    }

    #[test]
    fn test_round_trip_generated() {
        const PIECES: &[&str] = &[
            "a", "Z", "9", "-", "_", ".", "..", "é", "名前", "io.kestra-tests", "flow v2", "a:b",
        ];

        for arity in 1..=3 {
            let mut indices = vec![0; arity];
            loop {
                let components: Vec<&str> = indices.iter().map(|&i| PIECES[i]).collect();
                let id = compose(&components).unwrap();
                assert_eq!(decode(&id, arity).unwrap(), components, "{id}");
                assert!(decode(&id, arity + 1).is_err(), "{id}");

                let mut position = 0;
                while position < arity {
                    indices[position] += 1;
                    if indices[position] < PIECES.len() {
                        break;
                    }
                    indices[position] = 0;
                    position += 1;
                }
                if position == arity {
                    break;
                }
            }
        }
    }

    #[test]
    fn test_compose_rejects_empty_component() {
        let err = compose(&["company", ""]).unwrap_err();
        assert!(matches!(err, IdError::InvalidComponent { index: 1, .. }));
    }

    #[test]
    fn test_compose_rejects_separator_in_component() {
        let err = compose(&["company/team", "hello"]).unwrap_err();
        assert!(matches!(err, IdError::InvalidComponent { index: 0, .. }));
    }

    #[test]
    fn test_decode_wrong_arity() {
        assert!(matches!(
            decode("no-separator", 2),
            Err(IdError::MalformedIdentifier { expected: 2, .. })
        ));
        assert!(decode("a/b/c", 2).is_err());
        assert!(decode("a/b", 1).is_err());
        assert!(decode("a", 0).is_err());
    }

    #[test]
    fn test_decode_empty_component() {
        assert!(decode("/hello", 2).is_err());
        assert!(decode("company/", 2).is_err());
        assert!(decode("", 1).is_err());
    }

    #[test]
    fn test_decode_pair() {
        let (namespace, flow_id) = decode_pair("company.team/hello").unwrap();
        assert_eq!(namespace, "company.team");
        assert_eq!(flow_id, "hello");
    }

    #[test]
    fn test_error_display() {
        let err = decode("oops", 2).unwrap_err();
        let display = err.to_string();
        assert!(display.contains("oops"));
        assert!(display.contains("2 component"));
    }
}
