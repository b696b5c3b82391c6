//! Newtype identifiers.
//!
//! A [`MethodName`] is the path segment naming a remote procedure; a [`CallId`]
//! correlates every attempt of one top-level call in the logs. Keeping them as
//! distinct types prevents passing a raw URL fragment where a validated method
//! name is expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Method names
// ---------------------------------------------------------------------------

/// Names a remote procedure; appended to the server base address as the last
/// path segment (`<base>/<method>`).
///
/// A method name is a single, non-empty path segment. It never contains `/`,
/// `\\`, `?`, `#` or whitespace and is never the dot-segment `.` or `..`, so
/// it can be appended to a URL without escaping or normalisation changing the
/// path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MethodName(String);

impl MethodName {
    /// Creates a method name, returning `None` if `value` is not a valid
    /// single path segment.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let v = value.into();
        if is_path_segment(&v) {
            Some(Self(v))
        } else {
            None
        }
    }

    /// Returns the method name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_path_segment(value: &str) -> bool {
    // URL parsing resolves dot-segments and treats `\` as `/` for http(s).
    !value.is_empty()
        && !is_dot_segment(value)
        && !value
            .chars()
            .any(|c| matches!(c, '/' | '\\' | '?' | '#') || c.is_whitespace())
}

/// `.` or `..`, including their `%2e` spellings.
fn is_dot_segment(value: &str) -> bool {
    let decoded = value.to_ascii_lowercase().replace("%2e", ".");
    matches!(decoded.as_str(), "." | "..")
}

impl TryFrom<String> for MethodName {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value.clone()).ok_or_else(|| format!("invalid method name: {value:?}"))
    }
}

impl From<MethodName> for String {
    fn from(value: MethodName) -> Self {
        value.0
    }
}

impl std::borrow::Borrow<str> for MethodName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MethodName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Call identifiers
// ---------------------------------------------------------------------------

/// Identifies a single top-level call, including all of its retries.
///
/// Generated fresh for every call invocation and attached to the call's span so
/// the attempts of one call can be told apart from a concurrent call to the
/// same method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallId(Uuid);

impl CallId {
    /// Generates a new random call identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Ping")]
    #[case("get_balance")]
    #[case("v2.lookup")]
    #[case("...")]
    fn accepts_single_segments(#[case] name: &str) {
        let method = MethodName::new(name).expect("valid method name");
        assert_eq!(method.as_str(), name);
        assert_eq!(method.to_string(), name);
    }

    #[rstest]
    #[case("")]
    #[case("a/b")]
    #[case("/Ping")]
    #[case("Ping?x=1")]
    #[case("Ping#frag")]
    #[case("two words")]
    #[case(".")]
    #[case("..")]
    #[case("a\\b")]
    #[case("a\\..\\..\\x")]
    #[case("%2e%2e")]
    #[case(".%2E")]
    fn rejects_non_segments(#[case] name: &str) {
        assert!(MethodName::new(name).is_none());
    }

    #[test]
    fn deserialisation_validates() {
        let ok: MethodName = serde_json::from_str("\"Ping\"").unwrap();
        assert_eq!(ok.as_str(), "Ping");
        assert!(serde_json::from_str::<MethodName>("\"a/b\"").is_err());
    }

    #[test]
    fn call_ids_are_unique() {
        assert_ne!(CallId::new_random(), CallId::new_random());
    }
}
