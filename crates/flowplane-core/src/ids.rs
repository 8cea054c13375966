//! Identifier types for flowplane.
//!
//! Component ids are assigned by the control plane and are opaque strings.
//! They are validated only far enough to be safe to splice into a URL path.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Identifier of a component in the dataflow graph.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ComponentId(String);

impl ComponentId {
    /// Parse a component id.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidId` if the id is empty, contains whitespace,
    /// or contains a URL path or query separator.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let invalid = s.is_empty()
            || s.chars()
                .any(|c| c.is_whitespace() || matches!(c, '/' | '?' | '#' | '&'));
        if invalid {
            return Err(CoreError::InvalidId(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    /// Return the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentId({})", self.0)
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ComponentId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ComponentId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ComponentId> for String {
    fn from(id: ComponentId) -> Self {
        id.0
    }
}

impl AsRef<str> for ComponentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Optimistic-concurrency token carried by every component.
///
/// The control plane increments the version on each accepted mutation and
/// rejects mutations that carry anything but the current version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Revision {
    /// Monotonic version number.
    #[serde(default)]
    pub version: u64,
}

impl Revision {
    /// Create a revision with the given version.
    #[must_use]
    pub const fn new(version: u64) -> Self {
        Self { version }
    }

    /// The revision the control plane assigns after one more mutation.
    #[must_use]
    pub const fn next(self) -> Self {
        Self {
            version: self.version + 1,
        }
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_id_parse() {
        let id = ComponentId::parse("0171100a-abcd").unwrap();
        assert_eq!(id.as_str(), "0171100a-abcd");
        assert_eq!(id.to_string(), "0171100a-abcd");
    }

    #[test]
    fn component_id_rejects_path_characters() {
        assert!(ComponentId::parse("").is_err());
        assert!(ComponentId::parse("a/b").is_err());
        assert!(ComponentId::parse("a?version=1").is_err());
        assert!(ComponentId::parse("a b").is_err());
    }

    #[test]
    fn component_id_serde() {
        let id = ComponentId::parse("proc-1").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"proc-1\"");

        let parsed: ComponentId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);

        assert!(serde_json::from_str::<ComponentId>("\"\"").is_err());
    }

    #[test]
    fn revision_ordering() {
        let rev = Revision::new(3);
        assert!(rev.next() > rev);
        assert_eq!(rev.next().version, 4);
        assert_eq!(rev.to_string(), "v3");
    }

    #[test]
    fn revision_missing_version_defaults_to_zero() {
        let rev: Revision = serde_json::from_str("{}").unwrap();
        assert_eq!(rev, Revision::default());
    }
}
