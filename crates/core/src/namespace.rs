//! Versioned namespace names and the registry of current namespaces.
//!
//! A namespace is addressed by a `(kind, version)` pair and stored under the
//! rendered name `{kind}-v{version}`. Bumping a version produces a new name;
//! the old one is purged on activation. The registry is compared
//! structurally so that a typo in a stored name can never make it "current".

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// A versioned namespace identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NamespaceName {
    kind: String,
    version: String,
}

impl NamespaceName {
    /// Build a name from its parts, validating both.
    pub fn new(kind: &str, version: &str) -> Result<Self, Error> {
        let kind = kind.trim();
        let version = version.trim();
        let version = version.strip_prefix('v').unwrap_or(version);

        if kind.is_empty() || !kind.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') {
            return Err(Error::InvalidNamespace(format!("invalid kind: {kind:?}")));
        }
        if kind.starts_with('-') || kind.ends_with('-') {
            return Err(Error::InvalidNamespace(format!("invalid kind: {kind:?}")));
        }
        if version.is_empty() || !version.chars().all(|c| c.is_ascii_alphanumeric() || c == '.') {
            return Err(Error::InvalidNamespace(format!("invalid version: {version:?}")));
        }

        Ok(Self { kind: kind.to_string(), version: version.to_string() })
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

impl fmt::Display for NamespaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-v{}", self.kind, self.version)
    }
}

impl FromStr for NamespaceName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, version) = s
            .rsplit_once("-v")
            .ok_or_else(|| Error::InvalidNamespace(format!("missing version tag: {s:?}")))?;
        let name = Self::new(kind, version)?;

        // Only the canonical rendering addresses a namespace.
        if name.to_string() != s {
            return Err(Error::InvalidNamespace(format!("non-canonical name: {s:?}")));
        }
        Ok(name)
    }
}

/// The set of namespaces the running version considers current.
///
/// Holds at most one namespace per kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    current: Vec<NamespaceName>,
}

impl Registry {
    /// Build a registry, rejecting two versions of the same kind.
    pub fn new(names: impl IntoIterator<Item = NamespaceName>) -> Result<Self, Error> {
        let mut current: Vec<NamespaceName> = Vec::new();
        for name in names {
            if let Some(existing) = current.iter().find(|n| n.kind == name.kind) {
                return Err(Error::InvalidNamespace(format!(
                    "kind {:?} registered twice ({existing} and {name})",
                    name.kind
                )));
            }
            current.push(name);
        }
        Ok(Self { current })
    }

    /// The current namespace for `kind`.
    pub fn current(&self, kind: &str) -> Option<&NamespaceName> {
        self.current.iter().find(|n| n.kind == kind)
    }

    pub fn contains(&self, name: &NamespaceName) -> bool {
        self.current.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamespaceName> {
        self.current.iter()
    }

    /// Existing store names that are not current and must be purged.
    ///
    /// Names that do not parse as `{kind}-v{version}` are always stale.
    pub fn stale<'a>(&self, existing: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        existing
            .into_iter()
            .filter(|name| match name.parse::<NamespaceName>() {
                Ok(parsed) => !self.contains(&parsed),
                Err(_) => true,
            })
            .map(str::to_string)
            .collect()
    }
}
