//! Domain newtypes with validation
//!
//! Strongly-typed wrappers for the logical path of a change and the
//! identifier of a remote item. Each newtype ensures validity at
//! construction time.

use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// Path types
// ============================================================================

/// A logical path relative to the sync root, e.g. `"Projects/plan.txt"`
///
/// Leading and trailing slashes are stripped on construction, so
/// `"/Projects/plan.txt"` and `"Projects/plan.txt"` are the same path.
/// The path is never empty and never escapes the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RelativePath(String);

impl RelativePath {
    /// Create a new RelativePath
    ///
    /// # Errors
    /// Returns error if the path is empty, contains empty, `.` or `..`
    /// components, or contains a NUL byte.
    pub fn new(path: impl Into<String>) -> Result<Self, DomainError> {
        let path = path.into();
        let trimmed = path.trim_matches('/');

        if trimmed.is_empty() {
            return Err(DomainError::InvalidPath(format!(
                "Relative path cannot be empty: {path:?}"
            )));
        }

        if trimmed.contains('\0') {
            return Err(DomainError::InvalidPath(format!(
                "Relative path contains a NUL byte: {path:?}"
            )));
        }

        for component in trimmed.split('/') {
            match component {
                "" => {
                    return Err(DomainError::InvalidPath(format!(
                        "Relative path contains invalid double slashes: {path}"
                    )))
                }
                "." | ".." => {
                    return Err(DomainError::InvalidPath(format!(
                        "Relative path contains invalid traversal: {path}"
                    )))
                }
                _ => {}
            }
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Join a single path component
    ///
    /// # Errors
    /// Returns error if component is empty or contains a separator
    pub fn join(&self, component: &str) -> Result<Self, DomainError> {
        if component.is_empty() || component.contains('/') {
            return Err(DomainError::InvalidPath(format!(
                "Invalid path component: {component}"
            )));
        }
        Self::new(format!("{}/{component}", self.0))
    }

    /// Returns this path with `"." + extension` appended to the last component
    ///
    /// `"Reports/q3"` with `"docx"` becomes `"Reports/q3.docx"`.
    ///
    /// # Errors
    /// Returns error if the extension is empty or contains a separator
    pub fn with_appended_extension(&self, extension: &str) -> Result<Self, DomainError> {
        if extension.is_empty() || extension.contains('/') {
            return Err(DomainError::InvalidPath(format!(
                "Invalid extension: {extension:?}"
            )));
        }
        Ok(Self(format!("{}.{extension}", self.0)))
    }

    /// Map this logical path into a local directory tree
    #[must_use]
    pub fn to_local(&self, root: &Path) -> PathBuf {
        self.0
            .split('/')
            .fold(root.to_path_buf(), |acc, component| acc.join(component))
    }
}

impl Display for RelativePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RelativePath {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for RelativePath {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RelativePath> for String {
    fn from(path: RelativePath) -> Self {
        path.0
    }
}

// ============================================================================
// Remote identifiers
// ============================================================================

/// Remote item ID (opaque identifier issued by the cloud drive)
///
/// Format: alphanumeric string with `-`, `_`, `!` or `.`, e.g.
/// `"1a2B3c_4D-5e6F7g"`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemoteId(String);

impl RemoteId {
    /// Create a new RemoteId
    ///
    /// # Errors
    /// Returns error if the ID format is invalid
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.is_empty() {
            return Err(DomainError::InvalidRemoteId(
                "Remote ID cannot be empty".to_string(),
            ));
        }

        if !id
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '!' | '-' | '_' | '.'))
        {
            return Err(DomainError::InvalidRemoteId(format!(
                "Remote ID contains invalid characters: {id}"
            )));
        }

        Ok(Self(id))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RemoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RemoteId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for RemoteId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RemoteId> for String {
    fn from(id: RemoteId) -> Self {
        id.0
    }
}
