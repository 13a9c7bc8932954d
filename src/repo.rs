//! Contract for module repositories
//!
//! A repository stores every version of a single module. Commands reach it
//! through the [`Context`](crate::context::Context); this crate ships no backend.

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepoError {
    /// The repository, revision or version does not exist
    #[error("{0}")]
    NotExist(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Other(String),
}

impl RepoError {
    #[must_use]
    pub fn is_not_exist(&self) -> bool {
        match self {
            RepoError::NotExist(_) => true,
            RepoError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            RepoError::Other(_) => false,
        }
    }
}

/// A single revision in a module repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RevInfo {
    /// Suggested version string for this revision
    pub version: String,
    /// Commit time
    pub time: DateTime<Utc>,
    /// Complete identifier in the underlying repository
    #[serde(skip)]
    pub name: String,
    /// Shortened identifier, used when deriving version strings
    #[serde(skip)]
    pub short: String,
}

/// All versions of a single module.
///
/// Implementations must be safe for simultaneous use from multiple threads.
pub trait Repo: Send + Sync {
    fn module_path(&self) -> &str;

    /// Known versions starting with `prefix`, sorted in version order.
    ///
    /// # Errors
    ///
    /// An empty list is not an error. Returns `RepoError::NotExist` when the
    /// repository itself does not exist.
    fn versions(&self, prefix: &str) -> Result<Vec<String>, RepoError>;

    /// Information about any revision the backing store understands
    /// (commit hash, branch, tag, ...).
    ///
    /// # Errors
    ///
    /// Returns `RepoError::NotExist` for unknown revisions.
    fn stat(&self, rev: &str) -> Result<RevInfo, RepoError>;

    /// The latest revision on the default branch.
    ///
    /// # Errors
    ///
    /// Returns a `RepoError` when the repository cannot be queried.
    fn latest(&self) -> Result<RevInfo, RepoError>;

    /// Raw bytes of the module descriptor file at `version`.
    ///
    /// # Errors
    ///
    /// Returns `RepoError::NotExist` for unknown versions.
    fn module_descriptor(&self, version: &str) -> Result<Vec<u8>, RepoError>;

    /// Stream the package archive for `version` into `dst`.
    ///
    /// # Errors
    ///
    /// Returns `RepoError::NotExist` for unknown versions and `RepoError::Io`
    /// when writing fails.
    fn archive(&self, dst: &mut dyn Write, version: &str) -> Result<(), RepoError>;
}
