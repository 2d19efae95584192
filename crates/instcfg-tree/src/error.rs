//! Error types for tree operations.

use std::io;
use std::path::PathBuf;

/// Result alias for tree operations.
pub type TreeResult<T> = Result<T, TreeError>;

/// Errors raised by [`ConfigTree`](crate::ConfigTree) operations.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// The path, or one of its ancestors, is absent.
    #[error("{path} is not present in this configuration tree")]
    NotFound { path: String },

    /// The path names a directory with no value of its own.
    #[error("{path} is a directory, not a value")]
    NotScalar { path: String },

    /// A value was written to the root.
    #[error("cannot set a value at the root of a configuration tree")]
    EmptyPath,

    /// A bulk response used a short-form token before any group was introduced.
    #[error("bulk response token '{token}' has no enclosing command group")]
    NoGroupContext { token: String },

    /// Reading or writing a configuration file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A configuration file did not hold a valid nested tree.
    #[error("invalid configuration file {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl TreeError {
    /// True when the error means "nothing is stored at this path".
    pub fn is_not_found(&self) -> bool {
        matches!(self, TreeError::NotFound { .. })
    }

    /// True when the error is a missing configuration file.
    pub fn is_missing_file(&self) -> bool {
        matches!(self, TreeError::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}
