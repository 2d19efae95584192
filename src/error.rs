//! Errors surfaced by the synchronization layer.

use instcfg_tree::TreeError;

use crate::transport::TransportError;

/// Result alias for [`SyncedConfig`](crate::SyncedConfig) operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Synchronization errors
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Lookup, merge or file error from the configuration tree.
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// The instrument could not be written to or queried.
    #[error("Transport error on '{command}': {source}")]
    Transport {
        command: String,
        #[source]
        source: TransportError,
    },

    /// Attempt to overwrite a reserved snapshot.
    #[error("Snapshot '{name}' is reserved and cannot be overwritten")]
    AccessDenied { name: String },

    /// Load from a snapshot that was never saved.
    #[error("No snapshot named '{name}'")]
    UnknownSnapshot { name: String },

    /// The identification reply cannot name a defaults file.
    #[error("Unusable identification string: '{0}'")]
    Identity(String),
}

impl SyncError {
    pub(crate) fn transport(command: &str, source: TransportError) -> Self {
        SyncError::Transport {
            command: command.to_string(),
            source,
        }
    }

    /// True when the error came from the instrument connection.
    pub fn is_transport(&self) -> bool {
        matches!(self, SyncError::Transport { .. })
    }
}
