//! Saving and restoring whole configurations.
//!
//! A configuration can be saved to or loaded from a caller's tree, a named
//! in-memory snapshot, or a JSON file. Loading always rewrites the loaded
//! sub-group to the instrument.

use std::path::PathBuf;

use instcfg_tree::ConfigTree;
use tracing::{debug, info};

use crate::error::{SyncError, SyncResult};
use crate::transport::Transport;

use super::config::SyncedConfig;

/// Factory defaults, loaded from the defaults directory on first use.
pub const DEFAULT_SNAPSHOT: &str = "default";

/// First value read from the instrument for every path.
pub const INIT_SNAPSHOT: &str = "init";

/// Snapshot names starting with one of these cannot be saved to.
pub const RESERVED_SNAPSHOTS: [&str; 2] = [DEFAULT_SNAPSHOT, INIT_SNAPSHOT];

/// Marks a snapshot name in command-line style tokens (`+name`).
const SNAPSHOT_MARKER: char = '+';

/// Where [`SyncedConfig::save_config`] writes to.
#[derive(Debug)]
pub enum ConfigTarget<'a> {
    InMemory(&'a mut ConfigTree),
    Snapshot(String),
    File(PathBuf),
}

impl ConfigTarget<'static> {
    /// `+name` is a snapshot, anything else a file path.
    pub fn from_token(token: &str) -> Self {
        match token.strip_prefix(SNAPSHOT_MARKER) {
            Some(name) => ConfigTarget::Snapshot(name.to_string()),
            None => ConfigTarget::File(PathBuf::from(token)),
        }
    }
}

/// Where [`SyncedConfig::load_config`] reads from.
#[derive(Debug, Clone)]
pub enum ConfigSource<'a> {
    InMemory(&'a ConfigTree),
    Snapshot(String),
    File(PathBuf),
}

impl ConfigSource<'static> {
    /// `+name` is a snapshot, anything else a file path.
    pub fn from_token(token: &str) -> Self {
        match token.strip_prefix(SNAPSHOT_MARKER) {
            Some(name) => ConfigSource::Snapshot(name.to_string()),
            None => ConfigSource::File(PathBuf::from(token)),
        }
    }
}

pub fn is_reserved(name: &str) -> bool {
    RESERVED_SNAPSHOTS.iter().any(|prefix| name.starts_with(prefix))
}

impl<T: Transport> SyncedConfig<T> {
    /// Save `subgroup` of the live configuration.
    ///
    /// An in-memory tree always has the sub-group merged into it, so its
    /// other keys survive. For snapshots and files, `overwrite` replaces the
    /// destination; without it the sub-group is merged into what exists.
    /// Reserved snapshot names are refused.
    pub fn save_config(
        &mut self,
        target: ConfigTarget<'_>,
        subgroup: &str,
        overwrite: bool,
    ) -> SyncResult<()> {
        match target {
            ConfigTarget::InMemory(tree) => tree.transfer(&self.live, subgroup),
            ConfigTarget::Snapshot(name) => {
                if is_reserved(&name) {
                    return Err(SyncError::AccessDenied { name });
                }
                debug!(snapshot = %name, subgroup, overwrite, "saving snapshot");
                if !overwrite {
                    if let Some(existing) = self.snapshots.get_mut(&name) {
                        existing.transfer(&self.live, subgroup);
                        return Ok(());
                    }
                }
                self.snapshots.insert(name, self.live.copy(subgroup));
            }
            ConfigTarget::File(path) => {
                self.live.save(&path, subgroup, overwrite)?;
            }
        }
        Ok(())
    }

    /// Merge `subgroup` of a saved configuration into the live one and send
    /// every command of that sub-group, changed or not.
    ///
    /// Returns the number of commands written.
    pub fn load_config(&mut self, source: ConfigSource<'_>, subgroup: &str) -> SyncResult<usize> {
        match source {
            ConfigSource::InMemory(tree) => self.live.transfer(tree, subgroup),
            ConfigSource::Snapshot(name) => {
                if name == DEFAULT_SNAPSHOT {
                    self.ensure_default_loaded()?;
                }
                let tree = match name.as_str() {
                    DEFAULT_SNAPSHOT => self.default.as_ref(),
                    INIT_SNAPSHOT => Some(&self.init),
                    _ => self.snapshots.get(&name),
                }
                .ok_or_else(|| SyncError::UnknownSnapshot { name: name.clone() })?;
                self.live.transfer(tree, subgroup);
            }
            ConfigSource::File(path) => {
                let tree = ConfigTree::from_file(&path, subgroup)?;
                self.live.transfer(&tree, subgroup);
            }
        }

        let written = self.set_hardware_config(subgroup)?;
        info!(subgroup, written, "configuration loaded to instrument");
        Ok(written)
    }

    /// A saved snapshot, including the reserved ones once they exist.
    pub fn snapshot(&self, name: &str) -> Option<&ConfigTree> {
        match name {
            DEFAULT_SNAPSHOT => self.default.as_ref(),
            INIT_SNAPSHOT => Some(&self.init),
            _ => self.snapshots.get(name),
        }
    }

    /// Names of snapshots saved by the caller, sorted.
    pub fn snapshot_names(&self) -> Vec<&str> {
        self.snapshots.keys().map(String::as_str).collect()
    }
}
