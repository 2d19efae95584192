//! Factory defaults: locating, loading and generating the per-instrument file.

use std::fs;
use std::path::PathBuf;

use instcfg_tree::{device_path, ConfigTree, TreeError};
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};
use crate::transport::Transport;

use super::config::SyncedConfig;
use super::snapshot::DEFAULT_SNAPSHOT;

/// Identification fields naming the defaults file: maker, model, serial.
const IDENTITY_FIELDS: usize = 3;

/// Result of a completed default generation.
#[derive(Debug)]
pub struct DefaultsReport {
    /// File written
    pub path: PathBuf,
    /// Paths whose value was read and saved
    pub saved: Vec<String>,
    /// Paths that could not be read, with the reason
    pub skipped: Vec<(String, SyncError)>,
}

/// What [`SyncedConfig::generate_defaults`] did.
#[derive(Debug)]
pub enum DefaultsOutcome {
    Written(DefaultsReport),
    /// The file exists and overwriting was not requested; nothing was queried.
    AlreadyExists(PathBuf),
}

impl<T: Transport> SyncedConfig<T> {
    /// Defaults file for the connected instrument.
    ///
    /// The identification reply is split on commas and its first three
    /// fields, trimmed, are joined with `-`.
    pub fn default_filename(&self) -> SyncResult<PathBuf> {
        let identity = self.ask(&self.settings.identify_command, self.settings.query_timeout())?;
        let fields: Vec<&str> = identity
            .split(',')
            .map(str::trim)
            .take(IDENTITY_FIELDS)
            .collect();
        if fields.len() < IDENTITY_FIELDS || fields.iter().any(|f| f.is_empty()) {
            return Err(SyncError::Identity(identity));
        }
        Ok(self
            .settings
            .defaults_dir
            .join(format!("{}.json", fields.join("-"))))
    }

    pub(super) fn ensure_default_loaded(&mut self) -> SyncResult<()> {
        if self.default.is_none() {
            let path = self.default_filename()?;
            debug!(path = %path.display(), "loading factory defaults");
            self.default = Some(ConfigTree::from_file(&path, "")?);
        }
        Ok(())
    }

    /// Factory defaults, read from the defaults file on first use.
    pub fn default_config(&mut self) -> SyncResult<&ConfigTree> {
        self.ensure_default_loaded()?;
        self.default
            .as_ref()
            .ok_or_else(|| SyncError::UnknownSnapshot {
                name: DEFAULT_SNAPSHOT.to_string(),
            })
    }

    /// Everything the instrument reports in its settings dump.
    ///
    /// The dump can take a long time, so a short trial query goes first.
    /// Values are kept as text and `live` is not touched.
    pub fn full_hardware_config(&mut self, subgroup: &str) -> SyncResult<ConfigTree> {
        self.ensure_initialized()?;
        let dump_command = self.settings.dump_command.clone();
        let reply = self.ask_patiently(&dump_command, self.settings.dump_timeout())?;
        let tree = ConfigTree::from_bulk_response(&reply, subgroup)?;
        info!(command = %dump_command, parameters = tree.len(), "settings dump received");
        Ok(tree)
    }

    /// Build a defaults file from the instrument's current state.
    ///
    /// Every parameter in the settings dump is queried on its own, since the
    /// dump does not always use the values the instrument accepts back.
    /// Parameters that fail to answer are logged and skipped. `path` defaults
    /// to [`default_filename`](Self::default_filename); an existing file is
    /// left alone unless `overwrite` is set.
    pub fn generate_defaults(
        &mut self,
        path: Option<PathBuf>,
        overwrite: bool,
    ) -> SyncResult<DefaultsOutcome> {
        let is_default_file = path.is_none();
        let path = match path {
            Some(path) => path,
            None => self.default_filename()?,
        };
        if path.exists() && !overwrite {
            info!(path = %path.display(), "defaults file already exists, not overwriting");
            return Ok(DefaultsOutcome::AlreadyExists(path));
        }

        let dump = self.full_hardware_config("")?;
        let separator = dump.separator();
        let timeout = Some(self.settings.defaults_query_timeout());

        let mut built = ConfigTree::with_separator(separator);
        let mut saved = Vec::new();
        let mut skipped = Vec::new();
        for command in dump.get_list("") {
            let device_path = device_path(&command.path, separator).to_string();
            match self.ask(&format!("{}?", device_path), timeout) {
                Ok(reply) => {
                    let value = self.parse_reply(&reply);
                    debug!(path = %device_path, value = %value, "default read");
                    built.set(&device_path, value)?;
                    saved.push(device_path);
                }
                Err(e) => {
                    warn!(path = %device_path, error = %e, "no reply, skipping default");
                    skipped.push((device_path, e));
                }
            }
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| TreeError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        built.save(&path, "", true)?;
        info!(
            path = %path.display(),
            saved = saved.len(),
            skipped = skipped.len(),
            "defaults written"
        );

        if is_default_file {
            self.default = Some(built);
        }
        Ok(DefaultsOutcome::Written(DefaultsReport {
            path,
            saved,
            skipped,
        }))
    }
}
