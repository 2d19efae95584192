//! The cache itself: single-parameter reads and writes.

use std::collections::BTreeMap;
use std::time::Duration;

use instcfg_tree::{device_path, ConfigTree, ScalarValue, TreeError};
use tracing::debug;

use crate::error::{SyncError, SyncResult};
use crate::settings::SyncSettings;
use crate::transport::Transport;

use super::handshake::HardwareState;

/// Configuration cache kept consistent with one instrument.
///
/// `live` is assumed to equal the instrument state. A set reaches the cache
/// only after its write succeeded, so the two diverge only when someone
/// changes the instrument by hand, which is not detected.
pub struct SyncedConfig<T> {
    pub(super) transport: T,
    pub(super) settings: SyncSettings,
    pub(super) live: ConfigTree,
    /// Factory defaults, read from disk on first use
    pub(super) default: Option<ConfigTree>,
    /// First value read from the instrument for each path
    pub(super) init: ConfigTree,
    pub(super) snapshots: BTreeMap<String, ConfigTree>,
    pub(super) hardware: HardwareState,
}

impl<T: Transport> SyncedConfig<T> {
    /// Create a cache with default settings
    pub fn new(transport: T) -> Self {
        Self::with_settings(transport, SyncSettings::default())
    }

    /// Create a cache with custom settings
    pub fn with_settings(transport: T, settings: SyncSettings) -> Self {
        Self {
            transport,
            settings,
            live: ConfigTree::new(),
            default: None,
            init: ConfigTree::new(),
            snapshots: BTreeMap::new(),
            hardware: HardwareState::Uninitialized,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// The cached instrument state
    pub fn live(&self) -> &ConfigTree {
        &self.live
    }

    fn separator(&self) -> char {
        self.live.separator()
    }

    /// Set one parameter, writing it to the instrument only if it changed.
    ///
    /// Values are compared by their string form, so `5` and `5.0` differ but
    /// `"5"` and `5` do not. An uncached path always counts as changed.
    /// `force_write` sends the command regardless. Returns whether a write
    /// was sent. If the write fails the cache keeps its previous value.
    pub fn set_config_param(
        &mut self,
        path: &str,
        value: impl Into<ScalarValue>,
        force_write: bool,
    ) -> SyncResult<bool> {
        let value = value.into();
        let changed = self
            .live
            .get(path)
            .map_or(true, |prev| prev.to_string() != value.to_string());
        if !changed && !force_write {
            debug!(path, "value unchanged, not writing");
            return Ok(false);
        }

        self.set_hardware_param(path, value)?;
        Ok(true)
    }

    /// Read one parameter, from the cache unless it is missing or
    /// `force_read` is set.
    pub fn get_config_param(&mut self, path: &str, force_read: bool) -> SyncResult<ScalarValue> {
        if !force_read {
            if let Ok(value) = self.live.get(path) {
                return Ok(value.clone());
            }
        }
        self.get_hardware_param(path)
    }

    /// Write `value` to `path` as a single command, then cache it.
    fn set_hardware_param(&mut self, path: &str, value: ScalarValue) -> SyncResult<()> {
        let mut staged = ConfigTree::with_separator(self.separator());
        staged.set(path, value.clone())?;
        let command = staged.get_command(path)?;

        self.ensure_initialized()?;
        let line = self.format_write(&command.write_string(self.separator()));
        self.send(&line)?;
        self.live.set(path, value)?;
        Ok(())
    }

    /// Query `path` and store the reply in `live`.
    fn get_hardware_param(&mut self, path: &str) -> SyncResult<ScalarValue> {
        let device_path = device_path(path, self.separator());
        if device_path.trim_matches(self.separator()).is_empty() {
            return Err(TreeError::EmptyPath.into());
        }

        self.ensure_initialized()?;
        let reply = self.ask(&format!("{}?", device_path), self.settings.query_timeout())?;
        let value = self.parse_reply(&reply);

        self.live.set(path, value.clone())?;
        if self.init.get(path).is_err() {
            self.init.set(path, value.clone())?;
        }
        Ok(value)
    }

    /// Send every cached command under `subgroup`, changed or not.
    pub(super) fn set_hardware_config(&mut self, subgroup: &str) -> SyncResult<usize> {
        self.ensure_initialized()?;
        let lines = self.live.get_write_list(subgroup);
        for line in &lines {
            let line = self.format_write(line);
            self.send(&line)?;
        }
        Ok(lines.len())
    }

    /// Apply the colon and spacing conventions of this instrument.
    fn format_write(&self, line: &str) -> String {
        let mut line = line;
        if !self.settings.preceding_colon {
            line = line.strip_prefix(self.separator()).unwrap_or(line);
        }
        if self.settings.intervening_space {
            line.to_string()
        } else {
            line.replace(' ', "")
        }
    }

    /// Turn a single-parameter reply into a value.
    ///
    /// With a mandatory header only the last word is the value.
    pub(super) fn parse_reply(&self, reply: &str) -> ScalarValue {
        let text = if self.settings.header_is_optional {
            reply
        } else {
            reply.split_whitespace().last().unwrap_or(reply)
        };
        ScalarValue::coerce(text)
    }

    pub(super) fn send(&self, command: &str) -> SyncResult<()> {
        debug!(command, "writing to instrument");
        self.transport
            .write(command)
            .map_err(|e| SyncError::transport(command, e))
    }

    pub(super) fn ask(&self, command: &str, timeout: Option<Duration>) -> SyncResult<String> {
        debug!(command, ?timeout, "querying instrument");
        let reply = self
            .transport
            .query(command, timeout)
            .map_err(|e| SyncError::transport(command, e))?;
        debug!(command, reply = %reply.trim_end(), "instrument replied");
        Ok(reply.trim_end().to_string())
    }

    /// Query with a long timeout, after a short trial round-trip.
    ///
    /// If the trial fails its error is returned and the long query is never
    /// sent, so an unresponsive instrument fails fast.
    pub(super) fn ask_patiently(&self, command: &str, timeout: Duration) -> SyncResult<String> {
        let trial = self.settings.trial_timeout();
        if timeout > trial {
            debug!(command, "trial round-trip before long query");
            self.ask(&self.settings.identify_command, Some(trial))?;
        }
        self.ask(command, Some(timeout))
    }
}
