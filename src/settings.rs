//! Synchronization settings
//!
//! Per-instrument knobs for how commands are formatted, which handshake
//! writes are sent, and which timeouts are forwarded to the transport.
//! Loaded from a TOML file; every key is optional.
//!
//! ```toml
//! header_is_optional = false
//! preceding_colon = false
//! defaults_dir = "/var/lib/lab/savedConfigDefaults"
//! dump_timeout_ms = 60000
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings for a [`SyncedConfig`](crate::SyncedConfig).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncSettings {
    /// Instrument can drop the echoed header; the handshake sends `HEADER OFF`.
    /// When false, replies carry a header that is stripped on read.
    pub header_is_optional: bool,

    /// Instrument supports verbose mode; the handshake sends `VERBOSE ON`.
    pub verbose_is_optional: bool,

    /// Keep the leading separator on written commands.
    pub preceding_colon: bool,

    /// Keep the space between a written command and its value.
    pub intervening_space: bool,

    /// Directory holding one factory-default file per instrument identity.
    pub defaults_dir: PathBuf,

    /// Identification query, also used as the short trial round-trip.
    pub identify_command: String,

    /// Query returning the full settings dump in shorthand form.
    pub dump_command: String,

    /// Timeout forwarded with single-parameter queries (transport default if unset).
    pub query_timeout_ms: Option<u64>,

    /// Timeout for the settings dump.
    pub dump_timeout_ms: u64,

    /// Timeout for the trial round-trip made before any longer query.
    pub trial_timeout_ms: u64,

    /// Timeout for each per-parameter query while generating defaults.
    pub defaults_query_timeout_ms: u64,

    /// Command prefix selecting a channel on multi-module instruments.
    pub channel_select_prefix: String,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            header_is_optional: true,
            verbose_is_optional: false,
            preceding_colon: true,
            intervening_space: true,
            defaults_dir: PathBuf::from("savedConfigDefaults"),
            identify_command: "*IDN?".to_string(),
            dump_command: "SET?".to_string(),
            query_timeout_ms: None,
            dump_timeout_ms: 30_000,
            trial_timeout_ms: 2_000,
            defaults_query_timeout_ms: 1_000,
            channel_select_prefix: "CH".to_string(),
        }
    }
}

impl SyncSettings {
    /// Load and validate settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path).map_err(|e| SettingsError::IoError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::parse(&contents)
    }

    /// Parse and validate settings from TOML content.
    pub fn parse(content: &str) -> Result<Self, SettingsError> {
        let settings: SyncSettings =
            toml::from_str(content).map_err(|e| SettingsError::ParseError(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check timeouts and command strings.
    pub fn validate(&self) -> Result<(), SettingsError> {
        for (field, value) in [
            ("dump_timeout_ms", self.dump_timeout_ms),
            ("trial_timeout_ms", self.trial_timeout_ms),
            ("defaults_query_timeout_ms", self.defaults_query_timeout_ms),
        ] {
            if value == 0 {
                return Err(SettingsError::ZeroTimeout { field });
            }
        }
        if self.query_timeout_ms == Some(0) {
            return Err(SettingsError::ZeroTimeout {
                field: "query_timeout_ms",
            });
        }

        // The trial round-trip must be shorter than the query it guards
        if self.trial_timeout_ms > self.dump_timeout_ms {
            return Err(SettingsError::TrialExceedsDump {
                trial: self.trial_timeout_ms,
                dump: self.dump_timeout_ms,
            });
        }

        for (field, value) in [
            ("identify_command", &self.identify_command),
            ("dump_command", &self.dump_command),
            ("channel_select_prefix", &self.channel_select_prefix),
        ] {
            if value.trim().is_empty() {
                return Err(SettingsError::EmptyCommand { field });
            }
        }

        Ok(())
    }

    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout_ms.map(Duration::from_millis)
    }

    pub fn dump_timeout(&self) -> Duration {
        Duration::from_millis(self.dump_timeout_ms)
    }

    pub fn trial_timeout(&self) -> Duration {
        Duration::from_millis(self.trial_timeout_ms)
    }

    pub fn defaults_query_timeout(&self) -> Duration {
        Duration::from_millis(self.defaults_query_timeout_ms)
    }

    /// Settings for an instrument whose replies always carry a header.
    pub fn with_mandatory_header(mut self) -> Self {
        self.header_is_optional = false;
        self
    }

    pub fn with_defaults_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.defaults_dir = dir.into();
        self
    }
}

/// Settings errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error reading {}: {message}", path.display())]
    IoError { path: PathBuf, message: String },

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("{field} must be greater than zero")]
    ZeroTimeout { field: &'static str },

    #[error("trial_timeout_ms ({trial}) must not exceed dump_timeout_ms ({dump})")]
    TrialExceedsDump { trial: u64, dump: u64 },

    #[error("{field} must not be empty")]
    EmptyCommand { field: &'static str },
}
