//! instcfg - Instrument configuration cache
//!
//! Keeps a hierarchical mirror of a lab instrument's settings so that
//! writes are only sent when a value changes and reads are answered from
//! memory. Adds scoped temporary overrides, named snapshots, JSON
//! persistence and per-instrument factory defaults on top.
//!
//! The tree itself lives in the `instcfg-tree` crate and is re-exported
//! here.

pub mod bank;
pub mod error;
pub mod mock;
pub mod settings;
pub mod synced;
pub mod transport;

pub use bank::{BankError, ModuleBank};
pub use error::{SyncError, SyncResult};
pub use instcfg_tree::{
    device_path, parse_bulk_response, Command, ConfigNode, ConfigTree, ScalarValue, TreeError,
    TreeResult, DEFAULT_SEPARATOR, SIBLING_TOKEN,
};
pub use settings::{SettingsError, SyncSettings};
pub use synced::{
    ConfigSource, ConfigTarget, DefaultsOutcome, DefaultsReport, HardwareState, SyncedConfig,
    TempConfig, DEFAULT_SNAPSHOT, INIT_SNAPSHOT, RESERVED_SNAPSHOTS,
};
pub use transport::{ChannelSelect, Transport, TransportError};
