//! Cached instrument configuration
//!
//! [`SyncedConfig`] keeps a `live` tree that mirrors the instrument and only
//! talks to the hardware when the cache cannot answer or a value changes:
//!
//! - `set_config_param` writes a single command, and only if it differs
//!   from the cached value
//! - `get_config_param` queries only on a cache miss or when forced
//! - `temp_config` applies a scoped override that is always undone
//! - `save_config` / `load_config` move sub-trees between `live`, other
//!   trees, named snapshots and files; a load re-sends the whole sub-group
//! - `generate_defaults` dumps every setting into a per-instrument file

mod config;
mod defaults;
mod handshake;
mod snapshot;
mod temp;

pub use config::SyncedConfig;
pub use defaults::{DefaultsOutcome, DefaultsReport};
pub use handshake::HardwareState;
pub use snapshot::{
    is_reserved, ConfigSource, ConfigTarget, DEFAULT_SNAPSHOT, INIT_SNAPSHOT, RESERVED_SNAPSHOTS,
};
pub use temp::TempConfig;
