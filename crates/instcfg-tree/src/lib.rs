//! Configuration tree for instruments with a flat, colon-delimited command
//! namespace.
//!
//! Commands such as `TRIGGER:MODE` or `CH1:SCALE` are stored as a nested tree
//! so that whole groups can be read, written, merged and persisted at once.
//! A command that is both a value and the parent of other commands keeps its
//! value under the sibling token `&` (see [`SIBLING_TOKEN`]).

mod bulk;
mod error;
mod file;
mod node;
mod tree;
mod value;

pub use bulk::parse_bulk_response;
pub use error::{TreeError, TreeResult};
pub use node::ConfigNode;
pub use tree::{device_path, Command, ConfigTree};
pub use value::ScalarValue;

/// Default path separator used by SCPI-style instruments.
pub const DEFAULT_SEPARATOR: char = ':';

/// Reserved child name holding the value of a path that is also a directory.
pub const SIBLING_TOKEN: &str = "&";
