//! Parser for the shorthand bulk response of a settings dump (`SET?`).
//!
//! Instruments answer a dump with semicolon-separated tokens that abbreviate
//! repeated command groups:
//!
//! ```text
//! :TRIG:MODE AUTO;LEVEL 1.0;:ACQ:COUNT 4
//! ```
//!
//! A token starting with the separator carries a full path and makes its
//! parent the current group. A token without it is a leaf of the current
//! group. Values are kept as the text the instrument sent.

use tracing::warn;

use crate::error::{TreeError, TreeResult};
use crate::tree::{Command, ConfigTree};

/// Expand a bulk response into full commands.
///
/// Malformed tokens (no value, more than one value, or a path with no name
/// in it) are skipped with a warning. A short-form token before any full-path token is an error, since
/// its group cannot be known.
pub fn parse_bulk_response(response: &str, separator: char) -> TreeResult<Vec<Command>> {
    let mut commands = Vec::new();
    let mut group: Option<String> = None;

    for token in response.split(';') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }

        let mut words = token.split_whitespace();
        let Some(head) = words.next() else {
            continue;
        };
        let value = words.next();
        let extra = words.next().is_some();

        let path = if let Some(full) = head.strip_prefix(separator) {
            if full.split(separator).all(str::is_empty) {
                warn!(token, "dropping token without a path");
                continue;
            }
            let parent = match full.rfind(separator) {
                Some(idx) => &full[..idx],
                None => "",
            };
            group = Some(parent.to_string());
            format!("{}{}", separator, full)
        } else {
            let Some(current) = group.as_deref() else {
                return Err(TreeError::NoGroupContext {
                    token: token.to_string(),
                });
            };
            if current.is_empty() {
                format!("{}{}", separator, head)
            } else {
                format!("{}{}{}{}", separator, current, separator, head)
            }
        };

        match value {
            Some(_) if extra => {
                warn!(token, "dropping token with more than one value");
            }
            Some(value) => commands.push(Command::new(path, value)),
            None => {
                warn!(token, "dropping token without a value");
            }
        }
    }

    Ok(commands)
}

impl ConfigTree {
    /// Build a tree from a bulk response, keeping only `subgroup`.
    pub fn from_bulk_response(response: &str, subgroup: &str) -> TreeResult<ConfigTree> {
        let mut full = ConfigTree::new();
        full.set_list(parse_bulk_response(response, full.separator())?)?;
        if subgroup.is_empty() {
            Ok(full)
        } else {
            Ok(full.copy(subgroup))
        }
    }
}
