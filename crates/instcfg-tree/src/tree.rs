//! The configuration tree and its path-based API.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;
use tracing::debug;

use crate::error::{TreeError, TreeResult};
use crate::node::ConfigNode;
use crate::value::ScalarValue;
use crate::{DEFAULT_SEPARATOR, SIBLING_TOKEN};

/// A single instrument setting: a full command path and its value.
///
/// Paths produced by a tree always start with the separator
/// (e.g. `:TRIG:MODE`). Paths handed to a tree may omit it.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub path: String,
    pub value: ScalarValue,
}

impl Command {
    pub fn new(path: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        Self {
            path: path.into(),
            value: value.into(),
        }
    }

    /// The command path with a trailing sibling token removed.
    pub fn device_path(&self, separator: char) -> &str {
        device_path(&self.path, separator)
    }

    /// The string an instrument accepts for this setting, e.g. `:TRIG:MODE AUTO`.
    pub fn write_string(&self, separator: char) -> String {
        format!("{} {}", self.device_path(separator), self.value)
    }
}

/// `path` as the instrument knows it: a trailing `<separator>&` is removed.
///
/// `TRIG:&` becomes `TRIG`; any other path is returned unchanged.
pub fn device_path(path: &str, separator: char) -> &str {
    path.strip_suffix(SIBLING_TOKEN)
        .and_then(|p| p.strip_suffix(separator))
        .unwrap_or(path)
}

/// Hierarchical view of a flat command namespace.
///
/// All mutation goes through [`set`](Self::set), which keeps the sibling-token
/// invariant: a path is either a value or a directory, and a directory that
/// also carries a value stores it under `&`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigTree {
    root: BTreeMap<String, ConfigNode>,
    separator: char,
}

impl Default for ConfigTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigTree {
    /// Empty tree using `:` as separator.
    pub fn new() -> Self {
        Self::with_separator(DEFAULT_SEPARATOR)
    }

    pub fn with_separator(separator: char) -> Self {
        Self {
            root: BTreeMap::new(),
            separator,
        }
    }

    /// Build a tree from a nested JSON object literal.
    pub fn from_json(value: Value) -> Result<Self, serde_json::Error> {
        let root = serde_json::from_value(value)?;
        Ok(Self {
            root,
            separator: DEFAULT_SEPARATOR,
        })
    }

    pub fn to_json(&self) -> Value {
        // A map of untagged nodes always serializes
        serde_json::to_value(&self.root).unwrap_or(Value::Null)
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    pub(crate) fn root(&self) -> &BTreeMap<String, ConfigNode> {
        &self.root
    }

    pub(crate) fn from_root(root: BTreeMap<String, ConfigNode>, separator: char) -> Self {
        Self { root, separator }
    }

    fn segments<'p>(&self, path: &'p str) -> Vec<&'p str> {
        path.split(self.separator).filter(|s| !s.is_empty()).collect()
    }

    fn join(&self, segments: &[&str]) -> String {
        let mut path = String::new();
        for segment in segments {
            path.push(self.separator);
            path.push_str(segment);
        }
        path
    }

    fn lookup(&self, segments: &[&str]) -> Option<&ConfigNode> {
        let (first, rest) = segments.split_first()?;
        let mut node = self.root.get(*first)?;
        for segment in rest {
            match node {
                ConfigNode::Directory(children) => node = children.get(*segment)?,
                ConfigNode::Scalar(_) => return None,
            }
        }
        Some(node)
    }

    /// The node at `path`, value or directory.
    pub fn node(&self, path: &str) -> TreeResult<&ConfigNode> {
        self.lookup(&self.segments(path))
            .ok_or_else(|| TreeError::NotFound {
                path: path.to_string(),
            })
    }

    pub fn contains(&self, path: &str) -> bool {
        self.lookup(&self.segments(path)).is_some()
    }

    /// Value stored at `path`.
    ///
    /// A directory answers with its sibling-token value, mirroring how
    /// [`set`](Self::set) redirects writes on a directory.
    pub fn get(&self, path: &str) -> TreeResult<&ScalarValue> {
        let segments = self.segments(path);
        if segments.is_empty() {
            return Err(TreeError::NotScalar {
                path: path.to_string(),
            });
        }
        let node = self.lookup(&segments).ok_or_else(|| TreeError::NotFound {
            path: path.to_string(),
        })?;
        node.own_value().ok_or_else(|| TreeError::NotScalar {
            path: path.to_string(),
        })
    }

    /// Same as [`get`](Self::get) but returns a [`Command`].
    pub fn get_command(&self, path: &str) -> TreeResult<Command> {
        let value = self.get(path)?.clone();
        let segments = self.segments(path);
        Ok(Command {
            path: self.join(&segments),
            value,
        })
    }

    /// Conflict-aware write.
    ///
    /// Writing onto a directory stores the value at `path:&`. Writing below a
    /// value turns that value into a directory `{"&": old}` first.
    pub fn set(&mut self, path: &str, value: impl Into<ScalarValue>) -> TreeResult<()> {
        let segments = self.segments(path);
        let (leaf, dirs) = segments.split_last().ok_or(TreeError::EmptyPath)?;
        self.insert_leaf(dirs, leaf, value.into());
        Ok(())
    }

    fn insert_leaf(&mut self, dirs: &[&str], leaf: &str, value: ScalarValue) {
        let mut dir = &mut self.root;
        for segment in dirs {
            let child = dir
                .entry(segment.to_string())
                .or_insert_with(|| ConfigNode::Directory(BTreeMap::new()));
            dir = promote(child);
        }

        match dir.get_mut(leaf) {
            Some(ConfigNode::Directory(children)) => {
                children.insert(SIBLING_TOKEN.to_string(), ConfigNode::Scalar(value));
            }
            _ => {
                dir.insert(leaf.to_string(), ConfigNode::Scalar(value));
            }
        }
    }

    /// Walk every leaf under `subgroup`; the whole tree when it is empty.
    fn for_each_leaf<'a, F>(&'a self, subgroup: &'a str, mut f: F)
    where
        F: FnMut(&[&'a str], &'a ScalarValue),
    {
        let mut prefix = self.segments(subgroup);
        if prefix.is_empty() {
            for (name, child) in &self.root {
                prefix.push(name.as_str());
                child.visit_leaves(&mut prefix, &mut f);
                prefix.pop();
            }
        } else if let Some(node) = self.lookup(&prefix) {
            node.visit_leaves(&mut prefix, &mut f);
        }
    }

    /// Flatten the leaves under `subgroup` into commands, depth first.
    ///
    /// `subgroup` may name a directory, a single value (one command is
    /// returned), or nothing present (no commands). Sibling tokens are kept
    /// in the paths.
    pub fn get_list(&self, subgroup: &str) -> Vec<Command> {
        let mut commands = Vec::new();
        self.for_each_leaf(subgroup, |segments, value| {
            commands.push(Command {
                path: self.join(segments),
                value: value.clone(),
            });
        });
        commands
    }

    /// Like [`get_list`](Self::get_list), formatted as strings an instrument
    /// accepts, with trailing sibling tokens stripped.
    pub fn get_write_list(&self, subgroup: &str) -> Vec<String> {
        self.get_list(subgroup)
            .iter()
            .map(|cmd| cmd.write_string(self.separator))
            .collect()
    }

    /// Apply commands in order; later commands overwrite earlier ones.
    pub fn set_list<I>(&mut self, commands: I) -> TreeResult<()>
    where
        I: IntoIterator<Item = Command>,
    {
        for cmd in commands {
            self.set(&cmd.path, cmd.value)?;
        }
        Ok(())
    }

    /// Merge the `subgroup` of `source` into this tree.
    ///
    /// Only adds or overwrites paths under `subgroup`; nothing is removed.
    pub fn transfer(&mut self, source: &ConfigTree, subgroup: &str) {
        let mut count = 0;
        source.for_each_leaf(subgroup, |segments, value| {
            if let Some((leaf, dirs)) = segments.split_last() {
                self.insert_leaf(dirs, leaf, value.clone());
                count += 1;
            }
        });
        debug!(subgroup, count, "transferring configuration");
    }

    /// A new tree holding only `subgroup` of this one.
    pub fn copy(&self, subgroup: &str) -> ConfigTree {
        let mut ret = ConfigTree::with_separator(self.separator);
        ret.transfer(self, subgroup);
        ret
    }

    /// Number of leaves in the whole tree.
    pub fn len(&self) -> usize {
        let mut count = 0;
        self.for_each_leaf("", |_, _| count += 1);
        count
    }
}

/// Make `node` a directory, keeping an existing value under the sibling token.
fn promote(node: &mut ConfigNode) -> &mut BTreeMap<String, ConfigNode> {
    if let ConfigNode::Scalar(old) = node {
        debug!(value = %old, "moving value under sibling token");
        let mut children = BTreeMap::new();
        children.insert(SIBLING_TOKEN.to_string(), ConfigNode::Scalar(old.clone()));
        *node = ConfigNode::Directory(children);
    }
    match node {
        ConfigNode::Directory(children) => children,
        ConfigNode::Scalar(_) => unreachable!("scalar was promoted above"),
    }
}

impl fmt::Display for ConfigTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = serde_json::to_string_pretty(&self.root).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}
