//! Tree nodes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::value::ScalarValue;
use crate::SIBLING_TOKEN;

/// A node is either a leaf value or a directory owning its children.
///
/// Children are kept in a `BTreeMap` so flattening and serialization are
/// deterministic (sorted by segment name).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigNode {
    Scalar(ScalarValue),
    Directory(BTreeMap<String, ConfigNode>),
}

impl ConfigNode {
    pub fn is_directory(&self) -> bool {
        matches!(self, ConfigNode::Directory(_))
    }

    pub fn as_scalar(&self) -> Option<&ScalarValue> {
        match self {
            ConfigNode::Scalar(v) => Some(v),
            ConfigNode::Directory(_) => None,
        }
    }

    /// The value a node stands for when read as a single command: the scalar
    /// itself, or the sibling-token child of a directory.
    pub fn own_value(&self) -> Option<&ScalarValue> {
        match self {
            ConfigNode::Scalar(v) => Some(v),
            ConfigNode::Directory(children) => {
                children.get(SIBLING_TOKEN).and_then(ConfigNode::as_scalar)
            }
        }
    }

    /// Depth-first walk over every leaf below this node.
    ///
    /// `prefix` holds the segments leading to this node; the callback receives
    /// the full segment list of each leaf.
    pub(crate) fn visit_leaves<'a, F>(&'a self, prefix: &mut Vec<&'a str>, f: &mut F)
    where
        F: FnMut(&[&'a str], &'a ScalarValue),
    {
        match self {
            ConfigNode::Scalar(v) => f(prefix, v),
            ConfigNode::Directory(children) => {
                for (name, child) in children {
                    prefix.push(name.as_str());
                    child.visit_leaves(prefix, f);
                    prefix.pop();
                }
            }
        }
    }
}
