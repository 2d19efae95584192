//! JSON persistence for configuration trees.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{TreeError, TreeResult};
use crate::node::ConfigNode;
use crate::tree::ConfigTree;
use crate::DEFAULT_SEPARATOR;

impl ConfigTree {
    /// Load `subgroup` of a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>, subgroup: &str) -> TreeResult<ConfigTree> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| TreeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let root: BTreeMap<String, ConfigNode> =
            serde_json::from_str(&contents).map_err(|source| TreeError::Json {
                path: path.to_path_buf(),
                source,
            })?;

        let full = ConfigTree::from_root(root, DEFAULT_SEPARATOR);
        if subgroup.is_empty() {
            Ok(full)
        } else {
            Ok(full.copy(subgroup))
        }
    }

    /// Write `subgroup` of this tree to a JSON file.
    ///
    /// Unless `overwrite` is set, the existing file is loaded first and the
    /// subgroup merged into it, so unrelated keys already on disk survive. A
    /// missing file is written fresh.
    pub fn save(&self, path: impl AsRef<Path>, subgroup: &str, overwrite: bool) -> TreeResult<()> {
        let path = path.as_ref();

        let to_save = if overwrite {
            self.copy(subgroup)
        } else {
            match ConfigTree::from_file(path, "") {
                Ok(mut existing) => {
                    existing.transfer(self, subgroup);
                    existing
                }
                Err(e) if e.is_missing_file() => self.copy(subgroup),
                Err(e) => return Err(e),
            }
        };

        let mut text = to_save.to_string();
        text.push('\n');
        fs::write(path, text).map_err(|source| TreeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), subgroup, overwrite, "saved configuration");
        Ok(())
    }
}
