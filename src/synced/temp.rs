//! Scoped temporary overrides.

use std::ops::{Deref, DerefMut};

use instcfg_tree::ScalarValue;
use tracing::{debug, warn};

use crate::error::{SyncError, SyncResult};
use crate::transport::Transport;

use super::config::SyncedConfig;

/// Guard holding a parameter at a temporary value.
///
/// The previous value is written back when the guard is restored or
/// dropped, including while unwinding. Dropping cannot report an error, so
/// a failed restore there is only logged; call [`restore`](Self::restore)
/// to see it.
pub struct TempConfig<'a, T: Transport> {
    config: &'a mut SyncedConfig<T>,
    path: String,
    previous: Option<ScalarValue>,
}

impl<T: Transport> TempConfig<'_, T> {
    /// Path held by this guard
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Write the previous value back now.
    pub fn restore(mut self) -> SyncResult<()> {
        self.restore_previous()
    }

    fn restore_previous(&mut self) -> SyncResult<()> {
        let Some(previous) = self.previous.take() else {
            return Ok(());
        };
        debug!(path = %self.path, value = %previous, "restoring temporary setting");
        self.config.set_config_param(&self.path, previous, false)?;
        Ok(())
    }
}

impl<T: Transport> Deref for TempConfig<'_, T> {
    type Target = SyncedConfig<T>;

    fn deref(&self) -> &Self::Target {
        self.config
    }
}

impl<T: Transport> DerefMut for TempConfig<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.config
    }
}

impl<T: Transport> Drop for TempConfig<'_, T> {
    fn drop(&mut self) {
        if let Err(e) = self.restore_previous() {
            warn!(path = %self.path, error = %e, "failed to restore temporary setting");
        }
    }
}

impl<T: Transport> SyncedConfig<T> {
    /// Set `path` to `temp_value` until the returned guard goes away.
    ///
    /// The current value is read first (from the instrument when `force`
    /// is set) and the temporary value is written with the same `force`.
    /// Restoring only writes if the value actually changed. If the temporary
    /// write fails, the cache still holds the previous value and no guard is
    /// returned.
    pub fn temp_config(
        &mut self,
        path: &str,
        temp_value: impl Into<ScalarValue>,
        force: bool,
    ) -> SyncResult<TempConfig<'_, T>> {
        let previous = self.get_config_param(path, force)?;
        self.set_config_param(path, temp_value, force)?;
        Ok(TempConfig {
            config: self,
            path: path.to_string(),
            previous: Some(previous),
        })
    }

    /// Run `f` with `path` temporarily set to `temp_value`.
    ///
    /// The previous value is restored whether `f` succeeds or not. An error
    /// from `f` takes precedence over one from restoring.
    pub fn with_temp_config<R, E, F>(
        &mut self,
        path: &str,
        temp_value: impl Into<ScalarValue>,
        force: bool,
        f: F,
    ) -> Result<R, E>
    where
        F: FnOnce(&mut Self) -> Result<R, E>,
        E: From<SyncError>,
    {
        let mut guard = self.temp_config(path, temp_value, force)?;
        let result = f(&mut *guard);
        let restored = guard.restore();
        let value = result?;
        restored?;
        Ok(value)
    }
}
