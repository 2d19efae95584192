//! One-time handshake putting the instrument in a known reply mode.

use tracing::{debug, info};

use crate::error::SyncResult;
use crate::transport::Transport;

use super::config::SyncedConfig;

/// Whether the reply-mode handshake has been sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HardwareState {
    #[default]
    Uninitialized,
    Initialized,
}

impl HardwareState {
    pub fn is_initialized(self) -> bool {
        self == HardwareState::Initialized
    }
}

impl<T: Transport> SyncedConfig<T> {
    pub fn hardware_state(&self) -> HardwareState {
        self.hardware
    }

    /// Send the handshake writes unless already done.
    ///
    /// `VERBOSE ON` is sent when the instrument supports verbose mode and
    /// `HEADER OFF` when it can drop the header. Every operation that talks
    /// to the instrument calls this first. On failure the state stays
    /// uninitialized and the next operation retries.
    pub fn ensure_initialized(&mut self) -> SyncResult<()> {
        if self.hardware.is_initialized() {
            return Ok(());
        }

        if self.settings.verbose_is_optional {
            self.send("VERBOSE ON")?;
        }
        if self.settings.header_is_optional {
            self.send("HEADER OFF")?;
        }

        debug!(
            verbose = self.settings.verbose_is_optional,
            header_off = self.settings.header_is_optional,
            "instrument handshake complete"
        );
        self.hardware = HardwareState::Initialized;
        Ok(())
    }

    /// Treat the instrument as already initialized.
    ///
    /// Used when the handshake has been sent by someone else on the same
    /// connection, such as another module of a bank.
    pub fn assume_initialized(mut self) -> Self {
        if !self.hardware.is_initialized() {
            info!("skipping instrument handshake");
        }
        self.hardware = HardwareState::Initialized;
        self
    }
}
