//! Multi-module instruments
//!
//! Some instruments host several independent modules behind one connection,
//! addressed by a channel-select command. A [`ModuleBank`] keeps one
//! [`SyncedConfig`] per channel so that every channel gets change detection
//! of its own, and exposes per-channel values as arrays or maps.

use std::collections::BTreeMap;

use instcfg_tree::ScalarValue;
use tracing::debug;

use crate::error::SyncError;
use crate::settings::SyncSettings;
use crate::synced::SyncedConfig;
use crate::transport::{ChannelSelect, Transport};

/// Parameter answering with a module's identification string.
const MODULE_ID_PATH: &str = "*IDN";

/// Bank errors
#[derive(Debug, thiserror::Error)]
pub enum BankError {
    #[error("Wrong number of values: expected {expected}, got {got}")]
    ChannelCount { expected: usize, got: usize },

    #[error("Channel {channel} is not in use; available {available:?}")]
    UnknownChannel { channel: u32, available: Vec<u32> },

    #[error("Channel {channel} exceeds the {max} channels of this instrument")]
    ChannelOutOfRange { channel: u32, max: u32 },

    #[error(transparent)]
    Sync(#[from] SyncError),
}

/// One cache per channel, sharing a connection.
pub struct ModuleBank<T: Transport + Clone> {
    /// Unselected connection, used for the handshake
    control: SyncedConfig<T>,
    channels: Vec<u32>,
    modules: Vec<SyncedConfig<ChannelSelect<T>>>,
}

impl<T: Transport + Clone> ModuleBank<T> {
    /// Block out `channels` of an instrument with `max_channel` channels
    /// (numbered from zero), or an unknown number when `None`.
    pub fn new(
        transport: T,
        channels: Vec<u32>,
        settings: SyncSettings,
        max_channel: Option<u32>,
    ) -> Result<Self, BankError> {
        if let Some(max) = max_channel {
            if let Some(&channel) = channels.iter().find(|&&ch| ch >= max) {
                return Err(BankError::ChannelOutOfRange { channel, max });
            }
        }

        let prefix = settings.channel_select_prefix.clone();
        // The handshake is sent once on the shared connection
        let modules = channels
            .iter()
            .map(|&ch| {
                let selected = ChannelSelect::new(transport.clone(), prefix.clone(), ch);
                SyncedConfig::with_settings(selected, settings.clone()).assume_initialized()
            })
            .collect();
        debug!(?channels, "module bank created");

        Ok(Self {
            control: SyncedConfig::with_settings(transport, settings),
            channels,
            modules,
        })
    }

    /// Channels in use, in bank order
    pub fn channels(&self) -> &[u32] {
        &self.channels
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// The cache of one channel
    pub fn module(&self, channel: u32) -> Result<&SyncedConfig<ChannelSelect<T>>, BankError> {
        let index = self.index_of(channel)?;
        Ok(&self.modules[index])
    }

    pub fn module_mut(
        &mut self,
        channel: u32,
    ) -> Result<&mut SyncedConfig<ChannelSelect<T>>, BankError> {
        let index = self.index_of(channel)?;
        self.control.ensure_initialized()?;
        Ok(&mut self.modules[index])
    }

    fn index_of(&self, channel: u32) -> Result<usize, BankError> {
        self.channels
            .iter()
            .position(|&ch| ch == channel)
            .ok_or_else(|| BankError::UnknownChannel {
                channel,
                available: self.channels.clone(),
            })
    }

    /// `path` of every channel, in bank order.
    pub fn get_config_array(&mut self, path: &str) -> Result<Vec<ScalarValue>, BankError> {
        self.control.ensure_initialized()?;
        let mut values = Vec::with_capacity(self.modules.len());
        for module in &mut self.modules {
            values.push(module.get_config_param(path, false)?);
        }
        Ok(values)
    }

    /// Set `path` on every channel, one value per channel in bank order.
    ///
    /// Returns whether any channel was written.
    pub fn set_config_array<I, V>(
        &mut self,
        path: &str,
        values: I,
        force_write: bool,
    ) -> Result<bool, BankError>
    where
        I: IntoIterator<Item = V>,
        V: Into<ScalarValue>,
    {
        let values: Vec<ScalarValue> = values.into_iter().map(Into::into).collect();
        if values.len() != self.modules.len() {
            return Err(BankError::ChannelCount {
                expected: self.modules.len(),
                got: values.len(),
            });
        }

        self.control.ensure_initialized()?;
        let mut wrote = false;
        for (module, value) in self.modules.iter_mut().zip(values) {
            wrote |= module.set_config_param(path, value, force_write)?;
        }
        Ok(wrote)
    }

    /// `path` of every channel, keyed by channel.
    pub fn get_config_map(&mut self, path: &str) -> Result<BTreeMap<u32, ScalarValue>, BankError> {
        let values = self.get_config_array(path)?;
        Ok(self.channels.iter().copied().zip(values).collect())
    }

    /// Set `path` on the listed channels only.
    ///
    /// Every channel is checked before anything is written. Returns whether
    /// any channel was written.
    pub fn set_config_map<V>(
        &mut self,
        path: &str,
        values: BTreeMap<u32, V>,
        force_write: bool,
    ) -> Result<bool, BankError>
    where
        V: Into<ScalarValue>,
    {
        let mut updates = Vec::with_capacity(values.len());
        for (channel, value) in values {
            updates.push((self.index_of(channel)?, value));
        }

        self.control.ensure_initialized()?;
        let mut wrote = false;
        for (index, value) in updates {
            wrote |= self.modules[index].set_config_param(path, value, force_write)?;
        }
        Ok(wrote)
    }

    /// Identification string of every module, in bank order.
    pub fn module_ids(&mut self) -> Result<Vec<String>, BankError> {
        Ok(self
            .get_config_array(MODULE_ID_PATH)?
            .iter()
            .map(ToString::to_string)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockInstrument;

    fn bank(channels: Vec<u32>) -> (ModuleBank<MockInstrument>, MockInstrument) {
        let instrument = MockInstrument::with_channels("CH");
        let bank = ModuleBank::new(instrument.clone(), channels, SyncSettings::default(), Some(8))
            .unwrap();
        (bank, instrument)
    }

    // =========================================================================
    // Construction
    // =========================================================================

    #[test]
    fn test_channel_out_of_range() {
        let result = ModuleBank::new(
            MockInstrument::with_channels("CH"),
            vec![0, 8],
            SyncSettings::default(),
            Some(8),
        );
        assert!(matches!(
            result,
            Err(BankError::ChannelOutOfRange { channel: 8, max: 8 })
        ));
    }

    #[test]
    fn test_unknown_channel() {
        let (bank, _instrument) = bank(vec![1, 3]);
        assert_eq!(bank.channels(), &[1, 3]);
        let Err(err) = bank.module(2) else {
            panic!("channel 2 is not in use");
        };
        assert_eq!(err.to_string(), "Channel 2 is not in use; available [1, 3]");
    }

    // =========================================================================
    // Arrays
    // =========================================================================

    #[test]
    fn test_set_array_writes_each_channel() {
        let (mut bank, instrument) = bank(vec![1, 2]);

        assert!(bank.set_config_array("VOLT", [1.5, 3.0], false).unwrap());
        assert_eq!(
            instrument.writes(),
            vec!["HEADER OFF", "CH 1", ":VOLT 1.5", "CH 2", ":VOLT 3.0"]
        );
        assert_eq!(
            instrument.channel_registers(2).get("VOLT").unwrap(),
            &ScalarValue::from("3.0")
        );
    }

    #[test]
    fn test_set_array_change_detection_per_channel() {
        let (mut bank, instrument) = bank(vec![1, 2]);
        bank.set_config_array("VOLT", [1.5, 3.0], false).unwrap();
        instrument.clear_log();

        assert!(bank.set_config_array("VOLT", [1.5, 2.0], false).unwrap());
        assert_eq!(instrument.writes(), vec!["CH 2", ":VOLT 2.0"]);

        instrument.clear_log();
        assert!(!bank.set_config_array("VOLT", [1.5, 2.0], false).unwrap());
        assert!(instrument.writes().is_empty());
    }

    #[test]
    fn test_set_array_wrong_length() {
        let (mut bank, instrument) = bank(vec![1, 2, 3]);
        let err = bank.set_config_array("VOLT", [1.0, 2.0], false).unwrap_err();
        assert!(matches!(err, BankError::ChannelCount { expected: 3, got: 2 }));
        assert!(instrument.writes().is_empty());
    }

    #[test]
    fn test_get_array_reads_each_channel() {
        let (mut bank, instrument) = bank(vec![0, 1]);
        instrument.set_channel_register(0, "CURR", "0.01");
        instrument.set_channel_register(1, "CURR", "0.02");

        assert_eq!(
            bank.get_config_array("CURR").unwrap(),
            vec![ScalarValue::Float(0.01), ScalarValue::Float(0.02)]
        );
    }

    // =========================================================================
    // Maps
    // =========================================================================

    #[test]
    fn test_map_round_trip() {
        let (mut bank, instrument) = bank(vec![2, 5]);
        instrument.set_channel_register(2, "MODE", "CC");
        instrument.set_channel_register(5, "MODE", "CV");

        let map = bank.get_config_map("MODE").unwrap();
        assert_eq!(map.get(&5), Some(&ScalarValue::from("CV")));

        instrument.clear_log();
        let wrote = bank
            .set_config_map("MODE", BTreeMap::from([(5, "CC")]), false)
            .unwrap();
        assert!(wrote);
        assert_eq!(instrument.writes(), vec!["CH 5", ":MODE CC"]);
    }

    #[test]
    fn test_set_map_unknown_channel_writes_nothing() {
        let (mut bank, instrument) = bank(vec![2, 5]);
        let err = bank
            .set_config_map("MODE", BTreeMap::from([(2, "CC"), (4, "CV")]), false)
            .unwrap_err();
        assert!(matches!(err, BankError::UnknownChannel { channel: 4, .. }));
        assert!(instrument.writes().is_empty());
    }

    #[test]
    fn test_module_ids() {
        let (mut bank, _instrument) = bank(vec![0, 1]);
        let ids = bank.module_ids().unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.iter().all(|id| id == crate::mock::DEFAULT_IDENTITY));
    }
}
