//! Mock Instrument
//!
//! Cloneable handle to a simulated instrument; clones share state so a test
//! can keep one handle while a [`SyncedConfig`](crate::SyncedConfig) owns
//! another.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use instcfg_tree::{ConfigTree, ScalarValue};

use crate::transport::{Transport, TransportError};

use super::failure::{FailureConfig, FailureInjector};
use super::state::{InstrumentState, QueryRecord};

/// Timeout reported when a query is sent without one
const DEFAULT_TIMEOUT_MS: u64 = 2_000;

/// Configurable mock instrument for testing
#[derive(Debug, Clone, Default)]
pub struct MockInstrument {
    /// Mutable state (wrapped for interior mutability)
    state: Arc<Mutex<InstrumentState>>,
    /// Failure injector
    failures: Arc<Mutex<FailureInjector>>,
}

impl MockInstrument {
    /// Create a new mock instrument with no settings and header echo on
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock instrument reporting the given identification string
    pub fn with_identity(identity: &str) -> Self {
        let instrument = Self::new();
        instrument.state.lock().unwrap().identity = identity.to_string();
        instrument
    }

    /// Create a multi-module mock selecting channels with `<prefix> <n>`
    pub fn with_channels(prefix: &str) -> Self {
        let instrument = Self::new();
        instrument.state.lock().unwrap().channel_prefix = Some(prefix.to_string());
        instrument
    }

    // === Public API for test configuration ===

    /// Change a setting behind the cache's back (front-panel change)
    pub fn set_register(&self, path: &str, value: impl Into<ScalarValue>) {
        let mut state = self.state.lock().unwrap();
        let _ = state.active_registers().set(path, value);
    }

    /// Set a register on a specific channel of a multi-module mock
    pub fn set_channel_register(&self, channel: u32, path: &str, value: impl Into<ScalarValue>) {
        let mut state = self.state.lock().unwrap();
        let _ = state.channel_registers.entry(channel).or_default().set(path, value);
    }

    /// Load settings from a shorthand dump
    pub fn load_dump(&self, response: &str) -> bool {
        self.state.lock().unwrap().load_dump(response)
    }

    /// Snapshot of the single-channel registers
    pub fn registers(&self) -> ConfigTree {
        self.state.lock().unwrap().registers.clone()
    }

    /// Snapshot of one channel's registers
    pub fn channel_registers(&self, channel: u32) -> ConfigTree {
        let state = self.state.lock().unwrap();
        state.channel_registers.get(&channel).cloned().unwrap_or_default()
    }

    /// Whether replies currently echo the header
    pub fn header_enabled(&self) -> bool {
        self.state.lock().unwrap().header
    }

    /// Whether verbose mode is on
    pub fn verbose_enabled(&self) -> bool {
        self.state.lock().unwrap().verbose
    }

    /// Inject a failure for a command (write or query)
    pub fn inject_failure(&self, command: &str, config: FailureConfig) {
        self.failures.lock().unwrap().inject(command, config);
    }

    /// Clear all failure injections
    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    /// Every write received so far
    pub fn writes(&self) -> Vec<String> {
        self.state.lock().unwrap().writes.clone()
    }

    /// Every query command received so far
    pub fn queries(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.queries.iter().map(|q| q.command.clone()).collect()
    }

    /// Every query received so far, with timeouts
    pub fn query_records(&self) -> Vec<QueryRecord> {
        self.state.lock().unwrap().queries.clone()
    }

    /// Forget the traffic log
    pub fn clear_log(&self) {
        let mut state = self.state.lock().unwrap();
        state.writes.clear();
        state.queries.clear();
    }

    fn check_failure(&self, command: &str, timeout: Option<Duration>) -> Result<(), TransportError> {
        let mut failures = self.failures.lock().unwrap();
        match failures.check(command) {
            Some(failure) => Err(failure.to_error(timeout_ms(timeout))),
            None => Ok(()),
        }
    }
}

fn timeout_ms(timeout: Option<Duration>) -> u64 {
    timeout
        .map(|t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(DEFAULT_TIMEOUT_MS)
}

impl Transport for MockInstrument {
    fn write(&self, command: &str) -> Result<(), TransportError> {
        self.check_failure(command, None)?;
        let mut state = self.state.lock().unwrap();
        state.writes.push(command.to_string());
        if state.apply_write(command) {
            Ok(())
        } else {
            Err(TransportError::Protocol(format!("command not understood: {}", command)))
        }
    }

    fn query(&self, command: &str, timeout: Option<Duration>) -> Result<String, TransportError> {
        self.check_failure(command, timeout)?;
        let mut state = self.state.lock().unwrap();
        state.queries.push(QueryRecord {
            command: command.to_string(),
            timeout,
        });

        let command = command.trim();
        if command.eq_ignore_ascii_case("*IDN?") {
            return Ok(state.identity.clone());
        }
        if command.eq_ignore_ascii_case("SET?") {
            return Ok(state.dump());
        }
        let Some(path) = command.strip_suffix('?') else {
            return Err(TransportError::Protocol(format!("not a query: {}", command)));
        };
        state.answer(path).ok_or(TransportError::Timeout {
            timeout_ms: timeout_ms(timeout),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_query() {
        let instrument = MockInstrument::new();
        instrument.write(":TRIG:MODE AUTO").unwrap();
        assert_eq!(instrument.query(":TRIG:MODE?", None).unwrap(), ":TRIG:MODE AUTO");

        instrument.write("HEADER OFF").unwrap();
        assert_eq!(instrument.query(":TRIG:MODE?", None).unwrap(), "AUTO");
    }

    #[test]
    fn test_unknown_query_times_out() {
        let instrument = MockInstrument::new();
        let err = instrument
            .query(":NOPE?", Some(Duration::from_millis(250)))
            .unwrap_err();
        assert!(matches!(err, TransportError::Timeout { timeout_ms: 250 }));
    }

    #[test]
    fn test_identity_and_dump() {
        let instrument = MockInstrument::with_identity("TEKTRONIX,DPO4034,C012345,CF:91.1CT");
        instrument.set_register("ACQ:COUNT", 4);
        assert_eq!(
            instrument.query("*IDN?", None).unwrap(),
            "TEKTRONIX,DPO4034,C012345,CF:91.1CT"
        );
        assert_eq!(instrument.query("SET?", None).unwrap(), ":ACQ:COUNT 4");
    }

    #[test]
    fn test_injected_failure_then_recovery() {
        let instrument = MockInstrument::new();
        instrument.set_register("A", 1);
        instrument.inject_failure(":A?", FailureConfig::disconnect().with_fail_count(1));

        assert!(matches!(
            instrument.query(":A?", None),
            Err(TransportError::ConnectionFailed(_))
        ));
        assert_eq!(instrument.query(":A?", None).unwrap(), ":A 1");
    }

    #[test]
    fn test_clones_share_state() {
        let instrument = MockInstrument::new();
        let handle = instrument.clone();
        instrument.write(":X 5").unwrap();
        assert_eq!(handle.writes(), vec![":X 5"]);
        assert_eq!(handle.registers().get("X").unwrap(), &ScalarValue::from("5"));
    }

    #[test]
    fn test_query_records_keep_timeout() {
        let instrument = MockInstrument::new();
        instrument.query("*IDN?", Some(Duration::from_secs(1))).unwrap();
        assert_eq!(
            instrument.query_records(),
            vec![QueryRecord {
                command: "*IDN?".to_string(),
                timeout: Some(Duration::from_secs(1)),
            }]
        );
    }
}
