//! Failure Injection for Mock Instrument
//!
//! Supports configurable transport failures per command for testing error paths.

use std::collections::HashMap;

use crate::transport::TransportError;

/// Kind of transport failure to simulate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The instrument never answers
    Timeout,
    /// The connection drops
    Disconnect,
    /// The instrument answers with garbage
    Protocol(String),
}

/// Failure configuration for a command
#[derive(Debug, Clone)]
pub struct FailureConfig {
    /// What goes wrong
    pub kind: FailureKind,
    /// Number of times to fail before succeeding (None = always fail)
    pub fail_count: Option<u32>,
}

impl FailureConfig {
    /// Create a config that times out
    pub fn timeout() -> Self {
        Self {
            kind: FailureKind::Timeout,
            fail_count: None,
        }
    }

    /// Create a config that drops the connection
    pub fn disconnect() -> Self {
        Self {
            kind: FailureKind::Disconnect,
            fail_count: None,
        }
    }

    /// Create a config that returns a protocol error
    pub fn protocol(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Protocol(message.into()),
            fail_count: None,
        }
    }

    /// Set the number of times to fail before succeeding
    pub fn with_fail_count(mut self, count: u32) -> Self {
        self.fail_count = Some(count);
        self
    }

    /// The transport error this failure produces
    pub fn to_error(&self, timeout_ms: u64) -> TransportError {
        match &self.kind {
            FailureKind::Timeout => TransportError::Timeout { timeout_ms },
            FailureKind::Disconnect => {
                TransportError::ConnectionFailed("instrument disconnected".to_string())
            }
            FailureKind::Protocol(message) => TransportError::Protocol(message.clone()),
        }
    }
}

/// Failure injector for the mock instrument, keyed by exact command string
#[derive(Debug, Default)]
pub struct FailureInjector {
    /// Per-command failure configs
    configs: HashMap<String, FailureConfig>,
    /// Call counts per command (for fail_count tracking)
    call_counts: HashMap<String, u32>,
}

impl FailureInjector {
    /// Create a new failure injector
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject a failure for a command
    pub fn inject(&mut self, command: impl Into<String>, config: FailureConfig) {
        let command = command.into();
        self.call_counts.insert(command.clone(), 0);
        self.configs.insert(command, config);
    }

    /// Clear all failure injections
    pub fn clear(&mut self) {
        self.configs.clear();
        self.call_counts.clear();
    }

    /// Clear failure injection for a specific command
    pub fn clear_command(&mut self, command: &str) {
        self.configs.remove(command);
        self.call_counts.remove(command);
    }

    /// Check if a failure should occur for a command
    /// Returns the failure config if one should occur, None otherwise
    pub fn check(&mut self, command: &str) -> Option<&FailureConfig> {
        let config = self.configs.get(command)?;
        let count = self.call_counts.entry(command.to_string()).or_insert(0);
        *count += 1;

        if let Some(fail_limit) = config.fail_count {
            if *count > fail_limit {
                return None; // Exceeded fail count, succeed now
            }
        }

        Some(config)
    }
}
