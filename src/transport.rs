//! Transport layer
//!
//! Abstracts the instrument connection for testability. Provides:
//! - Transport trait: the write/query pair the cache talks through
//! - ChannelSelect: adapter that addresses one channel of a module bank
//!
//! Real connections (VISA, GPIB-over-LAN, raw sockets) live outside this
//! crate and only need to implement [`Transport`]. The in-process
//! [`MockInstrument`](crate::mock::MockInstrument) implements it for tests.

use std::io;
use std::sync::Arc;
use std::time::Duration;

/// Transport trait for instrument communication
pub trait Transport: Send + Sync {
    /// Send a command that produces no reply
    fn write(&self, command: &str) -> Result<(), TransportError>;

    /// Send a query and return the reply with trailing whitespace removed.
    ///
    /// `timeout` is forwarded verbatim; `None` means the transport default.
    fn query(&self, command: &str, timeout: Option<Duration>) -> Result<String, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn write(&self, command: &str) -> Result<(), TransportError> {
        (**self).write(command)
    }

    fn query(&self, command: &str, timeout: Option<Duration>) -> Result<String, TransportError> {
        (**self).query(command, timeout)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&self, command: &str) -> Result<(), TransportError> {
        (**self).write(command)
    }

    fn query(&self, command: &str, timeout: Option<Duration>) -> Result<String, TransportError> {
        (**self).query(command, timeout)
    }
}

/// Transport errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Addresses one channel of a multi-module instrument.
///
/// Every write and query is preceded by a select command such as `CH 2`, so
/// independent channels can share one connection.
#[derive(Debug, Clone)]
pub struct ChannelSelect<T> {
    inner: T,
    prefix: String,
    channel: u32,
}

impl<T: Transport> ChannelSelect<T> {
    pub fn new(inner: T, prefix: impl Into<String>, channel: u32) -> Self {
        Self {
            inner,
            prefix: prefix.into(),
            channel,
        }
    }

    pub fn channel(&self) -> u32 {
        self.channel
    }

    fn select(&self) -> Result<(), TransportError> {
        self.inner.write(&format!("{} {}", self.prefix, self.channel))
    }
}

impl<T: Transport> Transport for ChannelSelect<T> {
    fn write(&self, command: &str) -> Result<(), TransportError> {
        self.select()?;
        self.inner.write(command)
    }

    fn query(&self, command: &str, timeout: Option<Duration>) -> Result<String, TransportError> {
        self.select()?;
        self.inner.query(command, timeout)
    }
}
