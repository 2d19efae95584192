//! Mock Instrument Implementation
//!
//! In-process simulated instrument for testing the synchronization layer
//! without hardware. It behaves like a SCPI-style device:
//!
//! - Writes of `PATH VALUE` update its settings registers
//! - `PATH?` answers the stored value, with the header echoed unless
//!   `HEADER OFF` was written
//! - `*IDN?` answers the identification string
//! - `SET?` answers a shorthand dump of every setting
//! - Unknown queries time out, as real instruments do
//!
//! Every write and query is logged for assertions, and failures can be
//! injected per command.

mod failure;
mod instrument;
mod state;

pub use failure::{FailureConfig, FailureInjector, FailureKind};
pub use instrument::MockInstrument;
pub use state::{InstrumentState, QueryRecord, DEFAULT_IDENTITY};
