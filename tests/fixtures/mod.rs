//! Test fixtures shared by the integration tests
//!
//! - A recorded settings dump of a four-channel oscilloscope
//! - Mock instruments preloaded with that dump

use std::path::{Path, PathBuf};

use instcfg::mock::MockInstrument;

/// Identification string of the recorded oscilloscope
pub const SCOPE_IDENTITY: &str = "TEKTRONIX,DPO4034,C010101,CF:91.1CT FV:v2.05";

/// Path to the recorded `SET?` reply
pub fn scope_dump_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/dpo_set_response.txt")
}

/// The recorded `SET?` reply
pub fn scope_dump() -> String {
    std::fs::read_to_string(scope_dump_path())
        .expect("fixture dpo_set_response.txt should be readable")
}

/// A mock oscilloscope whose registers hold the recorded dump
pub fn mock_scope() -> MockInstrument {
    let instrument = MockInstrument::with_identity(SCOPE_IDENTITY);
    assert!(instrument.load_dump(&scope_dump()), "fixture dump should parse");
    instrument
}
