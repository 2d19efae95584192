//! Synchronization Integration Tests
//!
//! End-to-end sessions against the mock instrument: change detection,
//! forced reads, temporary overrides, snapshots and files, and factory
//! default generation.

mod fixtures;

use std::time::Duration;

use instcfg::mock::{FailureConfig, MockInstrument};
use instcfg::{
    ConfigSource, ConfigTarget, ConfigTree, DefaultsOutcome, ScalarValue, SyncError,
    SyncSettings, SyncedConfig, DEFAULT_SNAPSHOT,
};
use tempfile::TempDir;

// =============================================================================
// Test Helpers
// =============================================================================

fn scope_session(dir: &TempDir) -> (SyncedConfig<MockInstrument>, MockInstrument) {
    let instrument = fixtures::mock_scope();
    let settings = SyncSettings::default().with_defaults_dir(dir.path().join("savedConfigDefaults"));
    (SyncedConfig::with_settings(instrument.clone(), settings), instrument)
}

fn value_writes(instrument: &MockInstrument, prefix: &str) -> Vec<String> {
    instrument
        .writes()
        .into_iter()
        .filter(|w| w.starts_with(prefix))
        .collect()
}

// =============================================================================
// Change detection
// =============================================================================

#[test]
fn test_repeated_set_writes_once() {
    let dir = TempDir::new().unwrap();
    let (mut scope, instrument) = scope_session(&dir);

    assert!(scope.set_config_param("X", 5, false).unwrap());
    assert!(!scope.set_config_param("X", 5, false).unwrap());
    assert_eq!(value_writes(&instrument, ":X"), vec![":X 5"]);
}

#[test]
fn test_read_after_read_does_not_query() {
    let dir = TempDir::new().unwrap();
    let (mut scope, instrument) = scope_session(&dir);

    let scale = scope.get_config_param("CH1:SCALE", false).unwrap();
    assert_eq!(scale, ScalarValue::Float(0.1));
    let bandwidth = scope.get_config_param("CH1:BANDWIDTH", false).unwrap();
    assert_eq!(bandwidth, ScalarValue::Integer(500_000_000));

    scope.get_config_param("CH1:SCALE", false).unwrap();
    assert_eq!(instrument.queries(), vec!["CH1:SCALE?", "CH1:BANDWIDTH?"]);
}

#[test]
fn test_front_panel_change_needs_forced_read() {
    let dir = TempDir::new().unwrap();
    let (mut scope, instrument) = scope_session(&dir);
    scope.get_config_param("TRIGGER:A:MODE", false).unwrap();

    // Someone turns a knob
    instrument.set_register("TRIGGER:A:MODE", "NORMAL");

    assert_eq!(
        scope.get_config_param("TRIGGER:A:MODE", false).unwrap(),
        ScalarValue::from("AUTO")
    );
    assert_eq!(
        scope.get_config_param("TRIGGER:A:MODE", true).unwrap(),
        ScalarValue::from("NORMAL")
    );
    // The cache believes AUTO is gone, so setting it back writes
    assert!(scope.set_config_param("TRIGGER:A:MODE", "AUTO", false).unwrap());
}

#[test]
fn test_mandatory_header_replies_are_stripped() {
    let instrument = fixtures::mock_scope();
    let mut scope =
        SyncedConfig::with_settings(instrument.clone(), SyncSettings::default().with_mandatory_header());

    assert_eq!(
        scope.get_config_param("DATA:STOP", false).unwrap(),
        ScalarValue::Integer(10_000)
    );
    assert!(instrument.header_enabled());
}

// =============================================================================
// Temporary overrides
// =============================================================================

#[test]
fn test_temp_config_restores_after_block_error() {
    let dir = TempDir::new().unwrap();
    let (mut scope, instrument) = scope_session(&dir);
    scope.set_config_param("SCALE", 1, false).unwrap();

    let result: Result<(), SyncError> = scope.with_temp_config("SCALE", 10, false, |s| {
        assert_eq!(s.live().get("SCALE").unwrap(), &ScalarValue::Integer(10));
        s.get_config_param("NOT:A:PARAMETER", false)?;
        Ok(())
    });

    assert!(matches!(result, Err(SyncError::Transport { .. })));
    assert_eq!(scope.live().get("SCALE").unwrap(), &ScalarValue::Integer(1));
    assert_eq!(value_writes(&instrument, ":SCALE"), vec![":SCALE 1", ":SCALE 10", ":SCALE 1"]);
}

// =============================================================================
// Snapshots and files
// =============================================================================

#[test]
fn test_file_token_round_trip_between_sessions() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bench.json");
    let token = path.to_string_lossy().to_string();

    let (mut first, _) = scope_session(&dir);
    first.set_config_param("HORIZONTAL:SCALE", 2.0e-6, false).unwrap();
    first.set_config_param("HORIZONTAL:RECORDLENGTH", 100_000, false).unwrap();
    first.set_config_param("CH2:SCALE", 0.5, false).unwrap();
    first
        .save_config(ConfigTarget::from_token(&token), "HORIZONTAL", true)
        .unwrap();

    let (mut second, instrument) = scope_session(&dir);
    let written = second
        .load_config(ConfigSource::from_token(&token), "")
        .unwrap();
    assert_eq!(written, 2);
    assert_eq!(
        value_writes(&instrument, ":HORIZONTAL"),
        vec![":HORIZONTAL:RECORDLENGTH 100000", ":HORIZONTAL:SCALE 0.000002"]
    );
    assert!(!second.live().contains("CH2"));
}

#[test]
fn test_snapshot_token_restores_state() {
    let dir = TempDir::new().unwrap();
    let (mut scope, instrument) = scope_session(&dir);
    scope.set_config_param("ACQUIRE:MODE", "SAMPLE", false).unwrap();
    scope.save_config(ConfigTarget::from_token("+before"), "", false).unwrap();

    scope.set_config_param("ACQUIRE:MODE", "AVERAGE", false).unwrap();
    scope.load_config(ConfigSource::from_token("+before"), "").unwrap();

    assert_eq!(
        instrument.registers().get("ACQUIRE:MODE").unwrap(),
        &ScalarValue::from("SAMPLE")
    );
    assert!(matches!(
        scope.save_config(ConfigTarget::from_token("+init"), "", false),
        Err(SyncError::AccessDenied { .. })
    ));
}

// =============================================================================
// Factory defaults
// =============================================================================

#[test]
fn test_generate_defaults_saves_four_of_five() {
    let dir = TempDir::new().unwrap();
    let instrument = MockInstrument::new();
    instrument.load_dump(":P:ONE 1;TWO 2;THREE 3;FOUR 4;FIVE 5");
    instrument.inject_failure(":P:THREE?", FailureConfig::timeout());
    let mut config = SyncedConfig::new(instrument.clone());

    let path = dir.path().join("p.json");
    let outcome = config.generate_defaults(Some(path.clone()), false).unwrap();
    let DefaultsOutcome::Written(report) = outcome else {
        panic!("expected a new defaults file");
    };
    assert_eq!(report.saved.len(), 4);
    assert_eq!(report.skipped.len(), 1);

    let saved = ConfigTree::from_file(&path, "").unwrap();
    assert_eq!(saved.len(), 4);
    assert!(!saved.contains("P:THREE"));
    for name in ["ONE", "TWO", "FOUR", "FIVE"] {
        assert!(saved.contains(&format!("P:{}", name)));
    }
}

#[test]
fn test_generate_then_load_default() {
    let dir = TempDir::new().unwrap();
    let (mut scope, instrument) = scope_session(&dir);
    let expected_path = dir
        .path()
        .join("savedConfigDefaults")
        .join("TEKTRONIX-DPO4034-C010101.json");

    let DefaultsOutcome::Written(report) = scope.generate_defaults(None, false).unwrap() else {
        panic!("expected a new defaults file");
    };
    assert_eq!(report.path, expected_path);
    assert!(report.skipped.is_empty());

    // Second run leaves the file alone
    assert!(matches!(
        scope.generate_defaults(None, false).unwrap(),
        DefaultsOutcome::AlreadyExists(_)
    ));

    // A fresh session reads the file lazily and restores the trigger group
    let mut fresh = SyncedConfig::with_settings(
        instrument.clone(),
        SyncSettings::default().with_defaults_dir(dir.path().join("savedConfigDefaults")),
    );
    fresh.set_config_param("TRIGGER:A:MODE", "NORMAL", false).unwrap();
    instrument.clear_log();

    let written = fresh
        .load_config(ConfigSource::Snapshot(DEFAULT_SNAPSHOT.into()), "TRIGGER")
        .unwrap();
    assert_eq!(written, 5);
    assert!(instrument.writes().contains(&":TRIGGER:A:MODE AUTO".to_string()));
    assert_eq!(
        fresh.live().get("TRIGGER:A:EDGE:SLOPE").unwrap(),
        &ScalarValue::from("RISE")
    );
}

#[test]
fn test_unresponsive_instrument_fails_before_dump() {
    let dir = TempDir::new().unwrap();
    let (mut scope, instrument) = scope_session(&dir);
    instrument.inject_failure("*IDN?", FailureConfig::timeout());

    let err = scope
        .generate_defaults(Some(dir.path().join("never.json")), true)
        .unwrap_err();

    assert!(err.is_transport());
    assert!(!instrument.queries().iter().any(|q| q == "SET?"));
    assert!(!dir.path().join("never.json").exists());
}

#[test]
fn test_dump_timeout_from_settings_file() {
    let dir = TempDir::new().unwrap();
    let settings_path = dir.path().join("instcfg.toml");
    std::fs::write(&settings_path, "dump_timeout_ms = 60000\ntrial_timeout_ms = 500\n").unwrap();
    let settings = SyncSettings::load(&settings_path).unwrap();

    let instrument = fixtures::mock_scope();
    let mut scope = SyncedConfig::with_settings(instrument.clone(), settings);
    let tree = scope.full_hardware_config("CH2").unwrap();
    assert_eq!(tree.len(), 3);

    let records = instrument.query_records();
    assert_eq!(records[0].timeout, Some(Duration::from_millis(500)));
    assert_eq!(records[1].command, "SET?");
    assert_eq!(records[1].timeout, Some(Duration::from_secs(60)));
}
