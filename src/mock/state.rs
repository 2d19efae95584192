//! Mock Instrument State Management
//!
//! Holds the simulated settings registers, echo modes and the traffic log.

use std::collections::BTreeMap;
use std::time::Duration;

use instcfg_tree::{parse_bulk_response, ConfigTree, ScalarValue};

/// Identification string reported by default
pub const DEFAULT_IDENTITY: &str = "MOCK,INSTR-1000,SN0001,FW1.0";

/// A query as received by the mock, with the timeout it was sent with
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRecord {
    pub command: String,
    pub timeout: Option<Duration>,
}

/// Simulated instrument state
#[derive(Debug)]
pub struct InstrumentState {
    /// Reply to the identification query
    pub identity: String,
    /// Settings of a single-channel instrument
    pub registers: ConfigTree,
    /// Settings per channel when channel selection is enabled
    pub channel_registers: BTreeMap<u32, ConfigTree>,
    /// Prefix of the channel-select command, if the instrument has channels
    pub channel_prefix: Option<String>,
    /// Currently selected channel
    pub selected_channel: u32,
    /// Replies echo the command header
    pub header: bool,
    /// Verbose (long-form) replies enabled
    pub verbose: bool,
    /// Every write received, in order
    pub writes: Vec<String>,
    /// Every query received, in order
    pub queries: Vec<QueryRecord>,
}

impl Default for InstrumentState {
    fn default() -> Self {
        Self::new()
    }
}

impl InstrumentState {
    /// Fresh instrument: header echo on, no settings
    pub fn new() -> Self {
        Self {
            identity: DEFAULT_IDENTITY.to_string(),
            registers: ConfigTree::new(),
            channel_registers: BTreeMap::new(),
            channel_prefix: None,
            selected_channel: 0,
            header: true,
            verbose: false,
            writes: Vec::new(),
            queries: Vec::new(),
        }
    }

    /// Registers addressed by the current channel selection
    pub fn active_registers(&mut self) -> &mut ConfigTree {
        if self.channel_prefix.is_some() {
            self.channel_registers.entry(self.selected_channel).or_default()
        } else {
            &mut self.registers
        }
    }

    /// Apply a written command. Returns false if it was not understood.
    pub fn apply_write(&mut self, command: &str) -> bool {
        let command = command.trim();
        let (head, value) = match command.split_once(char::is_whitespace) {
            Some((head, value)) => (head, Some(value.trim())),
            None => (command, None),
        };
        let name = head.trim_start_matches(':').to_ascii_uppercase();

        match (name.as_str(), value) {
            ("HEADER", Some(v)) => {
                self.header = parse_switch(v);
                true
            }
            ("VERBOSE", Some(v)) => {
                self.verbose = parse_switch(v);
                true
            }
            (_, Some(v)) if self.channel_prefix.as_deref() == Some(head) => {
                match v.parse() {
                    Ok(channel) => {
                        self.selected_channel = channel;
                        true
                    }
                    Err(_) => false,
                }
            }
            (_, Some(v)) => {
                let value = ScalarValue::from(v);
                self.active_registers().set(head, value).is_ok()
            }
            // Bare commands like *RST are accepted without effect
            (_, None) => true,
        }
    }

    /// Reply to a single-parameter query, or None if the parameter is unknown
    pub fn answer(&mut self, path: &str) -> Option<String> {
        let header = self.header;
        let registers = self.active_registers();
        let value = registers.get(path).ok()?.to_string();
        if header {
            let command = registers.get_command(path).ok()?;
            Some(format!("{} {}", command.path, value))
        } else {
            Some(value)
        }
    }

    /// Shorthand dump of all settings, as answered to `SET?`
    pub fn dump(&mut self) -> String {
        let registers = self.active_registers();
        let separator = registers.separator();
        let mut tokens = Vec::new();
        let mut current_group: Option<String> = None;

        for cmd in registers.get_list("") {
            let path = cmd.device_path(separator);
            let (group, leaf) = match path.rfind(separator) {
                Some(idx) => (&path[..idx], &path[idx + 1..]),
                None => ("", path),
            };
            if current_group.as_deref() == Some(group) {
                tokens.push(format!("{} {}", leaf, cmd.value));
            } else {
                tokens.push(format!("{} {}", path, cmd.value));
                current_group = Some(group.to_string());
            }
        }
        tokens.join(";")
    }

    /// Load settings from a shorthand dump (test setup helper)
    pub fn load_dump(&mut self, response: &str) -> bool {
        let registers = self.active_registers();
        match parse_bulk_response(response, registers.separator()) {
            Ok(commands) => registers.set_list(commands).is_ok(),
            Err(_) => false,
        }
    }
}

fn parse_switch(value: &str) -> bool {
    matches!(value.to_ascii_uppercase().as_str(), "ON" | "1" | "TRUE")
}
