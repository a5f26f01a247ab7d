//! Device proxies for the generator panel.
//!
//! - [`SimulatedGenerator`]: in-memory SCPI instrument used by tests and the
//!   `sim` backend.
//! - `SerialInstrument` (feature `hardware`): USB CDC virtual COM port.
pub mod error;
#[cfg(feature = "hardware")]
pub mod serial;
pub mod util;

#[cfg(feature = "hardware")]
pub use serial::SerialInstrument;

use crate::error::HwError;
use siggen_traits::{BoxError, DeviceProxy};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

const IDENTITY: &str = "SIGGEN,SIM-2CH,000001,1.0";

#[derive(Debug, Default)]
struct SimState {
    connected: bool,
    values: BTreeMap<String, String>,
    commands: Vec<String>,
    queries: Vec<String>,
    fail_commands: Vec<String>,
    fail_queries: Vec<String>,
}

/// Simulated dual-channel generator.
///
/// `HEADER ARGS` stores `ARGS` under the upper-cased header; `HEADER?` returns
/// the stored value, or `"0"` for headers never written. Clones share state,
/// so a test can keep one handle while the engine owns another.
#[derive(Debug, Clone)]
pub struct SimulatedGenerator {
    state: Rc<RefCell<SimState>>,
}

impl Default for SimulatedGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedGenerator {
    pub fn new() -> Self {
        SimulatedGenerator {
            state: Rc::new(RefCell::new(SimState {
                connected: true,
                ..SimState::default()
            })),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.state.borrow_mut().connected = connected;
    }

    /// Preload a value as if the instrument had been set from its front panel.
    pub fn seed(&self, header: &str, value: &str) {
        self.state
            .borrow_mut()
            .values
            .insert(header.to_ascii_uppercase(), value.to_string());
    }

    /// Current value stored under `header`, if any.
    pub fn value(&self, header: &str) -> Option<String> {
        self.state
            .borrow()
            .values
            .get(&header.to_ascii_uppercase())
            .cloned()
    }

    /// Every command accepted so far, in order.
    pub fn commands(&self) -> Vec<String> {
        self.state.borrow().commands.clone()
    }

    /// Every query answered so far, in order.
    pub fn queries(&self) -> Vec<String> {
        self.state.borrow().queries.clone()
    }

    pub fn clear_log(&self) {
        let mut st = self.state.borrow_mut();
        st.commands.clear();
        st.queries.clear();
    }

    /// Reject every command containing `pattern`.
    pub fn fail_commands_matching(&self, pattern: &str) {
        self.state
            .borrow_mut()
            .fail_commands
            .push(pattern.to_string());
    }

    /// Reject every query containing `pattern`.
    pub fn fail_queries_matching(&self, pattern: &str) {
        self.state
            .borrow_mut()
            .fail_queries
            .push(pattern.to_string());
    }

    pub fn clear_failures(&self) {
        let mut st = self.state.borrow_mut();
        st.fail_commands.clear();
        st.fail_queries.clear();
    }
}

impl DeviceProxy for SimulatedGenerator {
    fn send_command(&self, command: &str) -> Result<(), BoxError> {
        let mut st = self.state.borrow_mut();
        if !st.connected {
            return Err(Box::new(HwError::NotConnected));
        }
        if st.fail_commands.iter().any(|p| command.contains(p.as_str())) {
            tracing::debug!(command, "simulated command rejection");
            return Err(Box::new(HwError::Rejected(command.to_string())));
        }
        let trimmed = command.trim();
        let (header, args) = match trimmed.split_once(char::is_whitespace) {
            Some((h, a)) => (h, a.trim()),
            None => (trimmed, ""),
        };
        st.values
            .insert(header.to_ascii_uppercase(), args.to_string());
        st.commands.push(trimmed.to_string());
        Ok(())
    }

    fn send_query(&self, query: &str) -> Result<String, BoxError> {
        let mut st = self.state.borrow_mut();
        if !st.connected {
            return Err(Box::new(HwError::NotConnected));
        }
        if st.fail_queries.iter().any(|p| query.contains(p.as_str())) {
            tracing::debug!(query, "simulated query timeout");
            return Err(Box::new(HwError::Timeout));
        }
        let trimmed = query.trim();
        st.queries.push(trimmed.to_string());
        if trimmed.eq_ignore_ascii_case("*IDN?") {
            return Ok(IDENTITY.to_string());
        }
        let header = trimmed.trim_end_matches('?').to_ascii_uppercase();
        Ok(st
            .values
            .get(&header)
            .cloned()
            .unwrap_or_else(|| "0".to_string()))
    }

    fn is_connected(&self) -> bool {
        self.state.borrow().connected
    }
}
