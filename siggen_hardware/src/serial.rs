use std::cell::{Cell, RefCell};
use std::io::{Read, Write};
use std::time::Duration;

use serialport::SerialPort;
use siggen_traits::{BoxError, DeviceProxy};

use crate::error::{HwError, Result};
use crate::util::read_line_with_timeout;

const POLL_INTERVAL: Duration = Duration::from_millis(2);

/// SCPI instrument behind a USB CDC virtual COM port.
///
/// Commands and queries are terminated with `terminator`; a query reads back
/// one reply line within `timeout`. An io failure marks the link as
/// disconnected until [`SerialInstrument::open`] is called again.
pub struct SerialInstrument {
    port: RefCell<Box<dyn SerialPort>>,
    terminator: String,
    timeout: Duration,
    connected: Cell<bool>,
}

impl SerialInstrument {
    pub fn open(path: &str, baud_rate: u32, timeout: Duration, terminator: &str) -> Result<Self> {
        let port = serialport::new(path, baud_rate)
            .timeout(POLL_INTERVAL)
            .open()
            .map_err(|e| HwError::Serial(format!("{path}: {e}")))?;
        tracing::info!(path, baud_rate, "serial instrument opened");
        let terminator = if terminator.is_empty() { "\n" } else { terminator };
        Ok(SerialInstrument {
            port: RefCell::new(port),
            terminator: terminator.to_string(),
            timeout,
            connected: Cell::new(true),
        })
    }

    fn write_line(&self, line: &str) -> Result<()> {
        let mut port = self.port.borrow_mut();
        let framed = format!("{line}{}", self.terminator);
        let res = port
            .write_all(framed.as_bytes())
            .and_then(|_| port.flush());
        if let Err(e) = res {
            self.connected.set(false);
            tracing::warn!(error = %e, "serial write failed");
            return Err(HwError::Io(e));
        }
        Ok(())
    }

    fn read_reply(&self) -> Result<String> {
        let mut port = self.port.borrow_mut();
        // last byte of the terminator ends a reply ("\r\n" ends on '\n')
        let end = self.terminator.bytes().last().unwrap_or(b'\n');
        let res = read_line_with_timeout(|buf| port.read(buf), end, self.timeout, POLL_INTERVAL);
        if let Err(HwError::Io(e)) = &res {
            self.connected.set(false);
            tracing::warn!(error = %e, "serial read failed");
        }
        res
    }
}

impl DeviceProxy for SerialInstrument {
    fn send_command(&self, command: &str) -> std::result::Result<(), BoxError> {
        if !self.connected.get() {
            return Err(Box::new(HwError::NotConnected));
        }
        self.write_line(command)?;
        Ok(())
    }

    fn send_query(&self, query: &str) -> std::result::Result<String, BoxError> {
        if !self.connected.get() {
            return Err(Box::new(HwError::NotConnected));
        }
        // drop stale bytes from an earlier timed-out reply
        let _ = self.port.borrow().clear(serialport::ClearBuffer::Input);
        self.write_line(query)?;
        Ok(self.read_reply()?)
    }

    fn is_connected(&self) -> bool {
        self.connected.get()
    }
}
