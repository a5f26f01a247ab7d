use std::io::ErrorKind;
use std::time::{Duration, Instant};

use crate::error::{HwError, Result};

/// Longest reply accepted before the terminator shows up.
pub const MAX_REPLY_LEN: usize = 64 * 1024;

/// Read bytes through `read` until `terminator` arrives or `timeout` expires.
///
/// `read` follows `std::io::Read::read` semantics; `TimedOut`, `WouldBlock`
/// and zero-length reads mean "nothing yet" and are retried after
/// `poll_interval`. The deadline holds even while bytes keep arriving, and a
/// reply longer than [`MAX_REPLY_LEN`] is rejected. The reply is returned
/// without the terminator and with surrounding whitespace (including a stray
/// `\r`) trimmed.
pub fn read_line_with_timeout(
    mut read: impl FnMut(&mut [u8]) -> std::io::Result<usize>,
    terminator: u8,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<String> {
    let deadline = Instant::now() + timeout;
    let mut reply: Vec<u8> = Vec::new();
    let mut buf = [0u8; 256];
    loop {
        let got = match read(&mut buf) {
            Ok(0) => 0,
            Ok(n) => {
                if let Some(pos) = buf[..n].iter().position(|&b| b == terminator) {
                    reply.extend_from_slice(&buf[..pos]);
                    return Ok(String::from_utf8_lossy(&reply).trim().to_string());
                }
                reply.extend_from_slice(&buf[..n]);
                if reply.len() > MAX_REPLY_LEN {
                    return Err(HwError::Serial(format!(
                        "reply exceeds {MAX_REPLY_LEN} bytes without a terminator"
                    )));
                }
                n
            }
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => 0,
            Err(e) => return Err(HwError::Io(e)),
        };
        if Instant::now() >= deadline {
            return Err(HwError::Timeout);
        }
        if got == 0 {
            std::thread::sleep(poll_interval);
        }
    }
}
