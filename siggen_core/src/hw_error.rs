//! Maps `Box<dyn Error>` from the `DeviceProxy` boundary to typed `EngineError`.
//!
//! `siggen_traits` keeps the proxy contract free of any concrete error type;
//! this module converts those errors to our typed enum, with an optional
//! feature-gated path for `siggen_hardware::HwError` downcasting.

use crate::error::EngineError;

/// Map a trait-boundary error to a typed `EngineError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_proxy_error(e: &(dyn std::error::Error + 'static)) -> EngineError {
    #[cfg(feature = "hardware-errors")]
    {
        use siggen_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::Timeout => EngineError::Timeout,
                HwError::NotConnected => EngineError::Disconnected,
                other => EngineError::Device(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    let lower = s.to_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") {
        EngineError::Timeout
    } else if lower.contains("not connected") || lower.contains("disconnected") {
        EngineError::Disconnected
    } else {
        EngineError::Device(s)
    }
}
