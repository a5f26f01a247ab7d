//! Human-readable error descriptions and structured JSON error formatting.

use siggen_core::error::{BuildError, EngineError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingDevice | BuildError::MissingPresentation => format!(
                "What happened: The control panel could not be assembled ({be}).\nLikely causes: A transport or presentation adapter failed to initialize.\nHow to fix: Re-run with --log-level=debug and check the [connection] section."
            ),
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in [engine] or a --channel beyond engine.max_channels.\nHow to fix: Edit the config file or the command line, then rerun."
            ),
        };
    }

    if let Some(ee) = err.downcast_ref::<EngineError>() {
        return match ee {
            EngineError::Disconnected => "What happened: The instrument is not connected.\nLikely causes: USB cable unplugged, wrong port, or the instrument is powered off.\nHow to fix: Check connection.port and the cable, then rerun `siggen self-check`.".to_string(),
            EngineError::Timeout => "What happened: The instrument did not answer in time.\nLikely causes: Wrong baud rate or line terminator, or the instrument is busy.\nHow to fix: Verify connection.baud_rate and connection.terminator; raise connection.timeout_ms.".to_string(),
            EngineError::Device(msg) => format!(
                "What happened: The instrument rejected or failed a request ({msg}).\nLikely causes: A command the firmware does not support, or a transport fault.\nHow to fix: Re-run with --log-level=debug to see the SCPI traffic."
            ),
            EngineError::UnknownFeature(name) => format!(
                "What happened: There is no feature named '{name}'.\nHow to fix: Run `siggen features` to list the available ones."
            ),
            EngineError::UnknownField(name) => format!(
                "What happened: There is no field '{name}'.\nHow to fix: Run `siggen features` to list the fields of each feature."
            ),
            EngineError::InvalidChannel { channel, max } => format!(
                "What happened: Channel {channel} does not exist.\nHow to fix: Pick a channel in 1..={max}."
            ),
            other if other.is_config() => format!(
                "What happened: Invalid configuration.\nDetails: {other}\nHow to fix: Edit the config file (or the unit CSV) and try again."
            ),
            other => format!(
                "What happened: {other}.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // Generic fallback
    let msg = err.to_string();
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

fn engine_error(err: &eyre::Report) -> Option<&EngineError> {
    err.chain().find_map(|e| e.downcast_ref::<EngineError>())
}

/// Stable exit codes: configuration 2, device communication 3, anything else 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() {
        return 2;
    }
    match engine_error(err) {
        Some(e) if e.is_config() => 2,
        Some(e) if e.is_device() => 3,
        _ => 1,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "Config";
    }
    match engine_error(err) {
        Some(e) if e.is_config() => "Config",
        Some(EngineError::Disconnected) => "Disconnected",
        Some(EngineError::Timeout) => "Timeout",
        Some(e) if e.is_device() => "Device",
        Some(EngineError::UnknownFeature(_)) => "UnknownFeature",
        Some(EngineError::UnknownField(_)) => "UnknownField",
        Some(EngineError::InvalidChannel { .. }) => "InvalidChannel",
        _ => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}
