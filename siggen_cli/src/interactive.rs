//! Line-driven front end: stdin plays the part of the user.

use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::RecvTimeoutError;
use serde_json::json;
use siggen_core::events::split_widget_id;
use siggen_core::runner::run_until_idle;

use crate::session::Session;

/// Upper bound on a single wait so Ctrl-C is noticed promptly.
const IDLE: Duration = Duration::from_millis(100);

#[derive(Debug, PartialEq, Eq)]
pub enum Line<'a> {
    Edit { widget: &'a str, value: &'a str },
    Apply(&'a str),
    Enable(&'a str),
    Disable(&'a str),
    Channel(u8),
    Refresh(Option<&'a str>),
    Quit,
    Blank,
}

pub fn parse_line(line: &str) -> eyre::Result<Line<'_>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(Line::Blank);
    }
    if let Some((widget, value)) = line.split_once('=') {
        let widget = widget.trim();
        if split_widget_id(widget).is_none() {
            eyre::bail!("expected feature.field=value, got '{line}'");
        }
        return Ok(Line::Edit {
            widget,
            value: value.trim(),
        });
    }
    let (cmd, arg) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(c, a)| (c, a.trim()));
    let need = |what: &str| -> eyre::Result<()> {
        if arg.is_empty() {
            eyre::bail!("'{cmd}' needs {what}");
        }
        Ok(())
    };
    Ok(match cmd {
        "apply" => {
            need("a feature")?;
            Line::Apply(arg)
        }
        "enable" => {
            need("a feature")?;
            Line::Enable(arg)
        }
        "disable" => {
            need("a feature")?;
            Line::Disable(arg)
        }
        "channel" => {
            need("a channel number")?;
            let n = arg
                .parse::<u8>()
                .map_err(|_| eyre::eyre!("invalid channel '{arg}'"))?;
            Line::Channel(n)
        }
        "refresh" => Line::Refresh((!arg.is_empty()).then_some(arg)),
        "quit" | "exit" => Line::Quit,
        other => eyre::bail!("unknown command '{other}'"),
    })
}

/// Act on one line. `None` means quit; otherwise the number of debounced
/// writes that fired while handling it.
fn handle(session: &mut Session, line: Line<'_>) -> Option<usize> {
    match line {
        Line::Edit { widget, value } => return Some(session.edit(widget, value)),
        Line::Apply(f) => session.ui.press_apply(f),
        Line::Enable(f) => session.ui.press_enable(f),
        Line::Disable(f) => session.ui.press_disable(f),
        Line::Channel(n) => session.ui.select_channel(n),
        Line::Refresh(f) => session.ui.request_refresh(f),
        Line::Quit => return None,
        Line::Blank => {}
    }
    Some(0)
}

fn flush_log(session: &Session, json: bool) {
    for line in session.take_log() {
        if json {
            println!("{}", json!({ "log": line }));
        } else {
            println!("{line}");
        }
    }
}

/// Feed stdin lines to the panel until EOF, `quit` or `shutdown`. Pending
/// debounced writes are flushed before returning.
pub fn run(session: &mut Session, shutdown: &AtomicBool, json: bool) -> eyre::Result<usize> {
    let (tx, rx) = crossbeam_channel::unbounded::<String>();
    std::thread::Builder::new()
        .name("stdin".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })?;

    let clock = session.panel.clock().clone();
    let mut applied = 0;
    loop {
        applied += session.panel.pump();
        flush_log(session, json);
        if shutdown.load(Ordering::Relaxed) {
            tracing::info!("interrupted");
            break;
        }
        let wait = session
            .panel
            .next_deadline()
            .map_or(IDLE, |d| d.saturating_duration_since(clock.now()).min(IDLE));
        match rx.recv_timeout(wait) {
            Ok(text) => match parse_line(&text) {
                Ok(line) => match handle(session, line) {
                    Some(n) => applied += n,
                    None => break,
                },
                Err(e) if json => println!("{}", json!({ "error": e.to_string() })),
                Err(e) => println!("error: {e}"),
            },
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    applied += run_until_idle(&mut session.panel);
    flush_log(session, json);
    tracing::info!(applied, "interactive session finished");
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("burst.cycles=5", Line::Edit { widget: "burst.cycles", value: "5" })]
    #[case("  sweep.stop = 2 kHz ", Line::Edit { widget: "sweep.stop", value: "2 kHz" })]
    #[case("apply burst", Line::Apply("burst"))]
    #[case("enable prbs", Line::Enable("prbs"))]
    #[case("disable prbs", Line::Disable("prbs"))]
    #[case("channel 2", Line::Channel(2))]
    #[case("refresh", Line::Refresh(None))]
    #[case("refresh sweep", Line::Refresh(Some("sweep")))]
    #[case("quit", Line::Quit)]
    #[case("# comment", Line::Blank)]
    #[case("", Line::Blank)]
    fn lines_parse(#[case] input: &str, #[case] want: Line<'static>) {
        assert_eq!(parse_line(input).unwrap(), want);
    }

    #[rstest]
    #[case("cycles=5")]
    #[case("enable")]
    #[case("channel two")]
    #[case("frobnicate burst")]
    fn bad_lines_are_rejected(#[case] input: &str) {
        assert!(parse_line(input).is_err());
    }
}
