//! Config loading, device selection and panel assembly, plus the one-shot
//! commands built on them.

use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use serde_json::json;
use siggen_config::{Backend, Config, Connection, FieldCfg, FieldKind};
use siggen_core::runner::run_until_idle;
use siggen_core::{
    ControlPanel, DeviceLink, EngineError, FeatureController, LogSink, MemoryLog, TracingLog,
    UnitRegistry, widget_id,
};
use siggen_hardware::SimulatedGenerator;
use siggen_traits::DeviceProxy;
use siggen_ui::MemoryPanel;

/// `HEADER=value;HEADER=value` pairs preloaded into the simulated instrument.
pub const SIM_SEED_ENV: &str = "SIGGEN_SIM_SEED";
/// Any value starts the simulated instrument disconnected.
pub const SIM_OFFLINE_ENV: &str = "SIGGEN_SIM_OFFLINE";
/// Commands containing this text are rejected by the simulated instrument.
pub const SIM_REJECT_ENV: &str = "SIGGEN_SIM_REJECT";

fn config_error(msg: impl Into<String>) -> eyre::Report {
    eyre::Report::new(EngineError::Config(msg.into()))
}

pub fn load_config(path: Option<&Path>) -> eyre::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| config_error(format!("read {}: {e}", path.display())))?;
    let cfg = siggen_config::load_toml(&text)
        .map_err(|e| config_error(format!("parse {}: {e}", path.display())))?;
    cfg.validate().map_err(|e| config_error(format!("{e:#}")))?;
    Ok(cfg)
}

/// Run-time overrides taken from the command line.
#[derive(Debug, Default, Clone)]
pub struct Overrides<'a> {
    pub units: Option<&'a Path>,
    pub channel: Option<u8>,
    pub debounce_ms: Option<u64>,
}

pub fn open_device(conn: &Connection) -> eyre::Result<Rc<dyn DeviceProxy>> {
    match conn.backend {
        Backend::Sim => Ok(Rc::new(simulated_from_env())),
        Backend::Usb => open_serial(conn),
    }
}

fn simulated_from_env() -> SimulatedGenerator {
    let sim = SimulatedGenerator::new();
    if let Ok(seed) = std::env::var(SIM_SEED_ENV) {
        for pair in seed.split(';') {
            if let Some((header, value)) = pair.split_once('=') {
                sim.seed(header.trim(), value.trim());
            }
        }
    }
    if std::env::var_os(SIM_OFFLINE_ENV).is_some() {
        sim.set_connected(false);
    }
    if let Ok(pattern) = std::env::var(SIM_REJECT_ENV) {
        sim.fail_commands_matching(&pattern);
    }
    sim
}

#[cfg(feature = "hardware")]
fn open_serial(conn: &Connection) -> eyre::Result<Rc<dyn DeviceProxy>> {
    let port = conn.port.as_deref().unwrap_or_default();
    let device = siggen_hardware::SerialInstrument::open(
        port,
        conn.baud_rate,
        Duration::from_millis(conn.timeout_ms),
        &conn.terminator,
    )
    .map_err(|e| eyre::Report::new(EngineError::Device(e.to_string())))?;
    Ok(Rc::new(device))
}

#[cfg(not(feature = "hardware"))]
fn open_serial(_conn: &Connection) -> eyre::Result<Rc<dyn DeviceProxy>> {
    Err(config_error(
        "the usb backend needs a build with the `hardware` feature",
    ))
}

/// Panel log lines are kept for the JSON report and forwarded to `tracing`.
struct CliLog(Rc<MemoryLog>);

impl LogSink for CliLog {
    fn on_log(&self, message: &str) {
        self.0.on_log(message);
        TracingLog.on_log(message);
    }
}

pub struct Session {
    pub panel: ControlPanel,
    pub ui: Rc<MemoryPanel>,
    pub log: Rc<MemoryLog>,
    pub device: Rc<dyn DeviceProxy>,
}

impl Session {
    pub fn open(cfg: &Config, overrides: &Overrides<'_>) -> eyre::Result<Self> {
        let mut units = UnitRegistry::builtin();
        if let Some(path) = overrides.units.or(cfg.engine.units_csv.as_deref()) {
            let rows = siggen_config::load_units_csv(path).map_err(|e| config_error(format!("{e:#}")))?;
            units.extend_from_rows(&rows)?;
        }
        let features = cfg
            .feature_tables()
            .map_err(|e| config_error(format!("{e:#}")))?;
        let device = open_device(&cfg.connection)?;

        let ui = Rc::new(MemoryPanel::new());
        let log = Rc::new(MemoryLog::new());
        let debounce = overrides.debounce_ms.unwrap_or(cfg.engine.debounce_ms);
        let mut panel = ControlPanel::builder()
            .with_device(Rc::clone(&device))
            .with_presentation(ui.clone())
            .with_features(features)
            .with_units(units)
            .with_log(Rc::new(CliLog(Rc::clone(&log))))
            .with_debounce(Duration::from_millis(debounce))
            .with_max_channels(cfg.engine.max_channels)
            .with_channel(overrides.channel.unwrap_or(cfg.engine.channel))
            .build()?;
        ui.attach(panel.event_sender());
        panel.initialize_ui();
        Ok(Self {
            panel,
            ui,
            log,
            device,
        })
    }

    pub fn controller(&self, feature: &str) -> eyre::Result<&FeatureController> {
        self.panel
            .controller(feature)
            .ok_or_else(|| eyre::Report::new(EngineError::UnknownFeature(feature.to_string())))
    }

    /// Type `value` into a widget the way a user would: pick the unit, type
    /// the number, leave the field.
    ///
    /// Returns how many debounced writes fired while the unit change was
    /// being delivered.
    pub fn edit(&mut self, widget: &str, value: &str) -> usize {
        let (text, unit) = split_value(value);
        let mut applied = 0;
        if let Some(unit) = unit
            && self.ui.unit(widget).as_deref() != Some(unit.as_str())
        {
            self.ui.select_unit(widget, &unit);
            // the unit change rewrites the widget text; let it land before typing
            applied = self.panel.pump();
        }
        self.ui.type_text(widget, &text);
        self.ui.leave_field(widget);
        applied
    }

    /// Panel log lines since the last call.
    pub fn take_log(&self) -> Vec<String> {
        let lines = self.log.lines();
        self.log.clear();
        lines
    }
}

/// Split `5ms` into (`5`, `ms`). Text without a leading number (option
/// labels) is returned whole.
pub fn split_value(value: &str) -> (String, Option<String>) {
    let v = value.trim();
    let end = v
        .char_indices()
        .take_while(|(_, c)| c.is_ascii_digit() || matches!(c, '.' | ',' | '+' | '-' | 'e' | 'E'))
        .last()
        .map_or(0, |(i, c)| i + c.len_utf8());
    let (number, unit) = v.split_at(end);
    if number.is_empty() || siggen_core::format::parse_value(number).is_none() {
        return (v.to_string(), None);
    }
    let unit = unit.trim();
    (
        number.to_string(),
        (!unit.is_empty()).then(|| unit.to_string()),
    )
}

// ── Reports ──────────────────────────────────────────────────────────────────

fn field_rows(ctl: &FeatureController) -> Vec<serde_json::Value> {
    ctl.fields()
        .iter()
        .map(|f| {
            let unit = f.spec().family().map(|_| f.selected_unit().name.clone());
            let mut row = json!({
                "id": f.id(),
                "label": f.spec().label,
                "text": f.display_text(),
                "unit": unit.filter(|u| !u.is_empty()),
                "base": f.base_value(),
            });
            if let (Some(d), Some((text, unit))) = (&f.spec().derived, f.derived()) {
                row["derived"] = json!({ "id": d.id, "text": text, "unit": unit.name });
            }
            row
        })
        .collect()
}

pub fn print_feature(session: &Session, feature: &str, json: bool, applied: Option<usize>) -> eyre::Result<()> {
    let ctl = session.controller(feature)?;
    let log = session.take_log();
    if json {
        let mut obj = json!({
            "feature": ctl.name(),
            "label": ctl.label(),
            "channel": ctl.active_channel(),
            "state": ctl.state().as_str(),
            "fields": field_rows(ctl),
            "log": log,
        });
        if let Some(n) = applied {
            obj["applied"] = json!(n);
        }
        println!("{obj}");
        return Ok(());
    }
    println!(
        "{} [{}] channel {}: {}",
        ctl.label(),
        ctl.name(),
        ctl.active_channel(),
        ctl.state()
    );
    for f in ctl.fields() {
        let unit = f.spec().family().map_or("", |_| f.selected_unit().name.as_str());
        println!("  {:<12} {} {}", f.id(), f.display_text(), unit);
        if let (Some(d), Some((text, unit))) = (&f.spec().derived, f.derived()) {
            println!("  {:<12} {} {}", d.id, text, unit.name);
        }
    }
    if let Some(n) = applied {
        println!("{n} debounced write(s)");
    }
    Ok(())
}

// ── Commands ─────────────────────────────────────────────────────────────────

fn field_entry(f: &FieldCfg) -> serde_json::Value {
    let kind = match f.kind {
        FieldKind::Quantity => "quantity",
        FieldKind::Choice => "choice",
    };
    let options: Vec<&str> = f.options.iter().map(|o| o.label.as_str()).collect();
    json!({
        "id": f.id,
        "kind": kind,
        "family": f.family,
        "unit": f.unit,
        "min": f.min,
        "max": f.max,
        "options": options,
    })
}

pub fn features(cfg: &Config, json: bool) -> eyre::Result<()> {
    let tables = cfg
        .feature_tables()
        .map_err(|e| config_error(format!("{e:#}")))?;
    if json {
        let list: Vec<_> = tables
            .iter()
            .map(|t| {
                let fields: Vec<_> = t.fields.iter().map(field_entry).collect();
                json!({
                    "name": t.name,
                    "label": t.label.as_deref().unwrap_or(&t.name),
                    "fields": fields,
                })
            })
            .collect();
        println!("{}", json!(list));
        return Ok(());
    }
    for t in &tables {
        println!("{} ({})", t.name, t.label.as_deref().unwrap_or(&t.name));
        for f in &t.fields {
            match f.kind {
                FieldKind::Quantity => {
                    let range = match (f.min, f.max) {
                        (Some(lo), Some(hi)) => format!(" [{lo} .. {hi}]"),
                        (Some(lo), None) => format!(" [>= {lo}]"),
                        (None, Some(hi)) => format!(" [<= {hi}]"),
                        (None, None) => String::new(),
                    };
                    let family = f.family.as_deref().unwrap_or("-");
                    println!("  {:<12} {family}{range}", f.id);
                }
                FieldKind::Choice => {
                    let labels: Vec<&str> = f.options.iter().map(|o| o.label.as_str()).collect();
                    println!("  {:<12} one of: {}", f.id, labels.join(", "));
                }
            }
        }
    }
    Ok(())
}

pub fn show(session: &mut Session, feature: &str, json: bool) -> eyre::Result<()> {
    session.panel.refresh(feature)?;
    print_feature(session, feature, json, None)
}

pub fn set(
    session: &mut Session,
    feature: &str,
    assignments: &[String],
    enable: bool,
    json: bool,
) -> eyre::Result<()> {
    if enable {
        session.panel.switch_to(feature)?;
    } else {
        session.panel.refresh(feature)?;
    }
    let ctl = session.controller(feature)?;
    if !ctl.is_enabled() {
        eyre::bail!(
            "{} is not enabled on channel {}; pass --enable to switch it on",
            ctl.label(),
            ctl.active_channel()
        );
    }

    let mut edits = Vec::with_capacity(assignments.len());
    for a in assignments {
        let (field, value) = a
            .split_once('=')
            .ok_or_else(|| eyre::eyre!("expected FIELD=VALUE, got '{a}'"))?;
        let field = field.trim();
        if ctl.field(field).is_none() {
            return Err(eyre::Report::new(EngineError::UnknownField(format!(
                "{feature}.{field}"
            ))));
        }
        edits.push((widget_id(feature, field), value.to_string()));
    }
    let mut applied = 0;
    for (widget, value) in &edits {
        applied += session.edit(widget, value);
    }
    applied += run_until_idle(&mut session.panel);
    tracing::info!(feature, applied, "debounced writes settled");
    session.panel.refresh(feature)?;
    print_feature(session, feature, json, Some(applied))
}

pub fn enable(session: &mut Session, feature: &str, json: bool) -> eyre::Result<()> {
    session.panel.switch_to(feature)?;
    print_feature(session, feature, json, None)
}

pub fn disable(session: &mut Session, feature: &str, json: bool) -> eyre::Result<()> {
    session.panel.disable(feature)?;
    print_feature(session, feature, json, None)
}

pub fn self_check(session: &Session, json: bool) -> eyre::Result<()> {
    let link = DeviceLink::new(Rc::clone(&session.device));
    let identity = link.query("*IDN?")?;
    if json {
        println!("{}", json!({ "ok": true, "identity": identity.trim() }));
    } else {
        println!("ok: {}", identity.trim());
    }
    Ok(())
}
