#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas, feature tables and unit-table parsing for the generator panel.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - The built-in feature catalog is an embedded TOML document checked by the
//!   same rules as user-provided `[[features]]` tables.
//! - Unit CSV loader enforces headers and rejects non-positive multipliers.
use serde::Deserialize;
use serde::de::Deserializer;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Built-in feature tables (sweep, burst, PRBS, serial, sequence, dual tone,
/// harmonics, modulation).
pub const BUILTIN_FEATURES: &str = include_str!("../builtin_features.toml");

/// Unit CSV schema.
///
/// Expected headers:
/// family,name,multiplier
///
/// Example:
/// family,name,multiplier
/// frequency,GHz,1e9
/// samplerate,MSa/s,1e6
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct UnitRow {
    pub family: String,
    pub name: String,
    pub multiplier: f64,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Numeric value with a unit selector.
    #[default]
    Quantity,
    /// One of a static list of options.
    Choice,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceOption {
    /// Text shown in the selector.
    pub label: String,
    /// Mnemonic sent to and reported by the instrument.
    pub token: String,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    /// Read-out = 1 / field value (frequency -> period, bit rate -> bit time).
    #[default]
    Reciprocal,
}

/// A read-out recomputed synchronously from a field's text on every edit.
#[derive(Debug, Deserialize, Clone)]
pub struct DerivedCfg {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    pub family: String,
    #[serde(default)]
    pub relation: Relation,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FieldCfg {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub kind: FieldKind,
    /// Unit family name (quantity fields only).
    #[serde(default)]
    pub family: Option<String>,
    /// Initially selected display unit; defaults to the family's base unit.
    #[serde(default)]
    pub unit: Option<String>,
    /// Initial display text (in `unit`); choice fields default to the first option.
    #[serde(default)]
    pub default: Option<String>,
    pub command: String,
    #[serde(default)]
    pub query: Option<String>,
    /// Valid range in base units; writes are clamped into it.
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    /// Round to a whole number before writing.
    #[serde(default)]
    pub integer: bool,
    #[serde(default)]
    pub min_decimals: usize,
    /// Option list. Accepts either:
    /// - array of tokens: ["PN7", "PN9"]
    /// - array of tables: [{ label = "Linear", token = "LIN" }, ...]
    /// - array of pairs: [["Linear", "LIN"], ...]
    #[serde(default, deserialize_with = "de_options")]
    pub options: Vec<ChoiceOption>,
    #[serde(default)]
    pub derived: Option<DerivedCfg>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeatureCfg {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    /// Issued on enable, before the parameter set.
    #[serde(default)]
    pub activate: Vec<String>,
    /// Issued on disable; returns the channel to a neutral waveform.
    #[serde(default)]
    pub deactivate: Vec<String>,
    /// Query reporting whether the mode is active.
    pub state_query: String,
    /// When set, the feature is active iff the state reply equals this token.
    /// Otherwise the reply is read as ON/OFF/1/0.
    #[serde(default)]
    pub active_token: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldCfg>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Engine {
    /// Quiet period before an edited field is written to the device.
    pub debounce_ms: u64,
    /// Number of output channels on the instrument.
    pub max_channels: u8,
    /// Channel selected at startup.
    pub channel: u8,
    /// Optional CSV with additional unit families.
    pub units_csv: Option<PathBuf>,
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            max_channels: 2,
            channel: 1,
            units_csv: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// In-memory simulated instrument.
    #[default]
    Sim,
    /// USB CDC virtual serial port.
    Usb,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Connection {
    pub backend: Backend,
    /// Serial device path (e.g. "/dev/ttyACM0", "COM3"); required for usb.
    pub port: Option<String>,
    pub baud_rate: u32,
    /// Reply timeout per query (ms).
    pub timeout_ms: u64,
    /// Line terminator appended to every command.
    pub terminator: String,
}

impl Default for Connection {
    fn default() -> Self {
        Self {
            backend: Backend::Sim,
            port: None,
            baud_rate: 115_200,
            timeout_ms: 1000,
            terminator: "\n".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub engine: Engine,
    pub connection: Connection,
    pub logging: Logging,
    /// Feature tables; entries replace built-ins of the same name, others are appended.
    pub features: Vec<FeatureCfg>,
}

#[derive(Debug, Deserialize)]
struct Catalog {
    #[serde(default)]
    features: Vec<FeatureCfg>,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Parse a standalone feature catalog (`[[features]]` tables only).
pub fn load_features_toml(s: &str) -> Result<Vec<FeatureCfg>, toml::de::Error> {
    toml::from_str::<Catalog>(s).map(|c| c.features)
}

/// The embedded catalog, parsed.
pub fn builtin_features() -> eyre::Result<Vec<FeatureCfg>> {
    load_features_toml(BUILTIN_FEATURES)
        .map_err(|e| eyre::eyre!("built-in feature catalog is malformed: {e}"))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OptionToml {
    Token(String),
    Pair((String, String)),
    Table { label: String, token: String },
}

fn de_options<'de, D>(deserializer: D) -> Result<Vec<ChoiceOption>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<Vec<OptionToml>> = Option::deserialize(deserializer)?;
    let mut out = Vec::new();
    if let Some(items) = opt {
        for o in items {
            match o {
                OptionToml::Token(token) => out.push(ChoiceOption {
                    label: token.clone(),
                    token,
                }),
                OptionToml::Pair((label, token)) | OptionToml::Table { label, token } => {
                    out.push(ChoiceOption { label, token });
                }
            }
        }
    }
    Ok(out)
}

pub fn load_units_csv(path: &Path) -> eyre::Result<Vec<UnitRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open unit CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["family", "name", "multiplier"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "unit CSV must have headers 'family,name,multiplier', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<UnitRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }
    validate_unit_rows(&rows)?;
    Ok(rows)
}

pub fn validate_unit_rows(rows: &[UnitRow]) -> eyre::Result<()> {
    let mut seen = HashSet::new();
    for (idx, row) in rows.iter().enumerate() {
        if row.family.trim().is_empty() {
            eyre::bail!("unit row {}: family must not be empty", idx + 1);
        }
        if !(row.multiplier.is_finite() && row.multiplier > 0.0) {
            eyre::bail!(
                "unit row {}: multiplier for '{}' must be a positive finite number",
                idx + 1,
                row.name
            );
        }
        if !seen.insert((row.family.as_str(), row.name.as_str())) {
            eyre::bail!(
                "unit row {}: duplicate unit '{}' in family '{}'",
                idx + 1,
                row.name,
                row.family
            );
        }
    }
    Ok(())
}

impl Config {
    /// Built-in tables merged with the ones from this config.
    pub fn feature_tables(&self) -> eyre::Result<Vec<FeatureCfg>> {
        let mut tables = builtin_features()?;
        for user in &self.features {
            match tables.iter_mut().find(|t| t.name == user.name) {
                Some(slot) => *slot = user.clone(),
                None => tables.push(user.clone()),
            }
        }
        Ok(tables)
    }

    pub fn validate(&self) -> eyre::Result<()> {
        // Engine
        if self.engine.debounce_ms == 0 {
            eyre::bail!("engine.debounce_ms must be >= 1");
        }
        if self.engine.debounce_ms > 60_000 {
            eyre::bail!("engine.debounce_ms is unreasonably large (>60s)");
        }
        if self.engine.max_channels == 0 {
            eyre::bail!("engine.max_channels must be >= 1");
        }
        if self.engine.channel == 0 || self.engine.channel > self.engine.max_channels {
            eyre::bail!(
                "engine.channel must be in 1..={}",
                self.engine.max_channels
            );
        }

        // Connection
        if self.connection.timeout_ms == 0 {
            eyre::bail!("connection.timeout_ms must be >= 1");
        }
        if self.connection.baud_rate == 0 {
            eyre::bail!("connection.baud_rate must be > 0");
        }
        if self.connection.terminator.is_empty() {
            eyre::bail!("connection.terminator must not be empty");
        }
        if self.connection.backend == Backend::Usb
            && self
                .connection
                .port
                .as_deref()
                .is_none_or(|p| p.trim().is_empty())
        {
            eyre::bail!("connection.port is required for the usb backend");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        // Features
        validate_features(&self.feature_tables()?)
    }
}

/// Structural checks for feature tables. Template syntax and unit names are
/// resolved by the engine when it builds its controllers.
pub fn validate_features(features: &[FeatureCfg]) -> eyre::Result<()> {
    let mut names = HashSet::new();
    for f in features {
        if f.name.trim().is_empty() {
            eyre::bail!("feature name must not be empty");
        }
        if f.name.contains('.') {
            eyre::bail!("feature '{}': name must not contain '.'", f.name);
        }
        if !names.insert(f.name.as_str()) {
            eyre::bail!("duplicate feature '{}'", f.name);
        }
        if f.state_query.trim().is_empty() {
            eyre::bail!("feature '{}': state_query must not be empty", f.name);
        }
        if f.active_token.as_deref().is_some_and(|t| t.trim().is_empty()) {
            eyre::bail!("feature '{}': active_token must not be empty", f.name);
        }

        let mut ids = HashSet::new();
        for field in &f.fields {
            let at = format!("feature '{}' field '{}'", f.name, field.id);
            if field.id.trim().is_empty() || field.id.contains('.') {
                eyre::bail!("feature '{}': field ids must be non-empty and contain no '.'", f.name);
            }
            if !ids.insert(field.id.as_str()) {
                eyre::bail!("{at}: duplicate field id");
            }
            if let Some(d) = &field.derived
                && !ids.insert(d.id.as_str())
            {
                eyre::bail!("{at}: derived read-out id '{}' clashes with a field", d.id);
            }
            if field.command.trim().is_empty() {
                eyre::bail!("{at}: command must not be empty");
            }
            match field.kind {
                FieldKind::Quantity => {
                    if field.family.as_deref().is_none_or(|s| s.trim().is_empty()) {
                        eyre::bail!("{at}: quantity fields need a unit family");
                    }
                    if !field.options.is_empty() {
                        eyre::bail!("{at}: options are only valid on choice fields");
                    }
                }
                FieldKind::Choice => {
                    if field.options.is_empty() {
                        eyre::bail!("{at}: choice fields need at least one option");
                    }
                    if field.min.is_some() || field.max.is_some() || field.derived.is_some() {
                        eyre::bail!("{at}: range and derived read-outs are only valid on quantities");
                    }
                    if let Some(d) = field.default.as_deref()
                        && !field.options.iter().any(|o| o.label == d || o.token == d)
                    {
                        eyre::bail!("{at}: default '{d}' is not one of the options");
                    }
                }
            }
            for bound in [field.min, field.max].into_iter().flatten() {
                if !bound.is_finite() {
                    eyre::bail!("{at}: min/max must be finite");
                }
            }
            if let (Some(lo), Some(hi)) = (field.min, field.max)
                && lo > hi
            {
                eyre::bail!("{at}: min must be <= max");
            }
            if field.min_decimals > 12 {
                eyre::bail!("{at}: min_decimals must be <= 12");
            }
        }
    }
    Ok(())
}
