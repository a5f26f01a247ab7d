//! One user-editable parameter bound to a device command.
//!
//! A field keeps the last value known to be on the device (`base_value`, in
//! base units) separate from what the user is typing (`display_text` under
//! `selected_unit`). Edits only arm the debounce timer; [`ParameterField::apply`]
//! resolves the text and writes it, and [`ParameterField::reconcile`] takes a
//! device reply as the new truth.

use siggen_config::ChoiceOption;

use crate::debounce::{DebounceState, Debouncer};
use crate::device::{CommandTemplate, DeviceLink};
use crate::error::EngineError;
use crate::format::{format_command_value, format_value, parse_value};
use crate::units::{UnitFamily, UnitSpec, from_base, to_base};

#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    Quantity(UnitFamily),
    /// Static option list; the value is the option index.
    Choice(Vec<ChoiceOption>),
}

/// Read-out computed from the field's text, e.g. bit period from bit rate.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedReadout {
    pub id: String,
    pub label: String,
    pub family: UnitFamily,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub id: String,
    pub label: String,
    pub kind: ValueKind,
    pub initial_unit: UnitSpec,
    pub initial_text: String,
    pub command: CommandTemplate,
    pub query: Option<CommandTemplate>,
    /// Valid range in base units.
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub integer: bool,
    pub min_decimals: usize,
    pub derived: Option<DerivedReadout>,
}

impl FieldSpec {
    /// Clamp into `[min, max]` after integer rounding.
    pub fn constrain(&self, v: f64) -> f64 {
        let mut v = if self.integer { v.round() } else { v };
        if let Some(lo) = self.min {
            v = v.max(lo);
        }
        if let Some(hi) = self.max {
            v = v.min(hi);
        }
        v
    }

    pub fn is_choice(&self) -> bool {
        matches!(self.kind, ValueKind::Choice(_))
    }

    pub fn options(&self) -> &[ChoiceOption] {
        match &self.kind {
            ValueKind::Choice(opts) => opts,
            ValueKind::Quantity(_) => &[],
        }
    }

    pub fn family(&self) -> Option<&UnitFamily> {
        match &self.kind {
            ValueKind::Quantity(f) => Some(f),
            ValueKind::Choice(_) => None,
        }
    }
}

fn find_option(options: &[ChoiceOption], text: &str) -> Option<usize> {
    let t = text.trim().trim_matches('"').trim();
    if let Some(i) = options
        .iter()
        .position(|o| o.token.eq_ignore_ascii_case(t) || o.label.eq_ignore_ascii_case(t))
    {
        return Some(i);
    }
    // SCPI long form ("LINEAR" for "LIN"); longest matching token wins
    let upper = t.to_ascii_uppercase();
    options
        .iter()
        .enumerate()
        .filter(|(_, o)| !o.token.is_empty() && upper.starts_with(&o.token.to_ascii_uppercase()))
        .max_by_key(|(_, o)| o.token.len())
        .map(|(i, _)| i)
}

#[derive(Debug, Clone)]
pub struct ParameterField {
    spec: FieldSpec,
    base_value: f64,
    display_text: String,
    selected_unit: UnitSpec,
    debounce: DebounceState,
    derived: Option<(String, UnitSpec)>,
}

impl ParameterField {
    pub fn new(spec: FieldSpec) -> Result<Self, EngineError> {
        let base_value = match &spec.kind {
            ValueKind::Quantity(_) => parse_value(&spec.initial_text)
                .map(|v| to_base(v, &spec.initial_unit))
                .ok_or_else(|| {
                    EngineError::Config(format!(
                        "field '{}': default '{}' is not a number",
                        spec.id, spec.initial_text
                    ))
                })?,
            ValueKind::Choice(opts) => find_option(opts, &spec.initial_text)
                .ok_or_else(|| {
                    EngineError::Config(format!(
                        "field '{}': default '{}' is not an option",
                        spec.id, spec.initial_text
                    ))
                })? as f64,
        };
        let mut field = Self {
            display_text: spec.initial_text.clone(),
            selected_unit: spec.initial_unit.clone(),
            spec,
            base_value,
            debounce: DebounceState::default(),
            derived: None,
        };
        field.recompute_derived();
        Ok(field)
    }

    pub fn id(&self) -> &str {
        &self.spec.id
    }

    pub fn spec(&self) -> &FieldSpec {
        &self.spec
    }

    pub fn base_value(&self) -> f64 {
        self.base_value
    }

    pub fn display_text(&self) -> &str {
        &self.display_text
    }

    pub fn selected_unit(&self) -> &UnitSpec {
        &self.selected_unit
    }

    pub fn is_pending(&self) -> bool {
        self.debounce.is_pending()
    }

    pub fn deadline(&self) -> Option<std::time::Instant> {
        self.debounce.deadline()
    }

    /// Current derived read-out as `(text, unit)`, if the field has one.
    pub fn derived(&self) -> Option<(&str, &UnitSpec)> {
        self.derived.as_ref().map(|(t, u)| (t.as_str(), u))
    }

    /// Store the text and arm the timer. Returns false when `text` equals the
    /// current display text (a programmatic write echoed back by the widget).
    pub fn on_text_changed(&mut self, text: &str, debouncer: &Debouncer) -> bool {
        if text == self.display_text {
            return false;
        }
        self.display_text = text.to_string();
        self.recompute_derived();
        debouncer.arm(&mut self.debounce);
        true
    }

    /// Normalize the text cosmetically. Returns true if it changed.
    pub fn on_lost_focus(&mut self) -> bool {
        if self.spec.is_choice() {
            return false;
        }
        let Some(v) = parse_value(&self.display_text) else {
            return false;
        };
        let formatted = format_value(v, self.spec.min_decimals);
        if formatted == self.display_text {
            return false;
        }
        self.display_text = formatted;
        true
    }

    /// Re-express `base_value` under `unit` and arm the timer. Returns false
    /// when `unit` is already selected, which is what the widget echoes back
    /// after the engine sets it.
    pub fn on_unit_changed(&mut self, unit: &str, debouncer: &Debouncer) -> Result<bool, EngineError> {
        let ValueKind::Quantity(family) = &self.spec.kind else {
            return Err(EngineError::UnknownUnit {
                family: String::new(),
                unit: unit.to_string(),
            });
        };
        let unit = family.unit(unit)?;
        if unit.name == self.selected_unit.name {
            return Ok(false);
        }
        let unit = unit.clone();
        self.display_text = format_value(from_base(self.base_value, &unit), self.spec.min_decimals);
        self.selected_unit = unit;
        self.recompute_derived();
        debouncer.arm(&mut self.debounce);
        Ok(true)
    }

    /// Replace text and unit with what the widgets currently show.
    pub fn load(&mut self, text: Option<String>, unit: Option<String>) -> Result<(), EngineError> {
        if let Some(text) = text {
            self.display_text = text;
        }
        if let (Some(unit), ValueKind::Quantity(family)) = (unit, &self.spec.kind)
            && unit != self.selected_unit.name
        {
            self.selected_unit = family.unit(&unit)?.clone();
        }
        self.recompute_derived();
        Ok(())
    }

    /// Value `apply` would write: parsed, converted to base and clamped.
    pub fn resolve(&self) -> Result<f64, EngineError> {
        let parse_err = || EngineError::Parse {
            field: self.spec.id.clone(),
            text: self.display_text.clone(),
        };
        match &self.spec.kind {
            ValueKind::Quantity(_) => {
                let v = parse_value(&self.display_text).ok_or_else(parse_err)?;
                Ok(self.spec.constrain(to_base(v, &self.selected_unit)))
            }
            ValueKind::Choice(opts) => find_option(opts, &self.display_text)
                .map(|i| i as f64)
                .ok_or_else(parse_err),
        }
    }

    fn command_value(&self, value: f64) -> String {
        match &self.spec.kind {
            ValueKind::Quantity(_) => format_command_value(value),
            ValueKind::Choice(opts) => opts
                .get(value as usize)
                .map(|o| o.token.clone())
                .unwrap_or_default(),
        }
    }

    /// Resolve and write the current text. `base_value` only changes once the
    /// command has been issued; on error the field keeps its prior value.
    /// The display text is left as typed even when the value was clamped.
    pub fn apply(&mut self, link: &DeviceLink, channel: u8) -> Result<String, EngineError> {
        let value = self.resolve()?;
        let command = self.spec.command.render(channel, &self.command_value(value));
        link.command(&command)?;
        self.base_value = value;
        Ok(command)
    }

    /// Take a device reply as the new value, auto-ranging the display unit.
    /// Cancels any pending edit of this field.
    pub fn reconcile(&mut self, reply: &str, debouncer: &Debouncer) -> Result<(), EngineError> {
        let parse_err = || EngineError::Parse {
            field: self.spec.id.clone(),
            text: reply.trim().to_string(),
        };
        match &self.spec.kind {
            ValueKind::Quantity(family) => {
                let v = crate::device::parse_number(reply).ok_or_else(parse_err)?;
                let (shown, unit) = family.auto_range(v);
                self.display_text = format_value(shown, self.spec.min_decimals);
                self.selected_unit = unit.clone();
                self.base_value = v;
            }
            ValueKind::Choice(opts) => {
                let i = find_option(opts, reply).ok_or_else(parse_err)?;
                self.display_text = opts[i].label.clone();
                self.base_value = i as f64;
            }
        }
        debouncer.cancel(&mut self.debounce);
        self.recompute_derived();
        Ok(())
    }

    pub fn cancel_pending(&mut self, debouncer: &Debouncer) {
        debouncer.cancel(&mut self.debounce);
    }

    pub fn take_if_due(&mut self, debouncer: &Debouncer) -> bool {
        debouncer.take_if_due(&mut self.debounce)
    }

    /// Recompute the read-out from the current text; unparsable or zero input
    /// leaves the previous read-out in place.
    fn recompute_derived(&mut self) {
        let Some(derived) = &self.spec.derived else {
            return;
        };
        let Some(v) = parse_value(&self.display_text) else {
            return;
        };
        let base = to_base(v, &self.selected_unit);
        if base == 0.0 {
            return;
        }
        let (shown, unit) = derived.family.auto_range(1.0 / base);
        self.derived = Some((format_value(shown, 0), unit.clone()));
    }
}
